//! Target descriptors: one platform/architecture/packaging combination

use serde::{Deserialize, Serialize};
use std::fmt;

/// Operating system family a target belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformFamily {
  Linux,
  Macos,
  Windows,
  Freebsd,
}

impl PlatformFamily {
  /// Executable suffix for binaries built for this family
  pub fn exe_suffix(&self) -> &'static str {
    match self {
      PlatformFamily::Windows => ".exe",
      _ => "",
    }
  }
}

impl fmt::Display for PlatformFamily {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      PlatformFamily::Linux => write!(f, "linux"),
      PlatformFamily::Macos => write!(f, "macos"),
      PlatformFamily::Windows => write!(f, "windows"),
      PlatformFamily::Freebsd => write!(f, "freebsd"),
    }
  }
}

/// How a target's build output is bundled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PackagingVariant {
  /// zip (windows) or .tar.gz archive of the binary and side files
  NativeArchive,
  /// Platform installer produced by a dedicated installer job
  Installer,
  /// Distribution package (e.g. .deb), optionally built inside a container
  DistroPackage,
}

impl fmt::Display for PackagingVariant {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      PackagingVariant::NativeArchive => write!(f, "native-archive"),
      PackagingVariant::Installer => write!(f, "installer"),
      PackagingVariant::DistroPackage => write!(f, "distro-package"),
    }
  }
}

/// Whether a target's failure fails the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SupportTier {
  /// Failure is fatal to the run
  #[default]
  Supported,
  /// Failure is recorded but tolerated
  BestEffort,
}

impl SupportTier {
  pub fn is_supported(&self) -> bool {
    matches!(self, SupportTier::Supported)
  }
}

impl fmt::Display for SupportTier {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      SupportTier::Supported => write!(f, "supported"),
      SupportTier::BestEffort => write!(f, "best-effort"),
    }
  }
}

/// One build target from the catalog
///
/// # Example
///
/// ```toml
/// [[targets]]
/// family = "linux"
/// triple = "aarch64-unknown-linux-gnu"
/// cross = true
/// container = "ghcr.io/cross-rs/aarch64-unknown-linux-gnu:main"
/// variant = "distro-package"
/// tier = "supported"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetDescriptor {
  pub family: PlatformFamily,

  /// Rust target triple
  pub triple: String,

  /// Build through the container backend instead of the host toolchain
  #[serde(default)]
  pub cross: bool,

  /// Container/image reference used when `cross` is set
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub container: Option<String>,

  pub variant: PackagingVariant,

  #[serde(default)]
  pub tier: SupportTier,

  /// Appended to the triple in bundle names (e.g. "2-17" for an old-glibc build)
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub suffix: Option<String>,

  /// Inactive targets stay in the catalog but are not planned
  #[serde(default = "default_active")]
  pub active: bool,

  /// Features added to the run's feature set for this target only
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub features: Vec<String>,

  /// Expected architecture field of a distro package (derived from the triple if unset)
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub package_arch: Option<String>,
}

fn default_active() -> bool {
  true
}

impl TargetDescriptor {
  /// Create an active, supported, native (non-cross) descriptor
  pub fn new(family: PlatformFamily, triple: impl Into<String>, variant: PackagingVariant) -> Self {
    Self {
      family,
      triple: triple.into(),
      cross: false,
      container: None,
      variant,
      tier: SupportTier::Supported,
      suffix: None,
      active: true,
      features: Vec::new(),
      package_arch: None,
    }
  }

  /// Mark as cross-built, optionally inside a specific container image
  pub fn cross(mut self, container: Option<&str>) -> Self {
    self.cross = true;
    self.container = container.map(String::from);
    self
  }

  pub fn best_effort(mut self) -> Self {
    self.tier = SupportTier::BestEffort;
    self
  }

  pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
    self.suffix = Some(suffix.into());
    self
  }

  pub fn inactive(mut self) -> Self {
    self.active = false;
    self
  }

  /// Stable identity: `<triple><suffix>:<variant>`
  pub fn id(&self) -> String {
    format!("{}{}:{}", self.triple, self.suffix.as_deref().unwrap_or(""), self.variant)
  }

  /// First component of the triple (x86_64, aarch64, ...)
  pub fn arch(&self) -> &str {
    self.triple.split('-').next().unwrap_or(&self.triple)
  }

  /// Architecture tag a distro package for this target must declare
  pub fn expected_package_arch(&self) -> String {
    if let Some(ref arch) = self.package_arch {
      return arch.clone();
    }
    debian_arch(&self.triple)
  }
}

/// Map a Rust target triple to its Debian architecture name
pub fn debian_arch(triple: &str) -> String {
  let arch = triple.split('-').next().unwrap_or(triple);
  let mapped = match arch {
    "x86_64" => "amd64",
    "i686" | "i586" => "i386",
    "aarch64" => "arm64",
    "armv7" => "armhf",
    "arm" if triple.ends_with("hf") => "armhf",
    "arm" => "armel",
    "powerpc64le" => "ppc64el",
    "riscv64gc" | "riscv64" => "riscv64",
    "s390x" => "s390x",
    other => other,
  };
  mapped.to_string()
}
