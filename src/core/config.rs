use crate::catalog::{TargetDescriptor, default_catalog};
use crate::core::error::{ConfigError, ShipError, ShipResult, ResultExt};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration for shipyard
/// Searched in order: shipyard.toml, .shipyard.toml, .config/shipyard.toml
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ShipConfig {
  #[serde(default)]
  pub project: ProjectConfig,
  #[serde(default)]
  pub build: BuildConfig,
  #[serde(default)]
  pub packaging: PackagingConfig,
  #[serde(default)]
  pub gate: GateConfig,
  #[serde(default)]
  pub staging: StagingConfig,
  #[serde(default)]
  pub publish: PublishConfig,
  #[serde(default)]
  pub concurrency: ConcurrencyConfig,
  /// Target catalog. Empty means the built-in matrix.
  #[serde(default)]
  pub targets: Vec<TargetDescriptor>,
}

/// Project identity. Unset fields fall back to the root package's Cargo metadata.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProjectConfig {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  /// Binary name inside the build output (default: project name)
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub binary: Option<String>,
}

/// An external command with `{placeholder}` arguments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSpec {
  pub command: String,
  #[serde(default)]
  pub args: Vec<String>,
}

impl ToolSpec {
  pub fn new(command: &str, args: &[&str]) -> Self {
    Self {
      command: command.to_string(),
      args: args.iter().map(|a| a.to_string()).collect(),
    }
  }
}

/// Builder settings passed explicitly into every build
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
  /// Host toolchain invocation
  #[serde(default = "default_native_tool")]
  pub native: ToolSpec,

  /// Container-backed invocation for `cross` targets
  #[serde(default = "default_cross_tool")]
  pub cross: ToolSpec,

  /// Ask the build to emit completions and manual pages
  #[serde(default)]
  pub generate_side_files: bool,

  /// Environment variable set to "true" when side-file generation is on. The build
  /// writes `manpage/` and `completion/` under the directory given in `<NAME>_DIR`.
  #[serde(default = "default_generate_env")]
  pub generate_env: String,

  /// Container engine for emulated (arch-matched) builds and distro packaging
  #[serde(default = "default_container_engine")]
  pub container_engine: String,
}

fn default_native_tool() -> ToolSpec {
  ToolSpec::new("cargo", &["build", "--release", "--locked", "--target", "{target}"])
}

fn default_cross_tool() -> ToolSpec {
  ToolSpec::new("cross", &["build", "--release", "--locked", "--target", "{target}"])
}

fn default_generate_env() -> String {
  "SHIPYARD_GENERATE".to_string()
}

impl Default for BuildConfig {
  fn default() -> Self {
    Self {
      native: default_native_tool(),
      cross: default_cross_tool(),
      generate_side_files: false,
      generate_env: default_generate_env(),
      container_engine: default_container_engine(),
    }
  }
}

/// Packaging tools and the canonical side-file target
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackagingConfig {
  /// The single target whose side files are compressed and shipped separately
  #[serde(default = "default_canonical_target")]
  pub canonical_target: String,

  #[serde(default = "default_installer_tool")]
  pub installer: ToolSpec,

  #[serde(default = "default_distro_tool")]
  pub distro: ToolSpec,

  /// Reads the declared architecture of a produced distro package
  #[serde(default = "default_inspect_tool")]
  pub inspect: ToolSpec,
}

fn default_canonical_target() -> String {
  "x86_64-unknown-linux-gnu".to_string()
}

fn default_installer_tool() -> ToolSpec {
  ToolSpec::new(
    "cargo",
    &["wix", "--nocapture", "--target", "{target}", "--output", "{output}"],
  )
}

fn default_distro_tool() -> ToolSpec {
  ToolSpec::new(
    "cargo",
    &["deb", "--no-build", "--no-strip", "--target", "{target}", "--output", "{output}"],
  )
}

fn default_inspect_tool() -> ToolSpec {
  ToolSpec::new("dpkg-deb", &["--field", "{output}", "Architecture"])
}

fn default_container_engine() -> String {
  "docker".to_string()
}

impl Default for PackagingConfig {
  fn default() -> Self {
    Self {
      canonical_target: default_canonical_target(),
      installer: default_installer_tool(),
      distro: default_distro_tool(),
      inspect: default_inspect_tool(),
    }
  }
}

/// Duplicate-run suppression
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
  /// Path prefixes that count as build inputs
  #[serde(default = "default_gate_paths")]
  pub paths: Vec<String>,

  /// Directory holding the success ledger and run-group markers
  #[serde(default = "default_state_dir")]
  pub state_dir: PathBuf,
}

fn default_gate_paths() -> Vec<String> {
  ["src/", "Cargo.toml", "Cargo.lock", "build.rs", ".github/workflows/"]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_state_dir() -> PathBuf {
  PathBuf::from(".shipyard")
}

impl Default for GateConfig {
  fn default() -> Self {
    Self {
      paths: default_gate_paths(),
      state_dir: default_state_dir(),
    }
  }
}

/// Run-scoped artifact hand-off area
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagingConfig {
  #[serde(default = "default_staging_dir")]
  pub dir: PathBuf,

  /// Staged runs older than this are removed by `sweep` and at the start of `run`
  #[serde(default = "default_retention_days")]
  pub retention_days: u32,
}

fn default_staging_dir() -> PathBuf {
  PathBuf::from(".shipyard/staging")
}

fn default_retention_days() -> u32 {
  1
}

impl StagingConfig {
  pub fn retention(&self) -> chrono::Duration {
    chrono::Duration::days(i64::from(self.retention_days))
  }
}

impl Default for StagingConfig {
  fn default() -> Self {
    Self {
      dir: default_staging_dir(),
      retention_days: default_retention_days(),
    }
  }
}

/// Which release store backend to publish to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
  /// GitHub releases via the `gh` CLI
  #[default]
  Github,
  /// A directory on disk (useful for testing and mirrors)
  Local,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishConfig {
  #[serde(default)]
  pub store: StoreKind,

  /// Root of the local store
  #[serde(default = "default_local_store_dir")]
  pub local_dir: PathBuf,

  /// `owner/repo` passed to gh (default: repository of the current directory)
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub repo: Option<String>,

  /// Pause between deleting the old release and creating the new one
  #[serde(default = "default_replace_pause_secs")]
  pub replace_pause_secs: u64,
}

fn default_local_store_dir() -> PathBuf {
  PathBuf::from(".shipyard/releases")
}

fn default_replace_pause_secs() -> u64 {
  5
}

impl Default for PublishConfig {
  fn default() -> Self {
    Self {
      store: StoreKind::default(),
      local_dir: default_local_store_dir(),
      repo: None,
      replace_pause_secs: default_replace_pause_secs(),
    }
  }
}

impl PublishConfig {
  pub fn replace_pause(&self) -> Duration {
    Duration::from_secs(self.replace_pause_secs)
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConcurrencyConfig {
  /// Worker threads for the job pool (0 = one per CPU)
  #[serde(default)]
  pub max_parallel: usize,

  /// Deadline for the whole matrix to reach a terminal state
  #[serde(default = "default_timeout_mins")]
  pub timeout_mins: u64,
}

fn default_timeout_mins() -> u64 {
  60
}

/// One week; longer deadlines are configuration mistakes
const MAX_TIMEOUT_MINS: u64 = 7 * 24 * 60;

impl Default for ConcurrencyConfig {
  fn default() -> Self {
    Self {
      max_parallel: 0,
      timeout_mins: default_timeout_mins(),
    }
  }
}

impl ConcurrencyConfig {
  pub fn timeout(&self) -> Duration {
    Duration::from_secs(self.timeout_mins.saturating_mul(60))
  }
}

impl ShipConfig {
  /// Find config file in search order: shipyard.toml, .shipyard.toml, .config/shipyard.toml
  pub fn find_config_path(path: &Path) -> Option<PathBuf> {
    let candidates = vec![
      path.join("shipyard.toml"),
      path.join(".shipyard.toml"),
      path.join(".config").join("shipyard.toml"),
    ];

    candidates.into_iter().find(|p| p.exists())
  }

  /// Load config from shipyard.toml (searches multiple locations)
  pub fn load(path: &Path) -> ShipResult<Self> {
    let config_path = Self::find_config_path(path).ok_or_else(|| {
      ShipError::Config(ConfigError::NotFound {
        project_root: path.to_path_buf(),
      })
    })?;

    let content = fs::read_to_string(&config_path)
      .with_context(|| format!("Failed to read config from {}", config_path.display()))?;
    let config: ShipConfig = toml_edit::de::from_str(&content)
      .with_context(|| format!("Failed to parse config from {}", config_path.display()))?;

    config.validate()?;

    Ok(config)
  }

  /// Load config if present, otherwise fall back to defaults
  pub fn load_or_default(path: &Path) -> ShipResult<Self> {
    if Self::exists(path) {
      Self::load(path)
    } else {
      Ok(Self::default())
    }
  }

  /// Save config to shipyard.toml (default location)
  pub fn save(&self, path: &Path) -> ShipResult<()> {
    let config_path = path.join("shipyard.toml");
    let content = toml_edit::ser::to_string_pretty(self).context("Failed to serialize config to TOML")?;
    fs::write(&config_path, content).with_context(|| format!("Failed to write config to {}", config_path.display()))?;
    Ok(())
  }

  /// Check if config exists at the given path
  pub fn exists(path: &Path) -> bool {
    Self::find_config_path(path).is_some()
  }

  /// The configured catalog, or the built-in matrix when none is declared
  pub fn catalog(&self) -> Vec<TargetDescriptor> {
    if self.targets.is_empty() {
      default_catalog()
    } else {
      self.targets.clone()
    }
  }

  /// Validate settings that are not catalog-related (the planner owns catalog checks)
  pub fn validate(&self) -> ShipResult<()> {
    let tools = [
      ("build.native", &self.build.native),
      ("build.cross", &self.build.cross),
      ("packaging.installer", &self.packaging.installer),
      ("packaging.distro", &self.packaging.distro),
      ("packaging.inspect", &self.packaging.inspect),
    ];
    for (field, tool) in tools {
      if tool.command.trim().is_empty() {
        return Err(ShipError::Config(ConfigError::MissingField {
          field: format!("{}.command", field),
        }));
      }
    }

    if self.gate.paths.is_empty() {
      return Err(ShipError::Config(ConfigError::InvalidValue {
        field: "gate.paths".to_string(),
        reason: "at least one build-input path prefix is required".to_string(),
      }));
    }

    if self.staging.retention_days == 0 {
      return Err(ShipError::Config(ConfigError::InvalidValue {
        field: "staging.retention_days".to_string(),
        reason: "must be at least 1".to_string(),
      }));
    }

    if self.concurrency.timeout_mins == 0 || self.concurrency.timeout_mins > MAX_TIMEOUT_MINS {
      return Err(ShipError::Config(ConfigError::InvalidValue {
        field: "concurrency.timeout_mins".to_string(),
        reason: format!("must be between 1 and {}", MAX_TIMEOUT_MINS),
      }));
    }

    if let Some(ref name) = self.project.name
      && (name.is_empty() || name.contains(char::is_whitespace) || name.contains('/'))
    {
      return Err(ShipError::Config(ConfigError::InvalidValue {
        field: "project.name".to_string(),
        reason: format!("'{}' cannot be used in bundle names", name),
      }));
    }

    Ok(())
  }
}
