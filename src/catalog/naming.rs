//! Deterministic bundle naming
//!
//! Names follow `<project>_<target-triple>[<suffix>][<variant-suffix>].<ext>` and depend
//! only on the project name and the target descriptor, so re-running a plan yields
//! identical names and a release can be safely replaced.

use crate::catalog::target::{PackagingVariant, PlatformFamily, TargetDescriptor};

/// Extensions a published bundle may carry
pub const BUNDLE_EXTENSIONS: &[&str] = &["tar.gz", "zip", "msi", "deb"];

/// Kind of generated side file shipped once for the canonical target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SideFileKind {
  Manpage,
  Completion,
}

impl SideFileKind {
  /// Directory name used both in generated output and inside archives
  pub fn dir_name(&self) -> &'static str {
    match self {
      SideFileKind::Manpage => "manpage",
      SideFileKind::Completion => "completion",
    }
  }
}

/// File extension for a target's primary bundle
pub fn bundle_extension(target: &TargetDescriptor) -> &'static str {
  match target.variant {
    PackagingVariant::NativeArchive => match target.family {
      PlatformFamily::Windows => "zip",
      _ => "tar.gz",
    },
    PackagingVariant::Installer => "msi",
    PackagingVariant::DistroPackage => "deb",
  }
}

fn stem(project: &str, target: &TargetDescriptor) -> String {
  format!("{}_{}{}", project, target.triple, target.suffix.as_deref().unwrap_or(""))
}

/// Name of a target's primary bundle
pub fn bundle_name(project: &str, target: &TargetDescriptor) -> String {
  format!("{}.{}", stem(project, target), bundle_extension(target))
}

/// Name of a side-file bundle produced for the canonical target
pub fn side_file_bundle_name(project: &str, target: &TargetDescriptor, kind: SideFileKind) -> String {
  format!("{}_{}.tar.gz", stem(project, target), kind.dir_name())
}

/// Check a bundle name against the naming pattern for `project`
pub fn is_valid_bundle_name(project: &str, name: &str) -> bool {
  let Some(rest) = name.strip_prefix(project).and_then(|r| r.strip_prefix('_')) else {
    return false;
  };

  let Some(body) = BUNDLE_EXTENSIONS
    .iter()
    .find_map(|ext| rest.strip_suffix(ext).and_then(|b| b.strip_suffix('.')))
  else {
    return false;
  };

  // Body starts with a triple: at least two dash-separated components
  !body.is_empty()
    && body.split('-').count() >= 2
    && body
      .chars()
      .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn linux() -> TargetDescriptor {
    TargetDescriptor::new(PlatformFamily::Linux, "x86_64-unknown-linux-gnu", PackagingVariant::NativeArchive)
  }

  #[test]
  fn test_archive_names_by_family() {
    let win = TargetDescriptor::new(PlatformFamily::Windows, "x86_64-pc-windows-msvc", PackagingVariant::NativeArchive);
    assert_eq!(bundle_name("btm", &linux()), "btm_x86_64-unknown-linux-gnu.tar.gz");
    assert_eq!(bundle_name("btm", &win), "btm_x86_64-pc-windows-msvc.zip");
  }

  #[test]
  fn test_variant_extensions_keep_same_triple_collision_free() {
    let zip = TargetDescriptor::new(PlatformFamily::Windows, "x86_64-pc-windows-msvc", PackagingVariant::NativeArchive);
    let msi = TargetDescriptor::new(PlatformFamily::Windows, "x86_64-pc-windows-msvc", PackagingVariant::Installer);
    assert_ne!(bundle_name("btm", &zip), bundle_name("btm", &msi));
    assert_eq!(bundle_name("btm", &msi), "btm_x86_64-pc-windows-msvc.msi");
  }

  #[test]
  fn test_suffix_and_side_files() {
    let old_glibc = linux().with_suffix("2-17");
    assert_eq!(bundle_name("btm", &old_glibc), "btm_x86_64-unknown-linux-gnu2-17.tar.gz");
    assert_eq!(
      side_file_bundle_name("btm", &linux(), SideFileKind::Manpage),
      "btm_x86_64-unknown-linux-gnu_manpage.tar.gz"
    );
  }

  #[test]
  fn test_generated_names_are_valid() {
    let t = linux();
    assert!(is_valid_bundle_name("btm", &bundle_name("btm", &t)));
    assert!(is_valid_bundle_name(
      "btm",
      &side_file_bundle_name("btm", &t, SideFileKind::Completion)
    ));
  }

  #[test]
  fn test_invalid_names_rejected() {
    assert!(!is_valid_bundle_name("btm", "other_x86_64-unknown-linux-gnu.tar.gz"));
    assert!(!is_valid_bundle_name("btm", "btm_x86_64-unknown-linux-gnu.rpm"));
    assert!(!is_valid_bundle_name("btm", "btm_.zip"));
    assert!(!is_valid_bundle_name("btm", "btm_linux.zip"));
    assert!(!is_valid_bundle_name("btm", "btm_x86_64 linux.zip"));
  }
}
