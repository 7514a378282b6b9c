//! Project context - build once, pass everywhere
//!
//! `ProjectContext` is built in main.rs and handed by reference to every command.
//! It carries the loaded configuration and the project identity used in bundle names.

use crate::core::config::ShipConfig;
use crate::core::error::{ConfigError, ShipError, ShipResult};
use cargo_metadata::MetadataCommand;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Name and binary of the project being released
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectIdentity {
  /// Used as the bundle name prefix
  pub name: String,
  /// Executable produced by the build (without `.exe`)
  pub binary: String,
  /// Version of the root package, when it could be read
  pub package_version: Option<String>,
}

/// Shared context for all commands
#[derive(Debug, Clone)]
pub struct ProjectContext {
  /// Project root directory (absolute path)
  pub root: PathBuf,

  /// shipyard.toml (or defaults); wrapped in Arc for sharing across job threads
  pub config: Arc<ShipConfig>,

  pub project: ProjectIdentity,
}

impl ProjectContext {
  /// Build context from a project root.
  ///
  /// Cargo metadata is only consulted when `[project] name` is not configured.
  pub fn build(root: &Path) -> ShipResult<Self> {
    let config = ShipConfig::load_or_default(root)?;
    let project = resolve_identity(root, &config)?;

    Ok(Self {
      root: root.to_path_buf(),
      config: Arc::new(config),
      project,
    })
  }

  /// Build from an already-loaded config (used by tests and `init`)
  pub fn with_config(root: &Path, config: ShipConfig, project: ProjectIdentity) -> Self {
    Self {
      root: root.to_path_buf(),
      config: Arc::new(config),
      project,
    }
  }

  /// Absolute path for a config path that may be relative to the project root
  pub fn resolve(&self, path: &Path) -> PathBuf {
    if path.is_absolute() {
      path.to_path_buf()
    } else {
      self.root.join(path)
    }
  }

  /// Pick the release version: explicit flag first, then the root package version
  pub fn release_version(&self, explicit: Option<&str>) -> ShipResult<String> {
    explicit
      .map(String::from)
      .or_else(|| self.project.package_version.clone())
      .ok_or_else(|| {
        ShipError::with_help(
          "No release version given and no root package version found",
          "Pass --version <VERSION>",
        )
      })
  }
}

fn resolve_identity(root: &Path, config: &ShipConfig) -> ShipResult<ProjectIdentity> {
  if let Some(ref name) = config.project.name {
    return Ok(ProjectIdentity {
      name: name.clone(),
      binary: config.project.binary.clone().unwrap_or_else(|| name.clone()),
      package_version: None,
    });
  }

  let metadata = MetadataCommand::new().current_dir(root).no_deps().exec().map_err(|e| {
    tracing::debug!(error = %e, "cargo metadata unavailable");
    ShipError::Config(ConfigError::MissingField {
      field: "project.name".to_string(),
    })
  })?;

  let package = metadata.root_package().ok_or_else(|| {
    ShipError::Config(ConfigError::MissingField {
      field: "project.name".to_string(),
    })
  })?;

  let name = package.name.to_string();
  Ok(ProjectIdentity {
    binary: config.project.binary.clone().unwrap_or_else(|| name.clone()),
    name,
    package_version: Some(package.version.to_string()),
  })
}
