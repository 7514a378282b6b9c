//! Packaging
//!
//! One `PackagingStrategy` per packaging variant, all behind the same
//! `produce(BuildOutput, job) -> files` contract. The `Packager` picks the strategy by
//! the target's variant, adds side-file bundles for the canonical target, and deposits
//! everything into the run's staging area.

pub mod archive;
pub mod distro;
pub mod installer;
pub mod sidefiles;

use crate::build::{BuildOutput, ToolRunner};
use crate::catalog::{PackagingVariant, TargetDescriptor};
use crate::core::config::PackagingConfig;
use crate::core::error::{ShipError, ShipResult, ResultExt};
use crate::matrix::BuildJob;
use crate::staging::StagingArea;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// What a bundle contains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BundleKind {
  Archive,
  Installer,
  DistroPackage,
  SideFiles,
}

impl fmt::Display for BundleKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      BundleKind::Archive => write!(f, "archive"),
      BundleKind::Installer => write!(f, "installer"),
      BundleKind::DistroPackage => write!(f, "distro-package"),
      BundleKind::SideFiles => write!(f, "side-files"),
    }
  }
}

/// A staged, distributable file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bundle {
  pub name: String,
  /// Identity of the target that produced it
  pub target: String,
  pub kind: BundleKind,
  /// Location in the staging area
  pub path: PathBuf,
  pub size: u64,
  pub sha256: String,
}

/// A file a strategy produced in the job's work directory
#[derive(Debug, Clone)]
pub struct PackagedFile {
  pub name: String,
  pub kind: BundleKind,
  pub path: PathBuf,
}

/// Explicit settings for packaging calls
pub struct PackContext<'a> {
  pub project: &'a str,
  pub root: &'a Path,
  pub config: &'a PackagingConfig,
  /// Engine used for container-delegated packaging
  pub container_engine: &'a str,
  pub runner: &'a dyn ToolRunner,
}

/// Turns a build output into bundle files for one packaging variant
pub trait PackagingStrategy: Send + Sync {
  fn variant(&self) -> PackagingVariant;

  fn produce(&self, output: &BuildOutput, job: &BuildJob, ctx: &PackContext<'_>) -> ShipResult<Vec<PackagedFile>>;
}

/// Strategy registry plus the staging hand-off
pub struct Packager {
  strategies: BTreeMap<PackagingVariant, Box<dyn PackagingStrategy>>,
  project: String,
  root: PathBuf,
  config: PackagingConfig,
  container_engine: String,
  runner: Arc<dyn ToolRunner>,
}

impl Packager {
  /// Packager with the built-in archive, installer and distro strategies
  pub fn new(
    project: impl Into<String>,
    root: &Path,
    config: PackagingConfig,
    container_engine: impl Into<String>,
    runner: Arc<dyn ToolRunner>,
  ) -> Self {
    let mut packager = Self {
      strategies: BTreeMap::new(),
      project: project.into(),
      root: root.to_path_buf(),
      config,
      container_engine: container_engine.into(),
      runner,
    };
    packager.register(Box::new(archive::ArchiveStrategy));
    packager.register(Box::new(installer::InstallerStrategy));
    packager.register(Box::new(distro::DistroStrategy));
    packager
  }

  /// Add or replace the strategy for its variant
  pub fn register(&mut self, strategy: Box<dyn PackagingStrategy>) {
    self.strategies.insert(strategy.variant(), strategy);
  }

  /// Whether this target ships the side-file bundles
  pub fn is_canonical(&self, target: &TargetDescriptor) -> bool {
    target.triple == self.config.canonical_target
      && target.suffix.is_none()
      && target.variant == PackagingVariant::NativeArchive
  }

  /// Package one build output and stage the results
  pub fn package(&self, output: &BuildOutput, job: &BuildJob, staging: &StagingArea) -> ShipResult<Vec<Bundle>> {
    let strategy = self.strategies.get(&job.target.variant).ok_or_else(|| {
      ShipError::build(
        job.target.id(),
        format!("no packaging strategy registered for '{}'", job.target.variant),
      )
    })?;

    let ctx = PackContext {
      project: &self.project,
      root: &self.root,
      config: &self.config,
      container_engine: &self.container_engine,
      runner: self.runner.as_ref(),
    };

    let mut files = strategy.produce(output, job, &ctx)?;
    if self.is_canonical(&job.target) {
      files.extend(sidefiles::side_file_bundles(output, job, &ctx)?);
    }

    let target = job.target.id();
    files
      .into_iter()
      .map(|file| {
        let staged = staging.deposit(&file.path, &file.name)?;
        let (size, sha256) = digest(&staged)?;
        tracing::debug!(target = %target, bundle = %file.name, size, "bundle staged");
        Ok(Bundle {
          name: file.name,
          target: target.clone(),
          kind: file.kind,
          path: staged,
          size,
          sha256,
        })
      })
      .collect()
  }
}

/// Byte size and hex SHA-256 of a file
pub fn digest(path: &Path) -> ShipResult<(u64, String)> {
  let mut file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
  let mut hasher = Sha256::new();
  let size = io::copy(&mut file, &mut hasher)?;
  Ok((size, format!("{:x}", hasher.finalize())))
}
