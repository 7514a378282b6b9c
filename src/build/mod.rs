//! Builder contract
//!
//! A builder turns one `BuildJob` into a `BuildOutput`: the primary binary plus any
//! generated side files, copied into a job-exclusive work directory. The orchestrator
//! never looks inside a build; it only sees success or failure and the output paths.
//!
//! Cross-architecture builds are an execution backend of the same builder, not a
//! separate pipeline.

pub mod command;
pub mod runner;

pub use command::CommandBuilder;
pub use runner::{SystemRunner, ToolCommand, ToolOutput, ToolRunner};

use crate::catalog::TargetDescriptor;
use crate::catalog::naming::SideFileKind;
use crate::core::config::BuildConfig;
use crate::core::error::{ResultExt, ShipResult};
use crate::matrix::BuildJob;
use std::fs;
use std::path::{Path, PathBuf};

/// Where a build runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionBackend {
  /// The host toolchain
  Native,
  /// A cross-compilation container (`None` = the tool's default image)
  Container { image: Option<String> },
}

impl ExecutionBackend {
  pub fn for_target(target: &TargetDescriptor) -> Self {
    if target.cross {
      ExecutionBackend::Container {
        image: target.container.clone(),
      }
    } else {
      ExecutionBackend::Native
    }
  }
}

/// Explicit settings handed to every build call
#[derive(Debug, Clone)]
pub struct BuildSettings {
  /// Project root; builds run here
  pub root: PathBuf,
  /// Executable name without platform suffix
  pub binary: String,
  pub config: BuildConfig,
  /// Parent of the per-job work directories for this run
  pub work_root: PathBuf,
}

impl BuildSettings {
  /// Job-exclusive directory for build outputs
  pub fn job_dir(&self, job: &BuildJob) -> PathBuf {
    let id: String = job
      .target
      .id()
      .chars()
      .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
      .collect();
    self.work_root.join(format!("{:02}-{}", job.index, id))
  }

  /// Cargo target directory owned by one job. Jobs for the same triple never share it.
  pub fn target_dir(&self, job: &BuildJob) -> PathBuf {
    self.job_dir(job).join("target")
  }

  /// Where a build of `job` leaves its release binary
  pub fn built_binary(&self, job: &BuildJob) -> PathBuf {
    self
      .target_dir(job)
      .join(&job.target.triple)
      .join("release")
      .join(format!("{}{}", self.binary, job.target.family.exe_suffix()))
  }

  /// Output for an installer-class job. The installer tool compiles on its own
  /// toolchain, so only the job directory is prepared and the binary is where that
  /// tool will put it.
  pub fn installer_output(&self, job: &BuildJob) -> ShipResult<BuildOutput> {
    let work_dir = self.job_dir(job);
    fs::create_dir_all(&work_dir).with_context(|| format!("Failed to create {}", work_dir.display()))?;
    Ok(BuildOutput {
      job_index: job.index,
      binary: self.built_binary(job),
      side_files: Vec::new(),
      work_dir,
    })
  }
}

/// A generated file that ships alongside the binary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SideFile {
  pub kind: SideFileKind,
  pub path: PathBuf,
}

/// What a successful build hands to the packager
#[derive(Debug, Clone)]
pub struct BuildOutput {
  pub job_index: usize,
  pub binary: PathBuf,
  pub side_files: Vec<SideFile>,
  /// Job-exclusive scratch directory; packagers write here too
  pub work_dir: PathBuf,
}

impl BuildOutput {
  pub fn side_files_of(&self, kind: SideFileKind) -> impl Iterator<Item = &Path> {
    self.side_files.iter().filter(move |f| f.kind == kind).map(|f| f.path.as_path())
  }
}

/// Produces a `BuildOutput` for one job
pub trait Builder: Send + Sync {
  fn build(&self, job: &BuildJob, settings: &BuildSettings) -> ShipResult<BuildOutput>;
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::catalog::{PackagingVariant, PlatformFamily};
  use crate::matrix::JobClass;

  #[test]
  fn test_backend_follows_cross_flag() {
    let native = TargetDescriptor::new(PlatformFamily::Linux, "x86_64-unknown-linux-gnu", PackagingVariant::NativeArchive);
    assert_eq!(ExecutionBackend::for_target(&native), ExecutionBackend::Native);

    let cross = native.clone().cross(Some("centos:7"));
    assert_eq!(
      ExecutionBackend::for_target(&cross),
      ExecutionBackend::Container {
        image: Some("centos:7".to_string())
      }
    );
  }

  #[test]
  fn test_job_dirs_are_distinct_per_job() {
    let settings = BuildSettings {
      root: PathBuf::from("/p"),
      binary: "btm".into(),
      config: BuildConfig::default(),
      work_root: PathBuf::from("/w"),
    };
    let target = TargetDescriptor::new(PlatformFamily::Linux, "x86_64-unknown-linux-gnu", PackagingVariant::NativeArchive);
    let job = |index| BuildJob {
      index,
      class: JobClass::Matrix,
      target: target.clone(),
      version: "1.0.0".into(),
      features: vec![],
      bundle_name: "btm_x86_64-unknown-linux-gnu.tar.gz".into(),
    };

    let a = settings.job_dir(&job(0));
    let b = settings.job_dir(&job(1));
    assert_ne!(a, b);
    assert_eq!(a, PathBuf::from("/w/00-x86_64-unknown-linux-gnu_native-archive"));
    assert_ne!(settings.target_dir(&job(0)), settings.target_dir(&job(1)));
    assert_eq!(
      settings.built_binary(&job(1)),
      PathBuf::from("/w/01-x86_64-unknown-linux-gnu_native-archive/target/x86_64-unknown-linux-gnu/release/btm")
    );
  }

  #[test]
  fn test_installer_output_prepares_job_dir_only() {
    let dir = tempfile::tempdir().unwrap();
    let settings = BuildSettings {
      root: dir.path().to_path_buf(),
      binary: "btm".into(),
      config: BuildConfig::default(),
      work_root: dir.path().join("work"),
    };
    let target = TargetDescriptor::new(PlatformFamily::Windows, "x86_64-pc-windows-msvc", PackagingVariant::Installer);
    let job = BuildJob {
      index: 4,
      class: JobClass::Installer,
      bundle_name: "btm_x86_64-pc-windows-msvc.msi".into(),
      target,
      version: "1.0.0".into(),
      features: vec![],
    };

    let output = settings.installer_output(&job).unwrap();
    assert!(output.work_dir.is_dir());
    assert!(output.binary.ends_with("x86_64-pc-windows-msvc/release/btm.exe"));
    assert!(output.binary.starts_with(settings.target_dir(&job)));
    assert!(output.side_files.is_empty());
  }
}
