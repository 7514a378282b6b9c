//! Windows installer packaging (installer-class jobs)
//!
//! Installer jobs skip the matrix builder. The installer tool compiles the binary
//! itself into the job's own target directory and wraps it.

use crate::build::{BuildOutput, ToolCommand};
use crate::catalog::PackagingVariant;
use crate::core::error::{ShipError, ShipResult};
use crate::matrix::BuildJob;
use crate::package::archive::file_name;
use crate::package::{BundleKind, PackContext, PackagedFile, PackagingStrategy};

/// Runs the configured installer tool (default `cargo wix`)
pub struct InstallerStrategy;

impl PackagingStrategy for InstallerStrategy {
  fn variant(&self) -> PackagingVariant {
    PackagingVariant::Installer
  }

  fn produce(&self, output: &BuildOutput, job: &BuildJob, ctx: &PackContext<'_>) -> ShipResult<Vec<PackagedFile>> {
    let target_id = job.target.id();
    let dest = output.work_dir.join(&job.bundle_name);
    let dest_arg = dest.display().to_string();
    let binary = file_name(&output.binary);
    let target_dir = output.work_dir.join("target").display().to_string();

    let cmd = ToolCommand::from_spec(
      &ctx.config.installer,
      ctx.root,
      &[
        ("target", job.target.triple.as_str()),
        ("output", dest_arg.as_str()),
        ("version", job.version.as_str()),
        ("binary", binary.as_str()),
        ("target_dir", target_dir.as_str()),
      ],
    )
    .env("CARGO_TARGET_DIR", target_dir.as_str())
    .env("SHIPYARD_TARGET", job.target.triple.as_str())
    .env("SHIPYARD_VERSION", job.version.as_str());
    tracing::info!(target = %target_id, cmd = %cmd.display(), "building installer");

    let result = ctx.runner.run(&cmd)?;
    if !result.success {
      return Err(ShipError::build(
        &target_id,
        format!("installer tool failed\n{}", result.stderr_tail()),
      ));
    }
    if !dest.is_file() {
      return Err(ShipError::build(
        &target_id,
        format!("installer tool did not produce {}", dest.display()),
      ));
    }

    Ok(vec![PackagedFile {
      name: job.bundle_name.clone(),
      kind: BundleKind::Installer,
      path: dest,
    }])
  }
}
