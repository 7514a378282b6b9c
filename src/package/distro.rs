//! Distribution packages (`.deb` by default)
//!
//! Non-native architectures are packaged inside the target's container so the
//! package tool sees the right architecture. The produced package's declared
//! architecture is read back and must match the descriptor before it is accepted.

use crate::build::command::{container_path, wrap_in_container};
use crate::build::{BuildOutput, ToolCommand};
use crate::catalog::PackagingVariant;
use crate::core::error::{ShipError, ShipResult};
use crate::matrix::BuildJob;
use crate::package::archive::file_name;
use crate::package::{BundleKind, PackContext, PackagedFile, PackagingStrategy};
use std::path::Path;

pub struct DistroStrategy;

impl PackagingStrategy for DistroStrategy {
  fn variant(&self) -> PackagingVariant {
    PackagingVariant::DistroPackage
  }

  fn produce(&self, output: &BuildOutput, job: &BuildJob, ctx: &PackContext<'_>) -> ShipResult<Vec<PackagedFile>> {
    let target = &job.target;
    let target_id = target.id();
    let dest = output.work_dir.join(&job.bundle_name);
    let binary = file_name(&output.binary);

    let container = match (target.cross, target.container.as_deref()) {
      (true, Some(image)) => Some(image),
      (true, None) => {
        return Err(ShipError::planning(format!(
          "'{}' is a cross distro package but names no container",
          target_id
        )));
      }
      (false, _) => None,
    };

    let dest_arg = match container {
      Some(_) => container_path(ctx.root, &dest)?,
      None => dest.display().to_string(),
    };
    let cmd = ToolCommand::from_spec(
      &ctx.config.distro,
      ctx.root,
      &[
        ("target", target.triple.as_str()),
        ("output", dest_arg.as_str()),
        ("version", job.version.as_str()),
        ("binary", binary.as_str()),
      ],
    );
    let cmd = match container {
      Some(image) => wrap_in_container(ctx.container_engine, image, ctx.root, cmd),
      None => cmd,
    };
    tracing::info!(target = %target_id, cmd = %cmd.display(), "building distro package");

    let result = ctx.runner.run(&cmd)?;
    if !result.success {
      return Err(ShipError::build(
        &target_id,
        format!("distro package tool failed\n{}", result.stderr_tail()),
      ));
    }
    if !dest.is_file() {
      return Err(ShipError::build(
        &target_id,
        format!("distro package tool did not produce {}", dest.display()),
      ));
    }

    verify_architecture(&dest, job, ctx)?;

    Ok(vec![PackagedFile {
      name: job.bundle_name.clone(),
      kind: BundleKind::DistroPackage,
      path: dest,
    }])
  }
}

/// Compare the package's declared architecture with the descriptor's expected tag
pub fn verify_architecture(package: &Path, job: &BuildJob, ctx: &PackContext<'_>) -> ShipResult<()> {
  let target_id = job.target.id();
  let package_arg = package.display().to_string();
  let cmd = ToolCommand::from_spec(&ctx.config.inspect, ctx.root, &[("output", package_arg.as_str())]);

  let result = ctx.runner.run(&cmd)?;
  if !result.success {
    return Err(ShipError::build(
      &target_id,
      format!("could not read package architecture\n{}", result.stderr_tail()),
    ));
  }

  let expected = job.target.expected_package_arch();
  let actual = result.stdout.trim().to_string();
  if actual != expected {
    tracing::warn!(target = %target_id, %expected, %actual, "package architecture mismatch");
    return Err(ShipError::PackagingMismatch {
      target: target_id,
      expected,
      actual,
    });
  }

  tracing::debug!(target = %target_id, arch = %actual, "package architecture verified");
  Ok(())
}
