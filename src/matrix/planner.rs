//! Matrix planner: expand the catalog and run parameters into build jobs
//!
//! Planning is pure. It reads nothing but its inputs, so the same catalog and
//! parameters always produce the same jobs in the same order.

use crate::catalog::naming::bundle_name;
use crate::catalog::{PackagingVariant, PlatformFamily, TargetDescriptor};
use crate::core::error::{ShipError, ShipResult};
use crate::matrix::plan::{BuildJob, BuildPlan, JobClass, RunParams};
use std::collections::{HashMap, HashSet};

/// Expand `catalog` into the job set for one run
pub fn plan(project: &str, catalog: &[TargetDescriptor], params: &RunParams) -> ShipResult<BuildPlan> {
  validate_release_string("version", &params.version)?;
  let mut resolved = params.clone();
  if !resolved.prerelease && is_semver_prerelease(&resolved.version) {
    tracing::info!(version = %resolved.version, "pre-release version; publishing as prerelease");
    resolved.prerelease = true;
  }
  let params = &resolved;

  validate_release_string("tag", &params.tag)?;
  validate_catalog(catalog)?;

  for triple in &params.only {
    if !catalog.iter().any(|t| &t.triple == triple) {
      return Err(ShipError::planning(format!("--only names unknown target '{}'", triple)));
    }
  }

  let selected = catalog
    .iter()
    .filter(|t| t.active)
    .filter(|t| params.only.is_empty() || params.only.contains(&t.triple));

  // Matrix jobs first, installer jobs after, each in catalog order
  let (installers, matrix): (Vec<&TargetDescriptor>, Vec<&TargetDescriptor>) =
    selected.partition(|t| t.variant == PackagingVariant::Installer);

  if matrix.is_empty() && installers.is_empty() {
    return Err(ShipError::planning("no active targets to build"));
  }

  let jobs: Vec<BuildJob> = matrix
    .into_iter()
    .map(|t| (JobClass::Matrix, t))
    .chain(installers.into_iter().map(|t| (JobClass::Installer, t)))
    .enumerate()
    .map(|(index, (class, target))| BuildJob {
      index,
      class,
      target: target.clone(),
      version: params.version.clone(),
      features: merge_features(&params.features, &target.features),
      bundle_name: bundle_name(project, target),
    })
    .collect();

  let mut seen_names = HashSet::new();
  for job in &jobs {
    if !seen_names.insert(job.bundle_name.as_str()) {
      return Err(ShipError::planning(format!(
        "bundle name '{}' is produced by more than one target",
        job.bundle_name
      )));
    }
  }

  tracing::debug!(jobs = jobs.len(), tag = %params.tag, "planned build matrix");
  Ok(BuildPlan::new(project, params.clone(), jobs))
}

/// Catalog-level checks that do not depend on the run
pub fn validate_catalog(catalog: &[TargetDescriptor]) -> ShipResult<()> {
  if catalog.is_empty() {
    return Err(ShipError::planning("target catalog is empty"));
  }

  let mut ids: HashMap<String, usize> = HashMap::new();
  for (idx, target) in catalog.iter().enumerate() {
    if target.triple.trim().is_empty() || target.triple.split('-').count() < 2 {
      return Err(ShipError::planning(format!(
        "target #{} has an invalid triple '{}'",
        idx + 1,
        target.triple
      )));
    }

    if let Some(first) = ids.insert(target.id(), idx) {
      return Err(ShipError::planning(format!(
        "targets #{} and #{} are both '{}'",
        first + 1,
        idx + 1,
        target.id()
      )));
    }

    if target.variant == PackagingVariant::Installer && target.family != PlatformFamily::Windows {
      return Err(ShipError::planning(format!(
        "'{}' uses the installer variant, which is only available for windows targets",
        target.id()
      )));
    }

    if target.variant == PackagingVariant::DistroPackage && target.cross && target.container.is_none() {
      return Err(ShipError::planning(format!(
        "'{}' is a cross distro package but names no container to package in",
        target.id()
      )));
    }

    if target.variant == PackagingVariant::DistroPackage && target.family != PlatformFamily::Linux {
      return Err(ShipError::planning(format!(
        "'{}' uses the distro-package variant, which is only available for linux targets",
        target.id()
      )));
    }
  }

  Ok(())
}

fn validate_release_string(field: &str, value: &str) -> ShipResult<()> {
  let valid_chars = value
    .chars()
    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | '+'));

  if value.is_empty() || value.starts_with('-') || !valid_chars {
    return Err(ShipError::planning(format!("{} '{}' is not a valid release name", field, value)));
  }

  Ok(())
}

/// Semver with a pre-release part (`1.2.0-rc.1`, `v2.0.0-beta`)
fn is_semver_prerelease(version: &str) -> bool {
  semver::Version::parse(version.trim_start_matches('v')).is_ok_and(|v| !v.pre.is_empty())
}

fn merge_features(run: &[String], target: &[String]) -> Vec<String> {
  let mut merged: Vec<String> = Vec::with_capacity(run.len() + target.len());
  for feature in run.iter().chain(target) {
    if !merged.contains(feature) {
      merged.push(feature.clone());
    }
  }
  merged
}
