//! Integration tests for staging retention

use crate::helpers::{TestProject, stage_fake_run};
use anyhow::Result;

#[test]
fn test_sweep_removes_only_expired_runs() -> Result<()> {
  let project = TestProject::new()?;
  let staging = project.staging_dir();
  project.shipyard_ok(&["run", "--version", "1.0.0"])?;
  stage_fake_run(&staging, "20200101T000000000-old", "2020-01-01T00:00:00+00:00")?;

  let report = project.shipyard_json(&["sweep"])?;
  assert_eq!(report["removed"][0], "20200101T000000000-old");
  assert_eq!(report["kept"], 1);
  assert!(!staging.join("20200101T000000000-old").exists());
  Ok(())
}

#[test]
fn test_run_removes_expired_staging_first() -> Result<()> {
  let project = TestProject::new()?;
  let staging = project.staging_dir();
  stage_fake_run(&staging, "20200101T000000000-old", "2020-01-01T00:00:00+00:00")?;

  project.shipyard_ok(&["run", "--version", "1.0.0"])?;
  assert!(!staging.join("20200101T000000000-old").exists());
  assert_eq!(std::fs::read_dir(&staging)?.count(), 1);
  Ok(())
}

#[test]
fn test_status_lists_staged_runs() -> Result<()> {
  let project = TestProject::new()?;
  project.shipyard_ok(&["run", "--version", "1.0.0"])?;

  let status = project.shipyard_json(&["status"])?;
  let runs = status["staged_runs"].as_array().expect("staged runs");
  assert_eq!(runs.len(), 1);
  assert_eq!(runs[0]["bundles"], 3);
  assert_eq!(status["store"], "local");
  Ok(())
}
