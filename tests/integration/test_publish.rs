//! Integration tests for reconcile-by-replace publishing

use crate::helpers::{TestProject, stdout};
use anyhow::Result;

#[test]
fn test_publishing_twice_leaves_one_release() -> Result<()> {
  let project = TestProject::new()?;
  project.shipyard_ok(&["run", "--version", "1.0.0"])?;
  let first = project.released_files("1.0.0")?;

  let output = project.shipyard_ok(&["run", "--version", "1.0.0"])?;
  assert!(stdout(&output).contains("Replaced release 1.0.0"), "{}", stdout(&output));
  assert_eq!(project.released_files("1.0.0")?, first);

  let releases: Vec<_> = std::fs::read_dir(project.path.join("releases"))?
    .filter_map(|e| e.ok())
    .map(|e| e.file_name().to_string_lossy().into_owned())
    .collect();
  assert_eq!(releases, ["1.0.0"]);
  Ok(())
}

#[test]
fn test_mock_run_does_not_touch_store() -> Result<()> {
  let project = TestProject::new()?;
  let summary = project.shipyard_json(&["run", "--version", "1.0.0", "--mock"])?;

  assert_eq!(summary["publish"]["state"], "mock-completed");
  assert_eq!(summary["publish"]["files"].as_array().map(Vec::len), Some(3));
  assert!(!project.path.join("releases").exists());
  Ok(())
}

#[test]
fn test_prerelease_flag_is_recorded() -> Result<()> {
  let project = TestProject::new()?;
  project.shipyard_ok(&["run", "--version", "2.0.0-rc.1", "--prerelease"])?;

  let status = project.shipyard_json(&["status", "--tag", "2.0.0-rc.1"])?;
  assert_eq!(status["releases"][0]["prerelease"], true);
  assert_eq!(status["releases"][0]["files"].as_array().map(Vec::len), Some(3));
  Ok(())
}
