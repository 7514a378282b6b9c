//! Integration tests for `shipyard run`: fan-out, aggregation and failure handling

use crate::helpers::{TestProject, best_effort, exit_code, installer, stderr, stdout, supported};
use anyhow::Result;

#[test]
fn test_run_publishes_every_bundle() -> Result<()> {
  let project = TestProject::new()?;
  let output = project.shipyard_ok(&["run", "--version", "1.0.0"])?;
  assert!(stdout(&output).contains("Created release 1.0.0"), "{}", stdout(&output));

  assert_eq!(
    project.released_files("1.0.0")?,
    [
      "demo_aarch64-apple-darwin.tar.gz",
      "demo_x86_64-pc-windows-msvc.zip",
      "demo_x86_64-unknown-linux-gnu.tar.gz",
    ]
  );
  Ok(())
}

#[test]
fn test_run_json_manifest_orders_bundles_by_job() -> Result<()> {
  let project = TestProject::new()?;
  let summary = project.shipyard_json(&["run", "--version", "1.0.0", "--tag", "v1.0.0"])?;

  assert_eq!(summary["outcome"], "finished");
  assert_eq!(summary["publish"]["state"], "published");
  assert_eq!(summary["manifest"]["failed"], false);

  let names: Vec<&str> = summary["manifest"]["bundles"]
    .as_array()
    .expect("bundles")
    .iter()
    .map(|b| b["name"].as_str().unwrap())
    .collect();
  assert_eq!(
    names,
    [
      "demo_x86_64-unknown-linux-gnu.tar.gz",
      "demo_aarch64-apple-darwin.tar.gz",
      "demo_x86_64-pc-windows-msvc.zip",
    ]
  );

  for bundle in summary["manifest"]["bundles"].as_array().unwrap() {
    assert_eq!(bundle["sha256"].as_str().map(str::len), Some(64));
  }
  Ok(())
}

#[test]
fn test_best_effort_failure_still_releases() -> Result<()> {
  let mut project = TestProject::with_targets(&[
    supported("linux", "x86_64-unknown-linux-gnu"),
    supported("windows", "x86_64-pc-windows-msvc"),
    best_effort("freebsd", "x86_64-unknown-freebsd"),
  ])?;
  project.fail_target("x86_64-unknown-freebsd");

  let output = project.shipyard_ok(&["run", "--version", "1.0.0"])?;
  let text = stdout(&output);
  assert!(text.contains("x86_64-unknown-freebsd"), "failure should be reported:\n{}", text);

  assert_eq!(
    project.released_files("1.0.0")?,
    ["demo_x86_64-pc-windows-msvc.zip", "demo_x86_64-unknown-linux-gnu.tar.gz"]
  );
  Ok(())
}

#[test]
fn test_installer_job_feeds_same_release_when_best_effort_target_fails() -> Result<()> {
  let mut project = TestProject::with_targets(&[
    supported("linux", "x86_64-unknown-linux-gnu"),
    installer("x86_64-pc-windows-msvc"),
    best_effort("linux", "riscv64gc-unknown-linux-gnu"),
  ])?;
  project.fail_target("riscv64gc-unknown-linux-gnu");

  let summary = project.shipyard_json(&["run", "--version", "1.0.0"])?;
  assert_eq!(summary["manifest"]["failed"], false);
  assert_eq!(summary["manifest"]["failures"][0]["tier"], "best-effort");

  assert_eq!(
    project.released_files("1.0.0")?,
    ["demo_x86_64-pc-windows-msvc.msi", "demo_x86_64-unknown-linux-gnu.tar.gz"]
  );
  Ok(())
}

#[test]
fn test_supported_failure_leaves_store_untouched() -> Result<()> {
  let mut project = TestProject::new()?;
  project.shipyard_ok(&["run", "--version", "1.0.0"])?;
  let before = project.released_files("1.0.0")?;

  project.fail_target("aarch64-apple-darwin");
  let output = project.shipyard(&["run", "--version", "1.0.0"])?;

  assert_eq!(exit_code(&output), 4, "stderr: {}", stderr(&output));
  assert!(stderr(&output).contains("aarch64-apple-darwin"));
  assert_eq!(project.released_files("1.0.0")?, before);
  Ok(())
}

#[test]
fn test_failed_run_json_lists_failures_and_collected_bundles() -> Result<()> {
  let mut project = TestProject::with_targets(&[
    supported("linux", "x86_64-unknown-linux-gnu"),
    supported("macos", "aarch64-apple-darwin"),
    best_effort("linux", "riscv64gc-unknown-linux-gnu"),
  ])?;
  project.fail_target("aarch64-apple-darwin");
  project.fail_target("riscv64gc-unknown-linux-gnu");

  let output = project.shipyard(&["run", "--version", "1.0.0", "--json"])?;
  assert_eq!(exit_code(&output), 4);

  let summary: serde_json::Value = serde_json::from_slice(&output.stdout)?;
  assert_eq!(summary["outcome"], "failed");
  assert_eq!(summary["manifest"]["failed"], true);
  assert_eq!(summary["manifest"]["bundles"][0]["name"], "demo_x86_64-unknown-linux-gnu.tar.gz");

  let failures = summary["manifest"]["failures"].as_array().expect("failures");
  assert_eq!(failures.len(), 2);
  assert!(
    failures
      .iter()
      .any(|f| f["target"] == "aarch64-apple-darwin:native-archive" && f["tier"] == "supported")
  );
  assert!(failures.iter().all(|f| f["message"].as_str().is_some_and(|m| m.contains("linker failed"))));
  assert!(!project.has_release("1.0.0"));
  Ok(())
}

#[test]
fn test_supported_failure_on_first_release_creates_nothing() -> Result<()> {
  let mut project = TestProject::new()?;
  project.fail_target("x86_64-pc-windows-msvc");

  let output = project.shipyard(&["run", "--version", "3.1.0"])?;
  assert_eq!(exit_code(&output), 4);
  assert!(!project.has_release("3.1.0"));
  Ok(())
}

#[test]
fn test_mock_trigger_must_be_manual() -> Result<()> {
  let project = TestProject::new()?;
  let output = project.shipyard(&["run", "--version", "1.0.0", "--mock", "--trigger", "schedule"])?;

  assert_ne!(exit_code(&output), 0);
  assert!(stderr(&output).contains("manual"));
  Ok(())
}
