//! Integration tests for `shipyard plan`

use crate::helpers::{TestProject, best_effort, stdout, supported};
use anyhow::Result;

#[test]
fn test_plan_is_deterministic() -> Result<()> {
  let project = TestProject::new()?;
  let first = project.shipyard_json(&["plan", "--version", "1.0.0"])?;
  let second = project.shipyard_json(&["plan", "--version", "1.0.0"])?;

  assert_eq!(first["id"], second["id"]);
  assert_eq!(first["jobs"].as_array().map(Vec::len), Some(3));
  assert_eq!(first["params"]["tag"], "1.0.0");
  assert_eq!(first["jobs"][0]["bundle_name"], "demo_x86_64-unknown-linux-gnu.tar.gz");
  Ok(())
}

#[test]
fn test_plan_only_restricts_targets() -> Result<()> {
  let project = TestProject::new()?;
  let plan = project.shipyard_json(&["plan", "--version", "1.0.0", "--only", "aarch64-apple-darwin"])?;

  let jobs = plan["jobs"].as_array().expect("jobs");
  assert_eq!(jobs.len(), 1);
  assert_eq!(jobs[0]["target"]["triple"], "aarch64-apple-darwin");
  Ok(())
}

#[test]
fn test_plan_human_output_marks_best_effort() -> Result<()> {
  let project = TestProject::with_targets(&[
    supported("linux", "x86_64-unknown-linux-gnu"),
    best_effort("freebsd", "x86_64-unknown-freebsd"),
  ])?;
  let output = project.shipyard_ok(&["plan", "--version", "2.0.0", "--tag", "v2.0.0"])?;
  let text = stdout(&output);

  assert!(text.contains("x86_64-unknown-freebsd"), "{}", text);
  assert!(text.contains("best-effort"), "{}", text);
  assert!(text.contains("v2.0.0"), "{}", text);
  Ok(())
}
