//! Integration tests for trigger gating and duplicate suppression

use crate::helpers::{TestProject, stdout};
use anyhow::Result;

#[test]
fn test_push_without_build_inputs_is_skipped() -> Result<()> {
  let project = TestProject::new()?;
  let decision = project.shipyard_json(&["gate", "--trigger", "push", "--changed", "README.md,docs/guide.md"])?;
  assert_eq!(decision["decision"]["decision"], "skip");

  let output = project.shipyard_ok(&["run", "--version", "1.0.0", "--trigger", "push", "--changed", "README.md"])?;
  assert!(stdout(&output).contains("Skipping run"), "{}", stdout(&output));
  assert!(!project.has_release("1.0.0"));
  Ok(())
}

#[test]
fn test_duplicate_change_set_runs_once() -> Result<()> {
  let project = TestProject::new()?;
  let args = [
    "run",
    "--version",
    "1.0.0",
    "--trigger",
    "push",
    "--changed",
    "src/main.rs,Cargo.lock",
  ];

  let first = project.shipyard_json(&args)?;
  assert_eq!(first["outcome"], "finished");

  // Same paths in a different order carry the same signature
  let second = project.shipyard_json(&[
    "run",
    "--version",
    "1.0.0",
    "--trigger",
    "push",
    "--changed",
    "Cargo.lock,src/main.rs",
  ])?;
  assert_eq!(second["outcome"], "skipped");

  let status = project.shipyard_json(&["status"])?;
  assert_eq!(status["ledger_entries"], 1);
  Ok(())
}

#[test]
fn test_same_paths_with_new_content_run_again() -> Result<()> {
  let project = TestProject::new()?;
  let source = project.path.join("src").join("main.rs");
  std::fs::create_dir_all(source.parent().unwrap())?;
  std::fs::write(&source, "fn main() {}\n")?;
  let args = ["run", "--version", "1.0.0", "--trigger", "push", "--changed", "src/main.rs"];

  assert_eq!(project.shipyard_json(&args)?["outcome"], "finished");
  assert_eq!(project.shipyard_json(&args)?["outcome"], "skipped");

  std::fs::write(&source, "fn main() { println!(\"v2\"); }\n")?;
  assert_eq!(project.shipyard_json(&args)?["outcome"], "finished");

  let status = project.shipyard_json(&["status"])?;
  assert_eq!(status["ledger_entries"], 2);
  Ok(())
}

#[test]
fn test_prefix_match_respects_path_components() -> Result<()> {
  let project = TestProject::new()?;
  let decision = project.shipyard_json(&["gate", "--trigger", "push", "--changed", "srcgen/out.rs,Cargo.toml.orig"])?;
  assert_eq!(decision["decision"]["decision"], "skip");
  Ok(())
}

#[test]
fn test_manual_trigger_always_proceeds() -> Result<()> {
  let project = TestProject::new()?;
  let decision = project.shipyard_json(&["gate", "--trigger", "manual"])?;
  assert_eq!(decision["decision"]["decision"], "proceed");
  assert_eq!(decision["trigger"], "manual");
  Ok(())
}
