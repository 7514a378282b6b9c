//! Integration tests for `shipyard init` and `shipyard targets`

use crate::helpers::{TestProject, exit_code, stderr};
use anyhow::Result;

#[test]
fn test_init_writes_config_and_refuses_to_overwrite() -> Result<()> {
  let project = TestProject::new()?;
  std::fs::remove_file(project.path.join("shipyard.toml"))?;

  project.shipyard_ok(&["init", "--with-catalog"])?;
  let written = std::fs::read_to_string(project.path.join("shipyard.toml"))?;
  assert!(written.contains("[[targets]]"), "catalog should be written:\n{}", written);
  assert!(written.contains("x86_64-unknown-linux-gnu"));

  let again = project.shipyard(&["init"])?;
  assert_ne!(exit_code(&again), 0);
  assert!(stderr(&again).contains("--force"));

  project.shipyard_ok(&["init", "--force"])?;
  Ok(())
}

#[test]
fn test_targets_json_lists_catalog_in_order() -> Result<()> {
  let project = TestProject::new()?;
  let targets = project.shipyard_json(&["targets"])?;
  let targets = targets.as_array().expect("array of targets");

  let triples: Vec<&str> = targets.iter().map(|t| t["triple"].as_str().unwrap()).collect();
  assert_eq!(
    triples,
    ["x86_64-unknown-linux-gnu", "aarch64-apple-darwin", "x86_64-pc-windows-msvc"]
  );
  assert_eq!(targets[2]["bundle"], "demo_x86_64-pc-windows-msvc.zip");
  Ok(())
}

#[test]
fn test_invalid_catalog_is_rejected() -> Result<()> {
  let project = TestProject::new()?;
  let mut config = std::fs::read_to_string(project.path.join("shipyard.toml"))?;
  config.push_str("\n[[targets]]\nfamily = \"linux\"\ntriple = \"x86_64-unknown-linux-gnu\"\nvariant = \"installer\"\n");
  std::fs::write(project.path.join("shipyard.toml"), config)?;

  let output = project.shipyard(&["targets"])?;
  assert_ne!(exit_code(&output), 0);
  assert!(stderr(&output).contains("installer"));
  Ok(())
}
