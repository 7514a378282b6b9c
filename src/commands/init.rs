use std::path::Path;

use crate::catalog::default_catalog;
use crate::core::config::ShipConfig;
use crate::core::error::{ShipError, ShipResult};
use cargo_metadata::MetadataCommand;

/// Write a default shipyard.toml in `root`
pub fn run_init(root: &Path, force: bool, with_catalog: bool) -> ShipResult<()> {
  if ShipConfig::exists(root) && !force {
    return Err(ShipError::with_help(
      format!("Configuration already exists in {}", root.display()),
      "Pass --force to overwrite it",
    ));
  }

  let mut config = ShipConfig::default();

  match MetadataCommand::new().current_dir(root).no_deps().exec() {
    Ok(metadata) => {
      if let Some(package) = metadata.root_package() {
        println!("📦 Found package {} {}", package.name, package.version);
        config.project.name = Some(package.name.to_string());
      }
    }
    Err(e) => {
      tracing::debug!(error = %e, "no cargo metadata; leaving project name unset");
      println!("⚠️  No Cargo package found; set [project] name in shipyard.toml");
    }
  }

  if with_catalog {
    config.targets = default_catalog();
    println!("🎯 Wrote the built-in catalog ({} targets)", config.targets.len());
  }

  config.save(root)?;
  println!("✅ Created {}", root.join("shipyard.toml").display());
  println!();
  println!("Next steps:");
  println!("  shipyard targets        # review the target catalog");
  println!("  shipyard plan --mock    # see what a run would build");
  Ok(())
}
