//! `shipyard targets`: show and validate the target catalog

use crate::catalog::naming::bundle_name;
use crate::core::context::ProjectContext;
use crate::core::error::ShipResult;
use crate::matrix::planner::validate_catalog;
use serde::Serialize;

#[derive(Serialize)]
struct TargetRow {
  id: String,
  family: String,
  triple: String,
  variant: String,
  tier: String,
  cross: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  container: Option<String>,
  active: bool,
  bundle: String,
}

pub fn run_targets(ctx: &ProjectContext, json: bool) -> ShipResult<()> {
  let catalog = ctx.config.catalog();
  validate_catalog(&catalog)?;

  let rows: Vec<TargetRow> = catalog
    .iter()
    .map(|t| TargetRow {
      id: t.id(),
      family: t.family.to_string(),
      triple: t.triple.clone(),
      variant: t.variant.to_string(),
      tier: if t.tier.is_supported() { "supported" } else { "best-effort" }.to_string(),
      cross: t.cross,
      container: t.container.clone(),
      active: t.active,
      bundle: bundle_name(&ctx.project.name, t),
    })
    .collect();

  if json {
    println!("{}", serde_json::to_string_pretty(&rows)?);
    return Ok(());
  }

  let source = if ctx.config.targets.is_empty() { "built-in" } else { "shipyard.toml" };
  println!("🎯 {} targets ({})", rows.len(), source);
  println!();
  for row in &rows {
    let mut flags = Vec::new();
    if row.tier != "supported" {
      flags.push("best-effort".to_string());
    }
    if row.cross {
      flags.push(match row.container {
        Some(ref image) => format!("cross: {}", image),
        None => "cross".to_string(),
      });
    }
    if !row.active {
      flags.push("inactive".to_string());
    }
    let flags = if flags.is_empty() {
      String::new()
    } else {
      format!(" [{}]", flags.join(", "))
    };

    println!("  {:<8} {:<40} {:<15}{}", row.family, row.triple, row.variant, flags);
    println!("           → {}", row.bundle);
  }

  Ok(())
}
