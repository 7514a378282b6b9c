use crate::core::context::ProjectContext;
use crate::core::error::ShipResult;
use crate::staging::sweep_expired;
use chrono::Utc;

/// Remove staging areas older than the retention window
pub fn run_sweep(ctx: &ProjectContext, retention_days: Option<u32>, json: bool) -> ShipResult<()> {
  let mut staging = ctx.config.staging.clone();
  if let Some(days) = retention_days {
    staging.retention_days = days;
  }
  let days = staging.retention_days;
  let report = sweep_expired(&ctx.resolve(&staging.dir), staging.retention(), Utc::now())?;

  if json {
    println!("{}", serde_json::to_string_pretty(&report)?);
    return Ok(());
  }

  if report.removed.is_empty() {
    println!("✨ Nothing older than {} day(s); {} run(s) kept", days, report.kept);
  } else {
    println!("🧹 Removed {} expired run(s):", report.removed.len());
    for run in &report.removed {
      println!("   {}", run);
    }
    println!("   {} run(s) kept", report.kept);
  }
  Ok(())
}
