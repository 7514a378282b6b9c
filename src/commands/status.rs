//! `shipyard status`: what the gate remembers, what is staged, what is released

use crate::build::SystemRunner;
use crate::core::config::StoreKind;
use crate::core::context::ProjectContext;
use crate::core::error::ShipResult;
use crate::gate::ledger::{LedgerEntry, SuccessLedger};
use crate::release::{LocalReleaseStore, ReleaseRecord, open_store};
use crate::staging::{StagedRun, list_runs};
use serde::Serialize;
use std::sync::Arc;

#[derive(Serialize)]
struct StatusReport {
  project: String,
  store: String,
  ledger_entries: usize,
  #[serde(skip_serializing_if = "Option::is_none")]
  last_success: Option<LedgerEntry>,
  staged_runs: Vec<StagedRun>,
  releases: Vec<ReleaseRecord>,
}

pub fn run_status(ctx: &ProjectContext, tag: Option<&str>, json: bool) -> ShipResult<()> {
  let ledger = SuccessLedger::open(&ctx.resolve(&ctx.config.gate.state_dir))?;
  let staged_runs = list_runs(&ctx.resolve(&ctx.config.staging.dir))?;

  let publish = &ctx.config.publish;
  let releases = match (tag, publish.store) {
    (Some(tag), _) => open_store(ctx, Arc::new(SystemRunner))
      .find_release(tag)?
      .into_iter()
      .collect(),
    (None, StoreKind::Local) => LocalReleaseStore::new(&ctx.resolve(&publish.local_dir)).list_releases()?,
    (None, StoreKind::Github) => Vec::new(),
  };

  let report = StatusReport {
    project: ctx.project.name.clone(),
    store: format!("{:?}", publish.store).to_lowercase(),
    ledger_entries: ledger.len(),
    last_success: ledger.last().cloned(),
    staged_runs,
    releases,
  };

  if json {
    println!("{}", serde_json::to_string_pretty(&report)?);
    return Ok(());
  }

  println!("📦 {} (store: {})", report.project, report.store);
  println!();

  match report.last_success {
    Some(ref entry) => println!(
      "🔒 Ledger: {} successful change set(s), last {} for {} at {}",
      report.ledger_entries,
      entry.signature.short(),
      entry.tag,
      entry.recorded_at.format("%Y-%m-%d %H:%M UTC")
    ),
    None => println!("🔒 Ledger: empty"),
  }

  if report.staged_runs.is_empty() {
    println!("🗂️  No staged runs");
  } else {
    println!("🗂️  {} staged run(s):", report.staged_runs.len());
    for run in &report.staged_runs {
      println!(
        "   {} ({} bundle(s), {})",
        run.run_id,
        run.bundles,
        run.created.format("%Y-%m-%d %H:%M UTC")
      );
    }
  }

  if report.releases.is_empty() {
    match tag {
      Some(tag) => println!("🚀 No release at {}", tag),
      None if publish.store == StoreKind::Github => println!("🚀 Pass --tag to look up a GitHub release"),
      None => println!("🚀 No releases"),
    }
  } else {
    for release in &report.releases {
      let pre = if release.prerelease { " (prerelease)" } else { "" };
      println!("🚀 {}{}: {} file(s)", release.tag, pre, release.files.len());
      for file in &release.files {
        println!("   {}", file);
      }
    }
  }

  Ok(())
}
