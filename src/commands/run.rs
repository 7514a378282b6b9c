//! `shipyard run`: gate, plan, build and package in parallel, aggregate, publish

use crate::build::{Builder, CommandBuilder, SystemRunner, ToolRunner};
use crate::commands::gate::evaluate;
use crate::commands::{ReleaseArgs, TriggerArgs};
use crate::core::context::ProjectContext;
use crate::core::error::ShipResult;
use crate::gate::GateDecision;
use crate::gate::ledger::SuccessLedger;
use crate::matrix::planner;
use crate::orchestrate::{self, ConcurrencyController};
use crate::release::{PublishReport, PublishState, Publisher, ReleaseManifest, open_store};
use crate::staging::sweep_expired;
use crate::ui::JobProgress;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;

#[derive(Serialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
enum RunSummary<'a> {
  Skipped {
    reason: &'a str,
  },
  Failed {
    run_id: &'a str,
    manifest: &'a ReleaseManifest,
    error: String,
  },
  Finished {
    run_id: &'a str,
    manifest: &'a ReleaseManifest,
    publish: &'a PublishReport,
  },
}

pub fn run_release(ctx: &ProjectContext, trigger_args: &TriggerArgs, args: &ReleaseArgs, json: bool) -> ShipResult<()> {
  let (trigger, decision) = evaluate(ctx, trigger_args, args.mock)?;

  if let GateDecision::Skip { ref reason } = decision {
    if json {
      println!("{}", serde_json::to_string_pretty(&RunSummary::Skipped { reason })?);
    } else {
      println!("⏭️  Skipping run: {}", reason);
    }
    return Ok(());
  }

  let swept = sweep_expired(
    &ctx.resolve(&ctx.config.staging.dir),
    ctx.config.staging.retention(),
    Utc::now(),
  )?;
  if !swept.removed.is_empty() {
    tracing::info!(removed = swept.removed.len(), "expired staging areas removed before run");
  }

  let params = args.params(ctx)?;
  let plan = planner::plan(&ctx.project.name, &ctx.config.catalog(), &params)?;
  if !json {
    println!(
      "📋 Plan {} for {} {}: {} job(s) [{}]",
      plan.id.short(),
      plan.project,
      plan.params.tag,
      plan.len(),
      trigger
    );
  }

  let run_id = orchestrate::new_run_id(&plan);
  let controller = ConcurrencyController::new(&ctx.resolve(&ctx.config.gate.state_dir));
  let guard = controller.register(&trigger_args.group(&trigger), &run_id)?;

  let tools: Arc<dyn ToolRunner> = Arc::new(SystemRunner);
  let builder: Arc<dyn Builder> = Arc::new(CommandBuilder::new(Arc::clone(&tools)));
  let progress = if json {
    JobProgress::hidden()
  } else {
    JobProgress::new(plan.jobs.iter().map(|job| job.label()))
  };

  let result = orchestrate::execute_matrix(ctx, &plan, &guard, builder, Arc::clone(&tools), progress)?;
  let manifest = result.manifest;

  if !json {
    print_failures(&manifest);
  }

  if let Err(e) = guard.check() {
    result.staging.discard()?;
    return Err(e);
  }

  if let Some(error) = manifest.run_error() {
    if json {
      let summary = RunSummary::Failed {
        run_id: &run_id,
        manifest: &manifest,
        error: error.to_string(),
      };
      println!("{}", serde_json::to_string_pretty(&summary)?);
    }
    return Err(error);
  }

  let store = open_store(ctx, tools);
  let mut publisher = Publisher::new(store.as_ref(), ctx.config.publish.replace_pause());
  let report = publisher.publish(&manifest)?;

  if report.state == PublishState::Published
    && let Some(signature) = decision.signature()
  {
    let mut ledger = SuccessLedger::open(&ctx.resolve(&ctx.config.gate.state_dir))?;
    ledger.record(signature.clone(), &report.tag)?;
  }

  if json {
    let summary = RunSummary::Finished {
      run_id: &run_id,
      manifest: &manifest,
      publish: &report,
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);
    return Ok(());
  }

  println!();
  match report.state {
    PublishState::MockCompleted => {
      println!("🧪 Mock run complete: {} bundle(s) validated, store untouched", report.files.len());
    }
    _ => {
      let verb = if report.replaced { "Replaced" } else { "Created" };
      println!(
        "✅ {} release {} on {} with {} file(s)",
        verb,
        report.tag,
        store.kind(),
        report.files.len()
      );
    }
  }
  for file in &report.files {
    println!("   {}", file);
  }
  println!("   staged in {}", result.staging.dir().display());

  Ok(())
}

fn print_failures(manifest: &ReleaseManifest) {
  if manifest.failures.is_empty() {
    return;
  }

  println!();
  for failure in &manifest.failures {
    let icon = if failure.is_fatal() { "❌" } else { "⚠️ " };
    println!("{} {} ({}, {}): {}", icon, failure.target, failure.tier, failure.kind, failure.message);
  }
}
