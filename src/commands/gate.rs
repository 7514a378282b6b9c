//! `shipyard gate`: evaluate the trigger gate without running anything

use crate::commands::TriggerArgs;
use crate::core::context::ProjectContext;
use crate::core::error::ShipResult;
use crate::gate::ledger::SuccessLedger;
use crate::gate::{GateDecision, TriggerGate, TriggerKind};
use serde::Serialize;

#[derive(Serialize)]
struct GateOutput<'a> {
  trigger: String,
  decision: &'a GateDecision,
}

pub fn run_gate(ctx: &ProjectContext, args: &TriggerArgs, mock: bool, json: bool) -> ShipResult<()> {
  let (trigger, decision) = evaluate(ctx, args, mock)?;

  if json {
    let output = GateOutput {
      trigger: trigger.to_string(),
      decision: &decision,
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    return Ok(());
  }

  match decision {
    GateDecision::Proceed { ref reason, .. } => println!("✅ proceed: {}", reason),
    GateDecision::Skip { ref reason } => println!("⏭️  skip: {}", reason),
  }
  Ok(())
}

/// Evaluate the gate for the current trigger; shared with `run`
pub fn evaluate(
  ctx: &ProjectContext,
  args: &TriggerArgs,
  mock: bool,
) -> ShipResult<(TriggerKind, GateDecision)> {
  let trigger = args.trigger(mock)?;
  let changes = if trigger.always_proceeds() {
    Default::default()
  } else {
    args.change_set(ctx)?
  };

  let ledger = SuccessLedger::open(&ctx.resolve(&ctx.config.gate.state_dir))?;
  let decision = TriggerGate::new(&ctx.config.gate.paths, &ledger).evaluate(&trigger, &changes);
  tracing::debug!(trigger = %trigger, proceeds = decision.proceeds(), "gate evaluated");
  Ok((trigger, decision))
}
