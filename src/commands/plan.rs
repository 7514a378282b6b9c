//! `shipyard plan`: show the job set a run would execute

use crate::commands::ReleaseArgs;
use crate::core::context::ProjectContext;
use crate::core::error::ShipResult;
use crate::matrix::planner;

pub fn run_plan(ctx: &ProjectContext, args: &ReleaseArgs, json: bool) -> ShipResult<()> {
  let params = args.params(ctx)?;
  let plan = planner::plan(&ctx.project.name, &ctx.config.catalog(), &params)?;

  if json {
    println!("{}", plan.to_json()?);
  } else {
    print!("{}", plan.to_human_readable());
  }
  Ok(())
}
