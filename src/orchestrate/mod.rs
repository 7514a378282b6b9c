//! Run orchestration
//!
//! - **controller**: supersession of runs within a concurrency group
//! - **fanout**: parallel build + package per job
//! - **aggregate**: the fan-in barrier producing the release manifest
//!
//! ```text
//! BuildPlan ─┬─ job 0 ─┐
//!            ├─ job 1 ─┼─→ Aggregator → ReleaseManifest
//!            └─ job n ─┘
//! ```

pub mod aggregate;
pub mod controller;
pub mod fanout;

pub use aggregate::Aggregator;
pub use controller::{CancellationToken, ConcurrencyController, RunGuard};
pub use fanout::{JobOutcome, JobReport, JobRunner};

use crate::build::{BuildSettings, Builder, ToolRunner};
use crate::core::context::ProjectContext;
use crate::core::error::{ShipError, ShipResult};
use crate::matrix::BuildPlan;
use crate::package::Packager;
use crate::release::manifest::ReleaseManifest;
use crate::staging::StagingArea;
use crate::ui::JobProgress;
use chrono::Utc;
use std::sync::Arc;

/// Unique, sortable id for one run of a plan
pub fn new_run_id(plan: &BuildPlan) -> String {
  format!("{}-{}", Utc::now().format("%Y%m%dT%H%M%S%3f"), plan.id.short())
}

/// A finished matrix: the staged bundles and the manifest describing them
pub struct MatrixResult {
  pub staging: StagingArea,
  pub manifest: ReleaseManifest,
}

/// Fan the plan out on the job pool and wait at the barrier.
///
/// A superseded run discards its staging area and returns `Cancelled`.
pub fn execute_matrix(
  ctx: &ProjectContext,
  plan: &BuildPlan,
  guard: &RunGuard,
  builder: Arc<dyn Builder>,
  tools: Arc<dyn ToolRunner>,
  progress: JobProgress,
) -> ShipResult<MatrixResult> {
  let config = &ctx.config;
  let staging = StagingArea::create(&ctx.resolve(&config.staging.dir), guard.run_id())?;

  let runner = Arc::new(JobRunner {
    builder,
    packager: Arc::new(Packager::new(
      ctx.project.name.as_str(),
      &ctx.root,
      config.packaging.clone(),
      config.build.container_engine.as_str(),
      tools,
    )),
    settings: BuildSettings {
      root: ctx.root.clone(),
      binary: ctx.project.binary.clone(),
      config: config.build.clone(),
      work_root: staging.work_dir(),
    },
    staging: staging.clone(),
    progress,
  });

  let pool = fanout::job_pool(config.concurrency.max_parallel)?;
  tracing::info!(run = guard.run_id(), jobs = plan.len(), threads = pool.current_num_threads(), "fanning out");
  let reports = fanout::fan_out(&pool, runner, &plan.jobs, guard.token());

  let manifest = Aggregator::new(plan, config.concurrency.timeout()).collect(reports, Some(guard));

  if guard.poll() {
    staging.discard()?;
    return Err(ShipError::Cancelled {
      group: guard.group().to_string(),
    });
  }

  Ok(MatrixResult { staging, manifest })
}
