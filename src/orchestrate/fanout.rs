//! Fan-out: every job runs as an independent task on the job pool
//!
//! Jobs share nothing mutable. Each one builds into its own work directory, packages,
//! and sends exactly one `JobReport` back over the channel. A failing job never
//! cancels its siblings; only supersession does.

use crate::build::{BuildSettings, Builder};
use crate::catalog::SupportTier;
use crate::core::error::{ShipError, ShipResult};
use crate::matrix::{BuildJob, JobClass};
use crate::orchestrate::controller::CancellationToken;
use crate::package::{Bundle, Packager};
use crate::staging::StagingArea;
use crate::ui::JobProgress;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver};
use std::time::{Duration, Instant};

/// Terminal state of one job
#[derive(Debug)]
pub enum JobOutcome {
  Succeeded(Vec<Bundle>),
  Failed(ShipError),
  Cancelled,
}

/// What a job sends to the aggregator
#[derive(Debug)]
pub struct JobReport {
  pub index: usize,
  pub target: String,
  pub tier: SupportTier,
  pub outcome: JobOutcome,
  pub elapsed: Duration,
}

/// Everything a job needs, shared read-only across the pool
pub struct JobRunner {
  pub builder: Arc<dyn Builder>,
  pub packager: Arc<Packager>,
  pub settings: BuildSettings,
  pub staging: StagingArea,
  pub progress: JobProgress,
}

impl JobRunner {
  /// Build then package one job. Installer jobs go straight to the packager, whose
  /// installer tool does its own build.
  pub fn run_job(&self, job: &BuildJob, token: &CancellationToken) -> JobOutcome {
    if token.is_cancelled() {
      return JobOutcome::Cancelled;
    }

    let built = match job.class {
      JobClass::Matrix => self.builder.build(job, &self.settings),
      JobClass::Installer => self.settings.installer_output(job),
    };
    let output = match built {
      Ok(output) => output,
      Err(e) => return JobOutcome::Failed(e),
    };
    self.progress.step(job.index);

    if token.is_cancelled() {
      return JobOutcome::Cancelled;
    }

    match self.packager.package(&output, job, &self.staging) {
      Ok(bundles) => JobOutcome::Succeeded(bundles),
      Err(e) => JobOutcome::Failed(e),
    }
  }
}

/// Build the job pool (`max_parallel` 0 = one thread per CPU)
pub fn job_pool(max_parallel: usize) -> ShipResult<rayon::ThreadPool> {
  let mut builder = rayon::ThreadPoolBuilder::new().thread_name(|i| format!("shipyard-job-{}", i));
  if max_parallel > 0 {
    builder = builder.num_threads(max_parallel);
  }
  Ok(builder.build()?)
}

/// Spawn every job and return the channel their reports arrive on
pub fn fan_out(
  pool: &rayon::ThreadPool,
  runner: Arc<JobRunner>,
  jobs: &[BuildJob],
  token: &CancellationToken,
) -> Receiver<JobReport> {
  let (tx, rx) = mpsc::channel();

  for job in jobs.iter().cloned() {
    let tx = tx.clone();
    let runner = Arc::clone(&runner);
    let token = token.clone();

    pool.spawn(move || {
      let started = Instant::now();
      let target = job.target.id();
      tracing::debug!(job = job.index, target = %target, "job started");

      let outcome = runner.run_job(&job, &token);
      runner.progress.finish(job.index);

      match outcome {
        JobOutcome::Succeeded(ref bundles) => {
          tracing::info!(job = job.index, target = %target, bundles = bundles.len(), "job succeeded")
        }
        JobOutcome::Failed(ref e) => tracing::warn!(job = job.index, target = %target, error = %e, "job failed"),
        JobOutcome::Cancelled => tracing::info!(job = job.index, target = %target, "job cancelled"),
      }

      // The aggregator may have stopped listening after its deadline
      tx.send(JobReport {
        index: job.index,
        target,
        tier: job.tier(),
        outcome,
        elapsed: started.elapsed(),
      })
      .ok();
    });
  }

  rx
}
