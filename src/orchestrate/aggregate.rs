//! Fan-in barrier
//!
//! Waits until every planned job reports a terminal state, or the deadline passes.
//! Successful bundles are always collected, also when the run ends up failed, so a
//! failed run still shows the maximal set of outputs. Only here do job failures
//! escalate into a run failure.

use crate::matrix::{BuildJob, BuildPlan};
use crate::orchestrate::controller::RunGuard;
use crate::orchestrate::fanout::{JobOutcome, JobReport};
use crate::package::Bundle;
use crate::release::manifest::{FailureKind, JobFailure, ReleaseManifest};
use std::collections::BTreeMap;
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

/// How often the barrier wakes to check for supersession
const POLL_INTERVAL: Duration = Duration::from_millis(250);

pub struct Aggregator<'a> {
  plan: &'a BuildPlan,
  deadline: Duration,
}

impl<'a> Aggregator<'a> {
  pub fn new(plan: &'a BuildPlan, deadline: Duration) -> Self {
    Self { plan, deadline }
  }

  /// Collect reports into a manifest.
  ///
  /// Jobs still pending at the deadline are recorded as timeout failures. A supported
  /// straggler fails the run and `ReleaseManifest::run_error` reports it as
  /// `AggregationIncomplete`; bundles of the jobs that did finish are kept.
  pub fn collect(&self, reports: Receiver<JobReport>, guard: Option<&RunGuard>) -> ReleaseManifest {
    let mut pending: BTreeMap<usize, &BuildJob> = self.plan.jobs.iter().map(|j| (j.index, j)).collect();
    let mut bundles: BTreeMap<usize, Vec<Bundle>> = BTreeMap::new();
    let mut manifest = ReleaseManifest::for_plan(self.plan);
    let deadline = Instant::now().checked_add(self.deadline);

    while !pending.is_empty() {
      let remaining = match deadline {
        Some(deadline) => deadline.saturating_duration_since(Instant::now()),
        None => POLL_INTERVAL,
      };
      if remaining.is_zero() {
        break;
      }

      match reports.recv_timeout(POLL_INTERVAL.min(remaining)) {
        Ok(report) => {
          if pending.remove(&report.index).is_none() {
            tracing::warn!(job = report.index, "ignoring report for unknown or finished job");
            continue;
          }
          tracing::debug!(job = report.index, elapsed_ms = report.elapsed.as_millis() as u64, "job reported");
          match report.outcome {
            JobOutcome::Succeeded(produced) => {
              bundles.insert(report.index, produced);
            }
            JobOutcome::Failed(error) => {
              manifest.record_failure(JobFailure::from_error(report.target, report.tier, &error));
            }
            JobOutcome::Cancelled => manifest.record_failure(JobFailure {
              target: report.target,
              tier: report.tier,
              kind: FailureKind::Cancelled,
              message: "cancelled before completion".to_string(),
            }),
          }
        }
        Err(RecvTimeoutError::Timeout) => {
          if let Some(guard) = guard {
            guard.poll();
          }
        }
        Err(RecvTimeoutError::Disconnected) => break,
      }
    }

    for job in pending.values() {
      let tier = job.tier();
      if tier.is_supported() {
        tracing::error!(job = job.index, target = %job.target.id(), "supported job missed the deadline");
      }
      manifest.record_failure(JobFailure {
        target: job.target.id(),
        tier,
        kind: FailureKind::Timeout,
        message: format!("no result within {}s", self.deadline.as_secs()),
      });
    }

    manifest.bundles = bundles.into_values().flatten().collect();
    tracing::info!(
      bundles = manifest.bundles.len(),
      failures = manifest.failures.len(),
      failed = manifest.failed,
      "aggregation complete"
    );
    manifest
  }
}
