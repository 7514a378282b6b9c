//! Release manifest: the aggregator's output and the publisher's input

use crate::catalog::SupportTier;
use crate::core::error::{ShipError, ShipResult};
use crate::matrix::BuildPlan;
use crate::package::Bundle;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Why a job did not produce bundles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureKind {
  Build,
  PackagingMismatch,
  Cancelled,
  /// Still running when the aggregation deadline passed
  Timeout,
}

impl fmt::Display for FailureKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      FailureKind::Build => write!(f, "build failure"),
      FailureKind::PackagingMismatch => write!(f, "packaging mismatch"),
      FailureKind::Cancelled => write!(f, "cancelled"),
      FailureKind::Timeout => write!(f, "timed out"),
    }
  }
}

/// A job-level failure, attached to its target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobFailure {
  pub target: String,
  pub tier: SupportTier,
  pub kind: FailureKind,
  pub message: String,
}

impl JobFailure {
  pub fn from_error(target: impl Into<String>, tier: SupportTier, error: &ShipError) -> Self {
    let (kind, message) = match error {
      ShipError::PackagingMismatch { expected, actual, .. } => (
        FailureKind::PackagingMismatch,
        format!("package declares '{}' but '{}' was expected", actual, expected),
      ),
      ShipError::Build(failure) => (FailureKind::Build, failure.reason.clone()),
      ShipError::Cancelled { .. } => (FailureKind::Cancelled, error.to_string()),
      other => (FailureKind::Build, other.to_string()),
    };
    Self {
      target: target.into(),
      tier,
      kind,
      message,
    }
  }

  /// Whether this failure fails the run
  pub fn is_fatal(&self) -> bool {
    self.tier.is_supported()
  }
}

/// Every bundle of one run plus the run-failure flag
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseManifest {
  pub project: String,
  pub tag: String,
  pub version: String,
  pub prerelease: bool,
  pub mock: bool,
  pub plan_id: String,
  pub bundles: Vec<Bundle>,
  pub failures: Vec<JobFailure>,
  /// Set when a supported job failed; a failed manifest is never published
  pub failed: bool,
}

impl ReleaseManifest {
  /// Empty manifest for a plan
  pub fn for_plan(plan: &BuildPlan) -> Self {
    Self {
      project: plan.project.clone(),
      tag: plan.params.tag.clone(),
      version: plan.params.version.clone(),
      prerelease: plan.params.prerelease,
      mock: plan.params.mock,
      plan_id: plan.id.short().to_string(),
      bundles: Vec::new(),
      failures: Vec::new(),
      failed: false,
    }
  }

  /// Record a failure; supported-tier failures flip the run flag
  pub fn record_failure(&mut self, failure: JobFailure) {
    if failure.is_fatal() {
      self.failed = true;
    }
    self.failures.push(failure);
  }

  pub fn file_names(&self) -> Vec<&str> {
    self.bundles.iter().map(|b| b.name.as_str()).collect()
  }

  pub fn files(&self) -> Vec<PathBuf> {
    self.bundles.iter().map(|b| b.path.clone()).collect()
  }

  /// Targets whose failure fails the run
  pub fn fatal_targets(&self) -> Vec<String> {
    self
      .failures
      .iter()
      .filter(|f| f.is_fatal())
      .map(|f| f.target.clone())
      .collect()
  }

  /// The run-level error a failed manifest escalates to.
  ///
  /// Supported jobs that never reported make the run incomplete; any other fatal
  /// failure is a plain run failure.
  pub fn run_error(&self) -> Option<ShipError> {
    if !self.failed {
      return None;
    }
    let stuck: Vec<String> = self
      .failures
      .iter()
      .filter(|f| f.is_fatal() && f.kind == FailureKind::Timeout)
      .map(|f| f.target.clone())
      .collect();
    if stuck.is_empty() {
      Some(ShipError::RunFailed {
        failed_targets: self.fatal_targets(),
      })
    } else {
      Some(ShipError::AggregationIncomplete { pending: stuck })
    }
  }

  pub fn to_json(&self) -> ShipResult<String> {
    Ok(serde_json::to_string_pretty(self)?)
  }
}
