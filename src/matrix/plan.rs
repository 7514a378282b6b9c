//! Build plans: the concrete job set for one run
//!
//! A plan is produced before anything executes, which gives:
//!
//! - **Mock runs**: show exactly what will be built and published
//! - **Determinism**: same catalog + parameters → same plan → same plan ID
//! - **Auditability**: plans are JSON-serializable for CI logs
//!
//! ```text
//! Catalog + RunParams
//!   ↓
//! MatrixPlanner::plan
//!   ↓
//! BuildPlan (jobs, PlanId)
//!   ↓
//! fan-out → aggregate → publish
//! ```

use crate::catalog::{SupportTier, TargetDescriptor};
use crate::core::error::ShipResult;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Plan identifier (SHA256 hash of the job list)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanId(String);

impl PlanId {
  /// Create a plan ID from plan contents
  pub fn from_contents(contents: &[u8]) -> Self {
    let mut hasher = Sha256::new();
    hasher.update(contents);
    let result = hasher.finalize();
    Self(format!("{:x}", result))
  }

  /// Get the short ID (first 12 characters)
  pub fn short(&self) -> &str {
    &self.0[..12.min(self.0.len())]
  }
}

impl fmt::Display for PlanId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.short())
  }
}

/// Parameters of one release run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunParams {
  pub version: String,
  /// Release tag (defaults to the version)
  pub tag: String,
  pub prerelease: bool,
  pub mock: bool,
  /// Cargo features enabled for every target
  #[serde(default)]
  pub features: Vec<String>,
  /// Restrict the run to these triples (empty = every active target)
  #[serde(default)]
  pub only: Vec<String>,
}

impl RunParams {
  pub fn new(version: impl Into<String>) -> Self {
    let version = version.into();
    Self {
      tag: version.clone(),
      version,
      prerelease: false,
      mock: false,
      features: Vec::new(),
      only: Vec::new(),
    }
  }

  pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
    self.tag = tag.into();
    self
  }

  pub fn mock(mut self, mock: bool) -> Self {
    self.mock = mock;
    self
  }

  pub fn prerelease(mut self, prerelease: bool) -> Self {
    self.prerelease = prerelease;
    self
  }

  pub fn with_features(mut self, features: Vec<String>) -> Self {
    self.features = features;
    self
  }
}

/// Whether a job runs in the main matrix or the dedicated installer step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobClass {
  Matrix,
  Installer,
}

impl fmt::Display for JobClass {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      JobClass::Matrix => write!(f, "matrix"),
      JobClass::Installer => write!(f, "installer"),
    }
  }
}

/// A target bound to a run context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildJob {
  /// Position in the plan
  pub index: usize,
  pub class: JobClass,
  pub target: TargetDescriptor,
  pub version: String,
  /// Run features plus the target's own
  pub features: Vec<String>,
  /// Deterministic name of the job's primary bundle
  pub bundle_name: String,
}

impl BuildJob {
  /// Short label for logs and progress bars
  pub fn label(&self) -> String {
    match self.target.suffix {
      Some(ref suffix) => format!("{}{} ({})", self.target.triple, suffix, self.target.variant),
      None => format!("{} ({})", self.target.triple, self.target.variant),
    }
  }

  pub fn tier(&self) -> SupportTier {
    self.target.tier
  }
}

/// The complete, ordered job set for a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildPlan {
  /// Content hash of the jobs
  pub id: PlanId,
  pub project: String,
  pub params: RunParams,
  pub jobs: Vec<BuildJob>,
}

impl BuildPlan {
  pub fn new(project: impl Into<String>, params: RunParams, jobs: Vec<BuildJob>) -> Self {
    let mut plan = Self {
      id: PlanId::from_contents(&[]),
      project: project.into(),
      params,
      jobs,
    };
    plan.recompute_id();
    plan
  }

  /// Recompute plan ID based on current contents
  fn recompute_id(&mut self) {
    let json = serde_json::to_vec(&self.jobs).unwrap_or_default();
    self.id = PlanId::from_contents(&json);
  }

  /// Serialize to JSON
  pub fn to_json(&self) -> ShipResult<String> {
    Ok(serde_json::to_string_pretty(self)?)
  }

  /// Deserialize from JSON
  pub fn from_json(json: &str) -> ShipResult<Self> {
    Ok(serde_json::from_str(json)?)
  }

  pub fn matrix_jobs(&self) -> impl Iterator<Item = &BuildJob> {
    self.jobs.iter().filter(|j| j.class == JobClass::Matrix)
  }

  pub fn installer_jobs(&self) -> impl Iterator<Item = &BuildJob> {
    self.jobs.iter().filter(|j| j.class == JobClass::Installer)
  }

  /// Get human-readable representation
  pub fn to_human_readable(&self) -> String {
    let mut output = String::new();

    output.push_str(&format!(
      "📋 Plan: {} {} ({})\n",
      self.project, self.params.tag, self.id
    ));
    output.push_str(&format!("   Version: {}\n", self.params.version));
    if self.params.prerelease {
      output.push_str("   Prerelease: yes\n");
    }
    if !self.params.features.is_empty() {
      output.push_str(&format!("   Features: {}\n", self.params.features.join(",")));
    }

    output.push_str(&format!("\n   Jobs ({}):\n", self.jobs.len()));
    for job in &self.jobs {
      let tier = if job.tier().is_supported() { "" } else { " [best-effort]" };
      let cross = if job.target.cross { " [cross]" } else { "" };
      output.push_str(&format!(
        "   {:>2}. {:<9} {}{}{}\n       → {}\n",
        job.index + 1,
        job.class,
        job.label(),
        cross,
        tier,
        job.bundle_name
      ));
    }

    if self.params.mock {
      output.push_str("\n🔍 Mock run: the release store will not be touched\n");
    }

    output
  }

  /// Get number of jobs
  pub fn len(&self) -> usize {
    self.jobs.len()
  }

  /// Check if plan is empty
  pub fn is_empty(&self) -> bool {
    self.jobs.is_empty()
  }
}
