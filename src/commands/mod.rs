//! CLI commands for shipyard
//!
//! ## Setup & Inspection
//! - **init**: write a default shipyard.toml
//! - **targets**: show and validate the target catalog
//! - **status**: success ledger, staged runs and the release at a tag
//!
//! ## Release pipeline
//! - **plan**: expand the catalog into the job set without building
//! - **gate**: evaluate the trigger gate only
//! - **run**: gate → plan → build/package → aggregate → publish
//! - **sweep**: drop expired staging areas
//!
//! All commands except `init` take `&ProjectContext`.

pub mod gate;
pub mod init;
pub mod plan;
pub mod run;
pub mod status;
pub mod sweep;
pub mod targets;

pub use gate::run_gate;
pub use init::run_init;
pub use plan::run_plan;
pub use run::run_release;
pub use status::run_status;
pub use sweep::run_sweep;
pub use targets::run_targets;

use crate::core::context::ProjectContext;
use crate::core::error::{ShipError, ShipResult};
use crate::gate::changes::changed_since;
use crate::gate::{ChangeSet, TriggerKind};
use crate::matrix::RunParams;
use clap::{Args, ValueEnum};

/// Trigger kinds accepted on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TriggerArg {
  Manual,
  Schedule,
  Call,
  Push,
  PullRequest,
}

/// How the run was started and what changed
#[derive(Debug, Clone, Args)]
pub struct TriggerArgs {
  /// What started this run
  #[arg(long, value_enum, default_value = "manual")]
  pub trigger: TriggerArg,

  /// Calling pipeline (label only, for --trigger call)
  #[arg(long)]
  pub caller: Option<String>,

  /// Ref the run belongs to; runs on the same trigger and ref supersede each other
  #[arg(long = "ref", default_value = "main")]
  pub git_ref: String,

  /// Changed paths (repeatable or comma-separated)
  #[arg(long, value_delimiter = ',')]
  pub changed: Vec<String>,

  /// Derive changed paths from `git diff <SINCE>...HEAD`
  #[arg(long, conflicts_with = "changed")]
  pub since: Option<String>,
}

impl TriggerArgs {
  pub fn trigger(&self, mock: bool) -> ShipResult<TriggerKind> {
    if mock && self.trigger != TriggerArg::Manual {
      return Err(ShipError::with_help(
        "Mock runs are only available for manual triggers",
        "Use --trigger manual --mock",
      ));
    }

    Ok(match self.trigger {
      TriggerArg::Manual => TriggerKind::Manual { mock },
      TriggerArg::Schedule => TriggerKind::Schedule,
      TriggerArg::Call => TriggerKind::Call {
        caller: self.caller.clone().unwrap_or_else(|| "unknown".to_string()),
      },
      TriggerArg::Push => TriggerKind::Push,
      TriggerArg::PullRequest => TriggerKind::PullRequest,
    })
  }

  /// Explicit paths, or the git diff since `--since`, read from the working tree
  pub fn change_set(&self, ctx: &ProjectContext) -> ShipResult<ChangeSet> {
    match self.since {
      Some(ref since) => changed_since(&ctx.root, since),
      None => ChangeSet::snapshot(&ctx.root, &self.changed),
    }
  }

  /// Concurrency group for supersession
  pub fn group(&self, trigger: &TriggerKind) -> String {
    format!("{}/{}", trigger.group(), self.git_ref)
  }
}

/// Release parameters shared by `plan` and `run`
#[derive(Debug, Clone, Args)]
pub struct ReleaseArgs {
  /// Version to release (default: root package version)
  #[arg(long)]
  pub version: Option<String>,

  /// Release tag (default: the version)
  #[arg(long)]
  pub tag: Option<String>,

  /// Mark the release as a prerelease
  #[arg(long)]
  pub prerelease: bool,

  /// Cargo features for every target (repeatable or comma-separated)
  #[arg(long, value_delimiter = ',')]
  pub features: Vec<String>,

  /// Only build these target triples
  #[arg(long, value_delimiter = ',')]
  pub only: Vec<String>,

  /// Validate everything but leave the release store untouched
  #[arg(long)]
  pub mock: bool,
}

impl ReleaseArgs {
  pub fn params(&self, ctx: &ProjectContext) -> ShipResult<RunParams> {
    let version = ctx.release_version(self.version.as_deref())?;
    let tag = self.tag.clone().unwrap_or_else(|| version.clone());

    let mut params = RunParams::new(version)
      .with_tag(tag)
      .prerelease(self.prerelease)
      .mock(self.mock)
      .with_features(self.features.clone());
    params.only = self.only.clone();
    Ok(params)
  }
}
