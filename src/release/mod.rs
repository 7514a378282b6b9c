//! Release publishing
//!
//! - **manifest**: bundles + failures + run-failure flag, produced by the aggregator
//! - **store**: the release store contract and the directory-backed store
//! - **github**: GitHub releases via `gh`
//! - **publisher**: the NoRelease → Replacing → Published / MockCompleted state machine
//!
//! Publishing is reconcile-by-replace: the release at a tag is deleted and recreated
//! with the full bundle set, so publishing the same manifest twice leaves exactly one
//! release with the same files.

pub mod github;
pub mod manifest;
pub mod publisher;
pub mod store;

pub use manifest::{FailureKind, JobFailure, ReleaseManifest};
pub use publisher::{PublishReport, PublishState, Publisher};
pub use store::{DeleteOutcome, LocalReleaseStore, ReleaseRecord, ReleaseStore};

use crate::build::ToolRunner;
use crate::core::config::StoreKind;
use crate::core::context::ProjectContext;
use std::sync::Arc;

/// The configured release store
pub fn open_store(ctx: &ProjectContext, runner: Arc<dyn ToolRunner>) -> Box<dyn ReleaseStore> {
  let publish = &ctx.config.publish;
  match publish.store {
    StoreKind::Local => Box::new(LocalReleaseStore::new(&ctx.resolve(&publish.local_dir))),
    StoreKind::Github => Box::new(github::GithubReleaseStore::new(&ctx.root, publish.repo.clone(), runner)),
  }
}
