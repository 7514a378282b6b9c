//! Release publisher
//!
//! State machine over one tag:
//!
//! ```text
//! NoRelease ──mock──────────────────────────────→ MockCompleted
//!     │
//!     └─real─→ delete old (not-found ok) → pause → Replacing ──create──→ Published
//! ```
//!
//! A failed manifest never leaves `NoRelease`.

use crate::catalog::naming::is_valid_bundle_name;
use crate::core::error::{PublishError, ShipError, ShipResult};
use crate::release::manifest::ReleaseManifest;
use crate::release::store::{DeleteOutcome, ReleaseStore, ensure_files_present};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PublishState {
  NoRelease,
  Replacing,
  Published,
  MockCompleted,
}

impl fmt::Display for PublishState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      PublishState::NoRelease => write!(f, "no release"),
      PublishState::Replacing => write!(f, "replacing"),
      PublishState::Published => write!(f, "published"),
      PublishState::MockCompleted => write!(f, "mock completed"),
    }
  }
}

/// What a publish did
#[derive(Debug, Clone, Serialize)]
pub struct PublishReport {
  pub state: PublishState,
  pub tag: String,
  pub files: Vec<String>,
  /// An earlier release at the tag was deleted first
  pub replaced: bool,
}

pub struct Publisher<'a> {
  store: &'a dyn ReleaseStore,
  pause: Duration,
  state: PublishState,
}

impl<'a> Publisher<'a> {
  pub fn new(store: &'a dyn ReleaseStore, pause: Duration) -> Self {
    Self {
      store,
      pause,
      state: PublishState::NoRelease,
    }
  }

  pub fn state(&self) -> PublishState {
    self.state
  }

  /// Drive the state machine for `manifest`
  pub fn publish(&mut self, manifest: &ReleaseManifest) -> ShipResult<PublishReport> {
    if self.state != PublishState::NoRelease {
      return Err(ShipError::message(format!(
        "publisher for '{}' already finished ({})",
        manifest.tag, self.state
      )));
    }

    if let Some(error) = manifest.run_error() {
      tracing::warn!(tag = %manifest.tag, error = %error, "run failed; release left untouched");
      return Err(error);
    }

    validate(manifest)?;
    let files: Vec<String> = manifest.file_names().into_iter().map(String::from).collect();

    if manifest.mock {
      self.state = PublishState::MockCompleted;
      tracing::info!(tag = %manifest.tag, files = files.len(), "mock publish validated");
      return Ok(PublishReport {
        state: self.state,
        tag: manifest.tag.clone(),
        files,
        replaced: false,
      });
    }

    // Unmatched files abort before the old release is touched
    let paths = manifest.files();
    ensure_files_present(&manifest.tag, &paths)?;

    let replaced = match self.store.delete_release(&manifest.tag)? {
      DeleteOutcome::Deleted => {
        tracing::info!(tag = %manifest.tag, pause_ms = self.pause.as_millis() as u64, "old release deleted");
        thread::sleep(self.pause);
        true
      }
      DeleteOutcome::NotFound => false,
    };
    self.state = PublishState::Replacing;

    let record = self.store.create_release(&manifest.tag, manifest.prerelease, &paths)?;
    self.state = PublishState::Published;
    tracing::info!(tag = %record.tag, store = self.store.kind(), files = record.files.len(), "release published");

    Ok(PublishReport {
      state: self.state,
      tag: record.tag,
      files: record.files,
      replaced,
    })
  }
}

/// Non-empty, every name follows the naming scheme, no name twice
pub fn validate(manifest: &ReleaseManifest) -> ShipResult<()> {
  let invalid = |reason: String| {
    ShipError::Publish(PublishError::InvalidManifest {
      tag: manifest.tag.clone(),
      reason,
    })
  };

  if manifest.bundles.is_empty() {
    return Err(invalid("no bundles to publish".to_string()));
  }

  let mut seen = HashSet::new();
  for bundle in &manifest.bundles {
    if !is_valid_bundle_name(&manifest.project, &bundle.name) {
      return Err(invalid(format!("'{}' does not follow the bundle naming scheme", bundle.name)));
    }
    if !seen.insert(bundle.name.as_str()) {
      return Err(invalid(format!("'{}' appears more than once", bundle.name)));
    }
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::catalog::SupportTier;
  use crate::matrix::{BuildPlan, RunParams};
  use crate::package::{Bundle, BundleKind};
  use crate::release::manifest::{FailureKind, JobFailure};
  use crate::release::store::{LocalReleaseStore, ReleaseRecord};
  use std::fs;
  use std::path::{Path, PathBuf};
  use std::sync::Mutex;
  use tempfile::TempDir;

  /// Store that must never be called
  struct UntouchableStore {
    calls: Mutex<usize>,
  }

  impl ReleaseStore for UntouchableStore {
    fn kind(&self) -> &'static str {
      "untouchable"
    }
    fn find_release(&self, _tag: &str) -> ShipResult<Option<ReleaseRecord>> {
      *self.calls.lock().unwrap() += 1;
      Ok(None)
    }
    fn delete_release(&self, _tag: &str) -> ShipResult<DeleteOutcome> {
      *self.calls.lock().unwrap() += 1;
      Ok(DeleteOutcome::NotFound)
    }
    fn create_release(&self, _tag: &str, _prerelease: bool, _files: &[PathBuf]) -> ShipResult<ReleaseRecord> {
      *self.calls.lock().unwrap() += 1;
      Err(ShipError::message("unexpected create"))
    }
  }

  fn manifest(dir: &Path, names: &[&str], mock: bool) -> ReleaseManifest {
    let params = RunParams::new("1.0.0").mock(mock);
    let mut m = ReleaseManifest::for_plan(&BuildPlan::new("btm", params, vec![]));
    for name in names {
      let path = dir.join(name);
      fs::write(&path, name.as_bytes()).unwrap();
      m.bundles.push(Bundle {
        name: name.to_string(),
        target: "x".into(),
        kind: BundleKind::Archive,
        path,
        size: name.len() as u64,
        sha256: String::new(),
      });
    }
    m
  }

  const NAMES: &[&str] = &["btm_x86_64-unknown-linux-gnu.tar.gz", "btm_x86_64-pc-windows-msvc.msi"];

  #[test]
  fn test_publish_twice_leaves_one_release() {
    let dir = TempDir::new().unwrap();
    let store = LocalReleaseStore::new(&dir.path().join("releases"));
    let m = manifest(dir.path(), NAMES, false);

    let first = Publisher::new(&store, Duration::ZERO).publish(&m).unwrap();
    assert_eq!(first.state, PublishState::Published);
    assert!(!first.replaced);

    let second = Publisher::new(&store, Duration::ZERO).publish(&m).unwrap();
    assert!(second.replaced);
    assert_eq!(first.files, second.files);
    assert_eq!(store.list_releases().unwrap().len(), 1);
  }

  #[test]
  fn test_mock_never_touches_store() {
    let dir = TempDir::new().unwrap();
    let store = UntouchableStore { calls: Mutex::new(0) };
    let m = manifest(dir.path(), NAMES, true);

    let mut publisher = Publisher::new(&store, Duration::ZERO);
    let report = publisher.publish(&m).unwrap();
    assert_eq!(report.state, PublishState::MockCompleted);
    assert_eq!(publisher.state(), PublishState::MockCompleted);
    assert_eq!(*store.calls.lock().unwrap(), 0);
  }

  #[test]
  fn test_failed_run_stays_in_no_release() {
    let dir = TempDir::new().unwrap();
    let store = UntouchableStore { calls: Mutex::new(0) };
    let mut m = manifest(dir.path(), NAMES, false);
    m.record_failure(JobFailure {
      target: "x86_64-unknown-linux-gnu:native-archive".into(),
      tier: SupportTier::Supported,
      kind: FailureKind::Build,
      message: "boom".into(),
    });

    let mut publisher = Publisher::new(&store, Duration::ZERO);
    assert!(matches!(publisher.publish(&m), Err(ShipError::RunFailed { .. })));
    assert_eq!(publisher.state(), PublishState::NoRelease);
    assert_eq!(*store.calls.lock().unwrap(), 0);
  }

  #[test]
  fn test_missing_staged_file_keeps_old_release() {
    let dir = TempDir::new().unwrap();
    let store = LocalReleaseStore::new(&dir.path().join("releases"));
    let m = manifest(dir.path(), NAMES, false);
    Publisher::new(&store, Duration::ZERO).publish(&m).unwrap();

    fs::remove_file(&m.bundles[1].path).unwrap();
    let mut publisher = Publisher::new(&store, Duration::ZERO);
    assert!(matches!(
      publisher.publish(&m),
      Err(ShipError::Publish(PublishError::MissingFiles { .. }))
    ));
    assert_eq!(publisher.state(), PublishState::NoRelease);
    assert_eq!(store.find_release("1.0.0").unwrap().unwrap().files.len(), 2);
  }

  #[test]
  fn test_validation_rules() {
    let dir = TempDir::new().unwrap();
    assert!(validate(&manifest(dir.path(), &[], true)).is_err());
    assert!(validate(&manifest(dir.path(), &["other_x86_64-unknown-linux-gnu.tar.gz"], true)).is_err());
    assert!(validate(&manifest(dir.path(), NAMES, true)).is_ok());

    let mut dup = manifest(dir.path(), NAMES, true);
    dup.bundles.push(dup.bundles[0].clone());
    assert!(validate(&dup).is_err());
  }

  #[test]
  fn test_publisher_is_single_use() {
    let dir = TempDir::new().unwrap();
    let store = UntouchableStore { calls: Mutex::new(0) };
    let m = manifest(dir.path(), NAMES, true);
    let mut publisher = Publisher::new(&store, Duration::ZERO);
    publisher.publish(&m).unwrap();
    assert!(publisher.publish(&m).is_err());
  }
}
