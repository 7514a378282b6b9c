//! Run-scoped artifact staging
//!
//! Packagers deposit bundles into `<staging>/<run-id>/bundles/`; the publisher reads
//! them once. Every run directory carries a creation stamp so `sweep_expired` can
//! drop runs older than the retention window. Staged files are never part of the
//! permanent release record.

use crate::core::error::{ShipError, ShipResult, ResultExt};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

const STAMP_FILE: &str = ".created";
const BUNDLES_DIR: &str = "bundles";
const WORK_DIR: &str = "work";

/// One run's staging directory
#[derive(Debug, Clone)]
pub struct StagingArea {
  run_id: String,
  dir: PathBuf,
}

impl StagingArea {
  /// Create `<staging_root>/<run_id>/` and stamp it with the current time
  pub fn create(staging_root: &Path, run_id: &str) -> ShipResult<Self> {
    let dir = staging_root.join(run_id);
    if dir.exists() {
      return Err(ShipError::message(format!("staging directory {} already exists", dir.display())));
    }
    fs::create_dir_all(dir.join(BUNDLES_DIR))
      .with_context(|| format!("Failed to create staging area {}", dir.display()))?;
    fs::create_dir_all(dir.join(WORK_DIR))?;
    fs::write(dir.join(STAMP_FILE), Utc::now().to_rfc3339())?;

    tracing::debug!(run = run_id, dir = %dir.display(), "staging area created");
    Ok(Self {
      run_id: run_id.to_string(),
      dir,
    })
  }

  pub fn run_id(&self) -> &str {
    &self.run_id
  }

  pub fn dir(&self) -> &Path {
    &self.dir
  }

  /// Parent of the per-job build directories
  pub fn work_dir(&self) -> PathBuf {
    self.dir.join(WORK_DIR)
  }

  pub fn bundle_path(&self, name: &str) -> PathBuf {
    self.dir.join(BUNDLES_DIR).join(name)
  }

  /// Copy `source` into the run's bundle directory under `name`.
  /// A name can only be deposited once per run.
  pub fn deposit(&self, source: &Path, name: &str) -> ShipResult<PathBuf> {
    if name.is_empty() || name.contains('/') || name.contains('\\') {
      return Err(ShipError::message(format!("'{}' is not a valid bundle file name", name)));
    }

    let dest = self.bundle_path(name);
    if dest.exists() {
      return Err(ShipError::message(format!(
        "bundle '{}' was already staged for run {}",
        name, self.run_id
      )));
    }

    fs::copy(source, &dest).with_context(|| format!("Failed to stage {}", source.display()))?;
    Ok(dest)
  }

  /// Remove the whole run directory (superseded or finished runs)
  pub fn discard(self) -> ShipResult<()> {
    if self.dir.exists() {
      fs::remove_dir_all(&self.dir).with_context(|| format!("Failed to remove {}", self.dir.display()))?;
    }
    tracing::debug!(run = %self.run_id, "staging area discarded");
    Ok(())
  }
}

/// A run directory found under the staging root
#[derive(Debug, Clone, Serialize)]
pub struct StagedRun {
  pub run_id: String,
  pub created: DateTime<Utc>,
  pub bundles: usize,
}

/// Result of a sweep
#[derive(Debug, Clone, Default, Serialize)]
pub struct SweepReport {
  pub removed: Vec<String>,
  pub kept: usize,
}

/// All staged runs, oldest first
pub fn list_runs(staging_root: &Path) -> ShipResult<Vec<StagedRun>> {
  if !staging_root.is_dir() {
    return Ok(Vec::new());
  }

  let mut runs = Vec::new();
  for entry in fs::read_dir(staging_root).with_context(|| format!("Failed to read {}", staging_root.display()))? {
    let entry = entry?;
    let path = entry.path();
    if !path.is_dir() {
      continue;
    }

    let bundles = fs::read_dir(path.join(BUNDLES_DIR)).map(|d| d.count()).unwrap_or(0);
    runs.push(StagedRun {
      run_id: entry.file_name().to_string_lossy().into_owned(),
      created: created_at(&path)?,
      bundles,
    });
  }

  runs.sort_by(|a, b| a.created.cmp(&b.created).then_with(|| a.run_id.cmp(&b.run_id)));
  Ok(runs)
}

/// Remove run directories older than `retention` at time `now`
pub fn sweep_expired(staging_root: &Path, retention: Duration, now: DateTime<Utc>) -> ShipResult<SweepReport> {
  let mut report = SweepReport::default();

  for run in list_runs(staging_root)? {
    if now.signed_duration_since(run.created) > retention {
      let dir = staging_root.join(&run.run_id);
      fs::remove_dir_all(&dir).with_context(|| format!("Failed to remove {}", dir.display()))?;
      tracing::info!(run = %run.run_id, "expired staging area removed");
      report.removed.push(run.run_id);
    } else {
      report.kept += 1;
    }
  }

  Ok(report)
}

/// Stamp time, or the directory's mtime when the stamp is missing or unreadable
fn created_at(run_dir: &Path) -> ShipResult<DateTime<Utc>> {
  if let Ok(stamp) = fs::read_to_string(run_dir.join(STAMP_FILE))
    && let Ok(parsed) = DateTime::parse_from_rfc3339(stamp.trim())
  {
    return Ok(parsed.with_timezone(&Utc));
  }

  let modified = fs::metadata(run_dir)?.modified()?;
  Ok(DateTime::<Utc>::from(modified))
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  #[test]
  fn test_deposit_and_reject_duplicates() {
    let dir = TempDir::new().unwrap();
    let staging = StagingArea::create(dir.path(), "run-1").unwrap();
    let src = dir.path().join("btm.tar.gz");
    fs::write(&src, b"bundle").unwrap();

    let staged = staging.deposit(&src, "btm_x86_64-unknown-linux-gnu.tar.gz").unwrap();
    assert_eq!(fs::read(&staged).unwrap(), b"bundle");
    assert!(staging.deposit(&src, "btm_x86_64-unknown-linux-gnu.tar.gz").is_err());
    assert!(staging.deposit(&src, "../escape.tar.gz").is_err());
  }

  #[test]
  fn test_create_twice_fails() {
    let dir = TempDir::new().unwrap();
    StagingArea::create(dir.path(), "run-1").unwrap();
    assert!(StagingArea::create(dir.path(), "run-1").is_err());
  }

  #[test]
  fn test_sweep_removes_only_expired_runs() {
    let dir = TempDir::new().unwrap();
    StagingArea::create(dir.path(), "old").unwrap();
    StagingArea::create(dir.path(), "new").unwrap();
    let old_stamp = (Utc::now() - Duration::days(3)).to_rfc3339();
    fs::write(dir.path().join("old").join(STAMP_FILE), old_stamp).unwrap();

    let report = sweep_expired(dir.path(), Duration::days(1), Utc::now()).unwrap();
    assert_eq!(report.removed, vec!["old".to_string()]);
    assert_eq!(report.kept, 1);
    assert!(!dir.path().join("old").exists());
    assert!(dir.path().join("new").exists());
  }

  #[test]
  fn test_discard_and_list() {
    let dir = TempDir::new().unwrap();
    let staging = StagingArea::create(dir.path(), "run-1").unwrap();
    let src = dir.path().join("f");
    fs::write(&src, b"x").unwrap();
    staging.deposit(&src, "a.zip").unwrap();

    let runs = list_runs(dir.path()).unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].bundles, 1);

    staging.discard().unwrap();
    assert!(list_runs(dir.path()).unwrap().is_empty());
  }

  #[test]
  fn test_missing_root_lists_nothing() {
    let dir = TempDir::new().unwrap();
    assert!(list_runs(&dir.path().join("absent")).unwrap().is_empty());
  }
}
