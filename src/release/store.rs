//! Release store contract and the directory-backed store

use crate::core::error::{PublishError, ShipError, ShipResult, ResultExt};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// A published release as the store sees it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseRecord {
  pub tag: String,
  pub prerelease: bool,
  /// Attached file names, sorted
  pub files: Vec<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub created_at: Option<DateTime<Utc>>,
}

/// Result of a delete; a missing release is not an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
  Deleted,
  NotFound,
}

/// Where releases are published
pub trait ReleaseStore: Send + Sync {
  /// Short name for messages ("local", "github")
  fn kind(&self) -> &'static str;

  fn find_release(&self, tag: &str) -> ShipResult<Option<ReleaseRecord>>;

  /// Remove the release and its tag. `NotFound` when there was none.
  fn delete_release(&self, tag: &str) -> ShipResult<DeleteOutcome>;

  /// Create a release with `files` attached. Must fail without creating anything
  /// when any declared file is missing.
  fn create_release(&self, tag: &str, prerelease: bool, files: &[PathBuf]) -> ShipResult<ReleaseRecord>;
}

/// Declared files that do not exist
pub fn missing_files(files: &[PathBuf]) -> Vec<PathBuf> {
  files.iter().filter(|f| !f.is_file()).cloned().collect()
}

/// Fail with `MissingFiles` when any declared file is absent
pub fn ensure_files_present(tag: &str, files: &[PathBuf]) -> ShipResult<()> {
  let missing = missing_files(files);
  if missing.is_empty() {
    Ok(())
  } else {
    Err(ShipError::Publish(PublishError::MissingFiles {
      tag: tag.to_string(),
      files: missing,
    }))
  }
}

const RECORD_FILE: &str = "release.json";

/// Releases as directories: `<root>/<tag>/release.json` plus the attached files.
/// Creation is staged in a temporary directory and renamed into place.
pub struct LocalReleaseStore {
  root: PathBuf,
}

impl LocalReleaseStore {
  pub fn new(root: &Path) -> Self {
    Self {
      root: root.to_path_buf(),
    }
  }

  fn release_dir(&self, tag: &str) -> ShipResult<PathBuf> {
    if tag.is_empty() || tag.starts_with('.') || tag.contains(['/', '\\']) {
      return Err(ShipError::message(format!("'{}' cannot be used as a release tag", tag)));
    }
    Ok(self.root.join(tag))
  }

  /// Every release in the store, by tag
  pub fn list_releases(&self) -> ShipResult<Vec<ReleaseRecord>> {
    if !self.root.is_dir() {
      return Ok(Vec::new());
    }
    let mut records = Vec::new();
    for entry in fs::read_dir(&self.root)? {
      let entry = entry?;
      let name = entry.file_name().to_string_lossy().into_owned();
      if name.starts_with('.') {
        continue;
      }
      if let Some(record) = self.find_release(&name)? {
        records.push(record);
      }
    }
    records.sort_by(|a, b| a.tag.cmp(&b.tag));
    Ok(records)
  }
}

impl ReleaseStore for LocalReleaseStore {
  fn kind(&self) -> &'static str {
    "local"
  }

  fn find_release(&self, tag: &str) -> ShipResult<Option<ReleaseRecord>> {
    let record_path = self.release_dir(tag)?.join(RECORD_FILE);
    if !record_path.is_file() {
      return Ok(None);
    }
    let content =
      fs::read_to_string(&record_path).with_context(|| format!("Failed to read {}", record_path.display()))?;
    Ok(Some(serde_json::from_str(&content)?))
  }

  fn delete_release(&self, tag: &str) -> ShipResult<DeleteOutcome> {
    let dir = self.release_dir(tag)?;
    if !dir.exists() {
      return Ok(DeleteOutcome::NotFound);
    }
    fs::remove_dir_all(&dir).map_err(|e| {
      ShipError::Publish(PublishError::DeleteFailed {
        tag: tag.to_string(),
        reason: e.to_string(),
      })
    })?;
    Ok(DeleteOutcome::Deleted)
  }

  fn create_release(&self, tag: &str, prerelease: bool, files: &[PathBuf]) -> ShipResult<ReleaseRecord> {
    let dir = self.release_dir(tag)?;
    ensure_files_present(tag, files)?;
    if dir.exists() {
      return Err(ShipError::Publish(PublishError::CreateFailed {
        tag: tag.to_string(),
        reason: "a release with this tag already exists".to_string(),
      }));
    }

    let create_failed = |reason: String| {
      ShipError::Publish(PublishError::CreateFailed {
        tag: tag.to_string(),
        reason,
      })
    };

    let tmp = self.root.join(format!(".tmp-{}-{}", tag, std::process::id()));
    if tmp.exists() {
      fs::remove_dir_all(&tmp)?;
    }
    fs::create_dir_all(&tmp).map_err(|e| create_failed(e.to_string()))?;

    let mut names = Vec::with_capacity(files.len());
    for file in files {
      let name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| create_failed(format!("{} has no file name", file.display())))?;
      if names.contains(&name) {
        fs::remove_dir_all(&tmp).ok();
        return Err(create_failed(format!("file '{}' is attached twice", name)));
      }
      if let Err(e) = fs::copy(file, tmp.join(&name)) {
        fs::remove_dir_all(&tmp).ok();
        return Err(create_failed(format!("{}: {}", file.display(), e)));
      }
      names.push(name);
    }
    names.sort();

    let record = ReleaseRecord {
      tag: tag.to_string(),
      prerelease,
      files: names,
      created_at: Some(Utc::now()),
    };
    fs::write(tmp.join(RECORD_FILE), serde_json::to_string_pretty(&record)?)?;
    fs::rename(&tmp, &dir).map_err(|e| create_failed(e.to_string()))?;

    tracing::info!(tag, files = record.files.len(), "release created in local store");
    Ok(record)
  }
}
