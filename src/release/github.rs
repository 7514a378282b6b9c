//! GitHub releases through the `gh` CLI

use crate::build::{ToolCommand, ToolRunner};
use crate::core::config::ToolSpec;
use crate::core::error::{PublishError, ShipError, ShipResult};
use crate::release::store::{DeleteOutcome, ReleaseRecord, ReleaseStore, ensure_files_present};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub struct GithubReleaseStore {
  root: PathBuf,
  repo: Option<String>,
  runner: Arc<dyn ToolRunner>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GhRelease {
  tag_name: String,
  is_prerelease: bool,
  #[serde(default)]
  assets: Vec<GhAsset>,
  #[serde(default)]
  created_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct GhAsset {
  name: String,
}

impl GithubReleaseStore {
  /// `repo` is `owner/name`; `None` uses the repository of `root`
  pub fn new(root: &Path, repo: Option<String>, runner: Arc<dyn ToolRunner>) -> Self {
    Self {
      root: root.to_path_buf(),
      repo,
      runner,
    }
  }

  /// Delete a tag that has no release attached. `gh release delete` never sees it.
  fn delete_bare_tag(&self, tag: &str) -> ShipResult<()> {
    // gh api fills {owner}/{repo} from the current repository
    let repo = self.repo.as_deref().unwrap_or("{owner}/{repo}");
    let endpoint = format!("repos/{}/git/refs/tags/{}", repo, tag);
    let cmd = ToolCommand::from_spec(&ToolSpec::new("gh", &["api", "-X", "DELETE"]), &self.root, &[]).arg(endpoint);

    let output = self.runner.run(&cmd)?;
    if output.success {
      tracing::info!(tag, "removed tag left without a release");
      return Ok(());
    }
    if is_missing_ref(&output.stderr) {
      return Ok(());
    }
    Err(ShipError::Publish(PublishError::DeleteFailed {
      tag: tag.to_string(),
      reason: output.stderr_tail(),
    }))
  }

  fn gh(&self, args: &[&str]) -> ToolCommand {
    let mut cmd = ToolCommand::from_spec(&ToolSpec::new("gh", args), &self.root, &[]);
    if let Some(ref repo) = self.repo {
      cmd = cmd.arg("--repo").arg(repo.as_str());
    }
    cmd
  }
}

fn is_not_found(stderr: &str) -> bool {
  stderr.to_lowercase().contains("not found")
}

/// `gh api` answers 404 or 422 for a ref that does not exist
fn is_missing_ref(stderr: &str) -> bool {
  is_not_found(stderr) || stderr.contains("HTTP 404") || stderr.contains("HTTP 422")
}

impl ReleaseStore for GithubReleaseStore {
  fn kind(&self) -> &'static str {
    "github"
  }

  fn find_release(&self, tag: &str) -> ShipResult<Option<ReleaseRecord>> {
    let output = self
      .runner
      .run(&self.gh(&["release", "view", tag, "--json", "tagName,isPrerelease,assets,createdAt"]))?;
    if !output.success {
      if is_not_found(&output.stderr) {
        return Ok(None);
      }
      return Err(ShipError::message(format!(
        "gh release view {} failed: {}",
        tag,
        output.stderr_tail()
      )));
    }

    let release: GhRelease = serde_json::from_str(&output.stdout)?;
    let mut files: Vec<String> = release.assets.into_iter().map(|a| a.name).collect();
    files.sort();
    Ok(Some(ReleaseRecord {
      tag: release.tag_name,
      prerelease: release.is_prerelease,
      files,
      created_at: release.created_at,
    }))
  }

  fn delete_release(&self, tag: &str) -> ShipResult<DeleteOutcome> {
    let output = self
      .runner
      .run(&self.gh(&["release", "delete", tag, "--cleanup-tag", "--yes"]))?;
    if output.success {
      return Ok(DeleteOutcome::Deleted);
    }
    if is_not_found(&output.stderr) {
      self.delete_bare_tag(tag)?;
      return Ok(DeleteOutcome::NotFound);
    }
    Err(ShipError::Publish(PublishError::DeleteFailed {
      tag: tag.to_string(),
      reason: output.stderr_tail(),
    }))
  }

  fn create_release(&self, tag: &str, prerelease: bool, files: &[PathBuf]) -> ShipResult<ReleaseRecord> {
    ensure_files_present(tag, files)?;

    let mut cmd = self.gh(&["release", "create", tag, "--title", tag, "--notes", ""]);
    if prerelease {
      cmd = cmd.arg("--prerelease");
    }
    for file in files {
      cmd = cmd.arg(file.display().to_string());
    }

    let output = self.runner.run(&cmd)?;
    if !output.success {
      return Err(ShipError::Publish(PublishError::CreateFailed {
        tag: tag.to_string(),
        reason: output.stderr_tail(),
      }));
    }

    let mut names: Vec<String> = files
      .iter()
      .filter_map(|f| f.file_name().map(|n| n.to_string_lossy().into_owned()))
      .collect();
    names.sort();
    Ok(ReleaseRecord {
      tag: tag.to_string(),
      prerelease,
      files: names,
      created_at: Some(Utc::now()),
    })
  }
}
