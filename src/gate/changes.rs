//! Change-set discovery through system git

use crate::core::error::{ShipError, ShipResult, ResultExt};
use crate::gate::ChangeSet;
use std::path::Path;
use std::process::Command;

/// Paths changed between `since` and HEAD (merge-base diff), with their current contents
pub fn changed_since(project_root: &Path, since: &str) -> ShipResult<ChangeSet> {
  let range = format!("{}...HEAD", since);

  let output = Command::new("git")
    .current_dir(project_root)
    .args(["diff", "--name-only", &range])
    .output()
    .with_context(|| "Failed to run git diff".to_string())?;

  if !output.status.success() {
    return Err(ShipError::message(format!(
      "git diff {} failed: {}",
      range,
      String::from_utf8_lossy(&output.stderr)
    )));
  }

  let stdout = String::from_utf8_lossy(&output.stdout);
  ChangeSet::snapshot(project_root, stdout.lines().map(str::trim).filter(|l| !l.is_empty()))
}
