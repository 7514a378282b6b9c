//! Run supersession
//!
//! A run registers under a concurrency group (`<trigger-group>/<ref>`). Registering
//! writes the run id into the group's marker file and cancels any in-process run of
//! the same group. A run whose marker no longer names it has been superseded, also
//! when the newer run lives in another process.

use crate::core::error::{ShipError, ShipResult, ResultExt};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Shared cancellation flag for one run's jobs
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn cancel(&self) {
    self.0.store(true, Ordering::SeqCst);
  }

  pub fn is_cancelled(&self) -> bool {
    self.0.load(Ordering::SeqCst)
  }
}

type ActiveRuns = Arc<Mutex<HashMap<String, (String, CancellationToken)>>>;

/// Tracks the newest run per group
pub struct ConcurrencyController {
  groups_dir: PathBuf,
  active: ActiveRuns,
}

impl ConcurrencyController {
  /// Markers live in `<state_dir>/groups/`
  pub fn new(state_dir: &Path) -> Self {
    Self {
      groups_dir: state_dir.join("groups"),
      active: Arc::new(Mutex::new(HashMap::new())),
    }
  }

  /// Make `run_id` the current run of `group`, superseding whatever ran before
  pub fn register(&self, group: &str, run_id: &str) -> ShipResult<RunGuard> {
    fs::create_dir_all(&self.groups_dir)
      .with_context(|| format!("Failed to create {}", self.groups_dir.display()))?;
    let marker = self.groups_dir.join(marker_name(group));

    if let Ok(previous) = fs::read_to_string(&marker)
      && !previous.trim().is_empty()
      && previous.trim() != run_id
    {
      tracing::info!(group, superseded = previous.trim(), run = run_id, "superseding earlier run");
    }
    fs::write(&marker, run_id).with_context(|| format!("Failed to write {}", marker.display()))?;

    let token = CancellationToken::new();
    let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some((previous, previous_token)) = active.insert(group.to_string(), (run_id.to_string(), token.clone())) {
      tracing::debug!(group, run = %previous, "cancelling in-process run");
      previous_token.cancel();
    }

    Ok(RunGuard {
      group: group.to_string(),
      run_id: run_id.to_string(),
      token,
      marker,
      active: Arc::clone(&self.active),
    })
  }
}

/// A registered run. Dropping it releases the group if it still owns it.
pub struct RunGuard {
  group: String,
  run_id: String,
  token: CancellationToken,
  marker: PathBuf,
  active: ActiveRuns,
}

impl RunGuard {
  pub fn group(&self) -> &str {
    &self.group
  }

  pub fn run_id(&self) -> &str {
    &self.run_id
  }

  pub fn token(&self) -> &CancellationToken {
    &self.token
  }

  /// Check the group marker; cancels the token once a newer run took over
  pub fn poll(&self) -> bool {
    if self.token.is_cancelled() {
      return true;
    }
    let owner = fs::read_to_string(&self.marker).unwrap_or_default();
    if owner.trim() != self.run_id {
      tracing::info!(group = %self.group, run = %self.run_id, "run superseded");
      self.token.cancel();
      return true;
    }
    false
  }

  /// `Cancelled` error when superseded
  pub fn check(&self) -> ShipResult<()> {
    if self.poll() {
      return Err(ShipError::Cancelled {
        group: self.group.clone(),
      });
    }
    Ok(())
  }
}

impl Drop for RunGuard {
  fn drop(&mut self) {
    let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
    if active.get(&self.group).is_some_and(|(run, _)| run == &self.run_id) {
      active.remove(&self.group);
    }
    drop(active);

    if fs::read_to_string(&self.marker).is_ok_and(|owner| owner.trim() == self.run_id) {
      fs::remove_file(&self.marker).ok();
    }
  }
}

/// File name for a group (`manual/main` → `manual_main`)
fn marker_name(group: &str) -> String {
  group
    .chars()
    .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '.' { c } else { '_' })
    .collect()
}
