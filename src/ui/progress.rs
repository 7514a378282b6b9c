//! Progress bars for the build matrix
//!
//! Uses `linya` for concurrency-friendly bars: one bar per job, advanced from
//! whichever pool thread runs the job.

use linya::{Bar, Progress};
use std::sync::{Arc, Mutex, PoisonError};

/// Steps every job reports: built, packaged
pub const JOB_STEPS: usize = 2;

/// Thread-safe per-job progress. A hidden instance draws nothing (JSON output, tests).
#[derive(Clone)]
pub struct JobProgress {
  inner: Option<Arc<Inner>>,
}

struct Inner {
  progress: Mutex<Progress>,
  bars: Vec<Bar>,
}

impl JobProgress {
  /// One bar per label, in job-index order
  pub fn new<I, S>(labels: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    let mut progress = Progress::new();
    let bars = labels.into_iter().map(|label| progress.bar(JOB_STEPS, label.into())).collect();
    Self {
      inner: Some(Arc::new(Inner {
        progress: Mutex::new(progress),
        bars,
      })),
    }
  }

  pub fn hidden() -> Self {
    Self { inner: None }
  }

  /// Advance a job's bar by one step
  pub fn step(&self, index: usize) {
    if let Some(ref inner) = self.inner
      && let Some(bar) = inner.bars.get(index)
    {
      let mut progress = inner.progress.lock().unwrap_or_else(PoisonError::into_inner);
      progress.inc_and_draw(bar, 1);
    }
  }

  /// Fill a job's bar (finished, failed or cancelled)
  pub fn finish(&self, index: usize) {
    if let Some(ref inner) = self.inner
      && let Some(bar) = inner.bars.get(index)
    {
      let mut progress = inner.progress.lock().unwrap_or_else(PoisonError::into_inner);
      progress.set_and_draw(bar, JOB_STEPS);
    }
  }
}
