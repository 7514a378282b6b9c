//! Success ledger: change signatures of runs that completed successfully

use crate::core::error::{ResultExt, ShipResult};
use crate::gate::ChangeSignature;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const LEDGER_FILE: &str = "success-ledger.json";

/// One successful run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
  pub signature: ChangeSignature,
  pub tag: String,
  pub recorded_at: DateTime<Utc>,
}

/// JSON-backed set of successful change signatures
#[derive(Debug)]
pub struct SuccessLedger {
  path: PathBuf,
  entries: Vec<LedgerEntry>,
}

impl SuccessLedger {
  /// Open the ledger in `state_dir` (an absent file is an empty ledger)
  pub fn open(state_dir: &Path) -> ShipResult<Self> {
    let path = state_dir.join(LEDGER_FILE);
    let entries = if path.exists() {
      let content = fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))?;
      serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))?
    } else {
      Vec::new()
    };

    Ok(Self { path, entries })
  }

  pub fn contains(&self, signature: &ChangeSignature) -> bool {
    self.entries.iter().any(|e| &e.signature == signature)
  }

  /// Record a successful run and persist the ledger
  pub fn record(&mut self, signature: ChangeSignature, tag: &str) -> ShipResult<()> {
    if self.contains(&signature) {
      return Ok(());
    }

    self.entries.push(LedgerEntry {
      signature,
      tag: tag.to_string(),
      recorded_at: Utc::now(),
    });

    if let Some(parent) = self.path.parent() {
      fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(&self.entries)?;
    let tmp = self.path.with_extension("json.tmp");
    fs::write(&tmp, json).with_context(|| format!("Failed to write {}", tmp.display()))?;
    fs::rename(&tmp, &self.path).with_context(|| format!("Failed to replace {}", self.path.display()))?;
    Ok(())
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// Most recently recorded run
  pub fn last(&self) -> Option<&LedgerEntry> {
    self.entries.last()
  }
}
