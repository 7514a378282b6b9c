//! Trigger gate: decide whether a run proceeds or is skipped as a duplicate
//!
//! Manual, scheduled and programmatic-call triggers always proceed. Any other
//! trigger is reduced to a content-addressed `ChangeSignature` over the changed
//! paths that are build inputs and their current contents; the run is skipped when that signature already
//! has a successful run in the ledger, or when no build input changed at all.
//!
//! The gate only decides. Callers must stop before planning on `Skip`.

pub mod changes;
pub mod ledger;

use crate::core::error::{ShipError, ShipResult};
use ledger::SuccessLedger;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

/// What started the run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum TriggerKind {
  /// Started by a person; may request a mock run
  Manual { mock: bool },
  /// Nightly/cron run; always real
  Schedule,
  /// Invoked from another pipeline; the caller is only a label
  Call { caller: String },
  Push,
  PullRequest,
}

impl TriggerKind {
  pub fn always_proceeds(&self) -> bool {
    matches!(
      self,
      TriggerKind::Manual { .. } | TriggerKind::Schedule | TriggerKind::Call { .. }
    )
  }

  /// Whether this trigger asks for a mock run
  pub fn is_mock(&self) -> bool {
    matches!(self, TriggerKind::Manual { mock: true })
  }

  /// Group name used for run supersession
  pub fn group(&self) -> &'static str {
    match self {
      TriggerKind::Manual { .. } => "manual",
      TriggerKind::Schedule => "schedule",
      TriggerKind::Call { .. } => "call",
      TriggerKind::Push => "push",
      TriggerKind::PullRequest => "pull-request",
    }
  }
}

impl fmt::Display for TriggerKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      TriggerKind::Manual { mock: true } => write!(f, "manual (mock)"),
      TriggerKind::Call { caller } => write!(f, "call from {}", caller),
      other => write!(f, "{}", other.group()),
    }
  }
}

/// SHA256 over the sorted, de-duplicated build-relevant paths and their contents
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChangeSignature(String);

impl ChangeSignature {
  /// Same paths with the same contents give the same signature, in any order
  pub fn from_changes<'a, I>(changes: I) -> Self
  where
    I: IntoIterator<Item = &'a ChangedPath>,
  {
    let unique: BTreeMap<&str, Option<&str>> = changes
      .into_iter()
      .map(|c| (c.path.as_str(), c.digest.as_deref()))
      .collect();

    let mut hasher = Sha256::new();
    for (path, digest) in unique {
      hasher.update(path.as_bytes());
      hasher.update(b"\0");
      hasher.update(digest.unwrap_or("deleted").as_bytes());
      hasher.update(b"\n");
    }
    Self(format!("{:x}", hasher.finalize()))
  }

  /// Get the short signature (first 12 characters)
  pub fn short(&self) -> &str {
    &self.0[..12.min(self.0.len())]
  }
}

impl fmt::Display for ChangeSignature {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.short())
  }
}

fn normalize_path(path: &str) -> String {
  let unified = path.trim().replace('\\', "/");
  unified.strip_prefix("./").unwrap_or(&unified).to_string()
}

/// Whether `path` is `prefix` or lies below it, compared by path component
fn is_under(path: &str, prefix: &str) -> bool {
  let prefix = normalize_path(prefix);
  let prefix = prefix.trim_end_matches('/');
  !prefix.is_empty() && Path::new(path).starts_with(prefix)
}

/// One changed path and the SHA256 of its content (`None` when it was deleted)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangedPath {
  pub path: String,
  pub digest: Option<String>,
}

/// Paths touched by the change being released
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
  paths: Vec<ChangedPath>,
}

impl ChangeSet {
  /// Read the current content of every path under `root`
  pub fn snapshot<I, S>(root: &Path, paths: I) -> ShipResult<Self>
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
  {
    let mut changes = Vec::new();
    for path in paths {
      let path = normalize_path(path.as_ref());
      if path.is_empty() {
        continue;
      }
      let digest = match fs::read(root.join(&path)) {
        Ok(bytes) => Some(format!("{:x}", Sha256::digest(&bytes))),
        Err(e) if e.kind() == io::ErrorKind::NotFound => None,
        Err(e) => return Err(ShipError::from(e).context(format!("Failed to read changed path {}", path))),
      };
      changes.push(ChangedPath { path, digest });
    }
    Ok(Self { paths: changes })
  }

  /// Paths under any of the given prefixes
  pub fn relevant<'a>(&'a self, prefixes: &'a [String]) -> impl Iterator<Item = &'a ChangedPath> + 'a {
    self
      .paths
      .iter()
      .filter(move |c| prefixes.iter().any(|prefix| is_under(&c.path, prefix)))
  }

  pub fn is_empty(&self) -> bool {
    self.paths.is_empty()
  }
}

/// Outcome of the gate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "lowercase")]
pub enum GateDecision {
  Proceed {
    reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    signature: Option<ChangeSignature>,
  },
  Skip {
    reason: String,
  },
}

impl GateDecision {
  pub fn proceeds(&self) -> bool {
    matches!(self, GateDecision::Proceed { .. })
  }

  /// Signature to record in the ledger once the run succeeds
  pub fn signature(&self) -> Option<&ChangeSignature> {
    match self {
      GateDecision::Proceed { signature, .. } => signature.as_ref(),
      GateDecision::Skip { .. } => None,
    }
  }
}

/// Duplicate-run gate over a success ledger
pub struct TriggerGate<'a> {
  prefixes: &'a [String],
  ledger: &'a SuccessLedger,
}

impl<'a> TriggerGate<'a> {
  pub fn new(prefixes: &'a [String], ledger: &'a SuccessLedger) -> Self {
    Self { prefixes, ledger }
  }

  pub fn evaluate(&self, trigger: &TriggerKind, changes: &ChangeSet) -> GateDecision {
    if trigger.always_proceeds() {
      return GateDecision::Proceed {
        reason: format!("{} triggers always run", trigger.group()),
        signature: None,
      };
    }

    let relevant: Vec<&ChangedPath> = changes.relevant(self.prefixes).collect();
    if relevant.is_empty() {
      return GateDecision::Skip {
        reason: "no build-input paths changed".to_string(),
      };
    }

    let signature = ChangeSignature::from_changes(relevant.iter().copied());
    if self.ledger.contains(&signature) {
      tracing::info!(signature = %signature, "duplicate change set already released");
      return GateDecision::Skip {
        reason: format!("change set {} already succeeded in an earlier run", signature),
      };
    }

    GateDecision::Proceed {
      reason: format!("{} build-input path(s) changed", relevant.len()),
      signature: Some(signature),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  fn prefixes() -> Vec<String> {
    vec!["src/".to_string(), "Cargo.toml".to_string()]
  }

  /// A project dir with the given files written
  fn project(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for (path, content) in files {
      let full = dir.path().join(path);
      fs::create_dir_all(full.parent().unwrap()).unwrap();
      fs::write(full, content).unwrap();
    }
    dir
  }

  fn signature(changes: &ChangeSet) -> ChangeSignature {
    let p = prefixes();
    ChangeSignature::from_changes(changes.relevant(&p))
  }

  #[test]
  fn test_signature_ignores_order_and_duplicates() {
    let dir = project(&[("src/a.rs", "fn a() {}"), ("src/b.rs", "fn b() {}")]);
    let a = ChangeSet::snapshot(dir.path(), ["src/a.rs", "src/b.rs", "src/a.rs"]).unwrap();
    let b = ChangeSet::snapshot(dir.path(), ["./src/b.rs", "src/a.rs"]).unwrap();
    assert_eq!(signature(&a), signature(&b));

    let only_a = ChangeSet::snapshot(dir.path(), ["src/a.rs"]).unwrap();
    assert_ne!(signature(&a), signature(&only_a));
  }

  #[test]
  fn test_signature_follows_content() {
    let dir = project(&[("src/main.rs", "fn main() {}")]);
    let before = ChangeSet::snapshot(dir.path(), ["src/main.rs"]).unwrap();

    fs::write(dir.path().join("src/main.rs"), "fn main() { println!(); }").unwrap();
    let after = ChangeSet::snapshot(dir.path(), ["src/main.rs"]).unwrap();
    assert_ne!(signature(&before), signature(&after));

    fs::remove_file(dir.path().join("src/main.rs")).unwrap();
    let deleted = ChangeSet::snapshot(dir.path(), ["src/main.rs"]).unwrap();
    assert_eq!(deleted.relevant(&prefixes()).next().unwrap().digest, None);
    assert_ne!(signature(&after), signature(&deleted));
  }

  #[test]
  fn test_prefixes_match_whole_components() {
    let dir = project(&[]);
    let changes = ChangeSet::snapshot(
      dir.path(),
      ["srcgen/out.rs", "Cargo.toml.orig", "src/lib.rs", "Cargo.toml", "crates/src/x.rs"],
    )
    .unwrap();
    let p = vec!["src".to_string(), "Cargo.toml".to_string()];
    let matched: Vec<&str> = changes.relevant(&p).map(|c| c.path.as_str()).collect();
    assert_eq!(matched, vec!["src/lib.rs", "Cargo.toml"]);
  }

  #[test]
  fn test_manual_schedule_and_call_always_proceed() {
    let dir = TempDir::new().unwrap();
    let ledger = SuccessLedger::open(dir.path()).unwrap();
    let p = prefixes();
    let gate = TriggerGate::new(&p, &ledger);
    let empty = ChangeSet::default();

    for trigger in [
      TriggerKind::Manual { mock: false },
      TriggerKind::Schedule,
      TriggerKind::Call {
        caller: "nightly".into(),
      },
    ] {
      assert!(gate.evaluate(&trigger, &empty).proceeds(), "{} should proceed", trigger);
    }
  }

  #[test]
  fn test_docs_only_push_is_skipped() {
    let dir = project(&[("docs/index.md", "# docs"), ("README.md", "readme")]);
    let ledger = SuccessLedger::open(&dir.path().join(".shipyard")).unwrap();
    let p = prefixes();
    let gate = TriggerGate::new(&p, &ledger);

    let changes = ChangeSet::snapshot(dir.path(), ["docs/index.md", "README.md"]).unwrap();
    assert!(!gate.evaluate(&TriggerKind::Push, &changes).proceeds());
  }

  #[test]
  fn test_duplicate_change_set_is_skipped_after_success() {
    let dir = project(&[("src/main.rs", "fn main() {}"), ("src/lib.rs", "pub fn x() {}"), ("docs/x.md", "x")]);
    let mut ledger = SuccessLedger::open(&dir.path().join(".shipyard")).unwrap();
    let p = prefixes();
    let changes = ChangeSet::snapshot(dir.path(), ["src/main.rs", "docs/x.md"]).unwrap();

    let signature = {
      let gate = TriggerGate::new(&p, &ledger);
      let decision = gate.evaluate(&TriggerKind::PullRequest, &changes);
      assert!(decision.proceeds());
      decision.signature().cloned().unwrap()
    };

    ledger.record(signature, "1.0.0").unwrap();

    let gate = TriggerGate::new(&p, &ledger);
    assert!(!gate.evaluate(&TriggerKind::Push, &changes).proceeds());
    // Docs-only differences restrict to the same build-input set
    let same = ChangeSet::snapshot(dir.path(), ["src/main.rs"]).unwrap();
    assert!(!gate.evaluate(&TriggerKind::Push, &same).proceeds());
    let other = ChangeSet::snapshot(dir.path(), ["src/lib.rs"]).unwrap();
    assert!(gate.evaluate(&TriggerKind::Push, &other).proceeds());
  }

  #[test]
  fn test_same_path_with_new_content_proceeds() {
    let dir = project(&[("src/main.rs", "fn main() {}")]);
    let mut ledger = SuccessLedger::open(&dir.path().join(".shipyard")).unwrap();
    let p = prefixes();

    let first = ChangeSet::snapshot(dir.path(), ["src/main.rs"]).unwrap();
    let signature = TriggerGate::new(&p, &ledger)
      .evaluate(&TriggerKind::Push, &first)
      .signature()
      .cloned()
      .unwrap();
    ledger.record(signature, "1.0.0").unwrap();

    fs::write(dir.path().join("src/main.rs"), "fn main() { run(); }").unwrap();
    let second = ChangeSet::snapshot(dir.path(), ["src/main.rs"]).unwrap();
    assert!(TriggerGate::new(&p, &ledger).evaluate(&TriggerKind::Push, &second).proceeds());
  }
}
