//! Error types for shipyard with contextual messages and exit codes
//!
//! Errors are grouped by the stage that raised them. Job-level errors (build,
//! packaging mismatch) are normally captured into a `JobFailure` and only the
//! aggregator decides whether they escalate into a run-level failure.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Exit codes for shipyard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
  /// User error (config, invalid args, bad catalog)
  User = 1,
  /// System error (tools, store, I/O)
  System = 2,
  /// Validation failure (packaging mismatch, missing bundle files)
  Validation = 3,
  /// The build matrix failed; nothing was published
  RunFailed = 4,
}

impl ExitCode {
  /// Convert to i32 for process exit
  pub fn as_i32(self) -> i32 {
    self as i32
  }
}

/// Main error type for shipyard
#[derive(Debug)]
pub enum ShipError {
  /// Configuration errors
  Config(ConfigError),

  /// Catalog or run-parameter misconfiguration, raised before any job starts
  Planning(PlanningError),

  /// A single job failed to build or package
  Build(BuildFailure),

  /// A produced package disagrees with its target descriptor
  PackagingMismatch {
    target: String,
    expected: String,
    actual: String,
  },

  /// Supported jobs never reached a terminal state before the deadline
  AggregationIncomplete { pending: Vec<String> },

  /// Release store errors other than not-found
  Publish(PublishError),

  /// The aggregated run was marked failed
  RunFailed { failed_targets: Vec<String> },

  /// A newer run superseded this one
  Cancelled { group: String },

  /// I/O errors
  Io(io::Error),

  /// Generic error with message and optional context
  Message {
    message: String,
    context: Option<String>,
    help: Option<String>,
  },
}

impl ShipError {
  /// Create a simple error message
  pub fn message(msg: impl Into<String>) -> Self {
    ShipError::Message {
      message: msg.into(),
      context: None,
      help: None,
    }
  }

  /// Create an error with help text
  pub fn with_help(msg: impl Into<String>, help: impl Into<String>) -> Self {
    ShipError::Message {
      message: msg.into(),
      context: None,
      help: Some(help.into()),
    }
  }

  /// Shorthand for a planning error
  pub fn planning(reason: impl Into<String>) -> Self {
    ShipError::Planning(PlanningError { reason: reason.into() })
  }

  /// Shorthand for a per-job build failure
  pub fn build(target: impl Into<String>, reason: impl Into<String>) -> Self {
    ShipError::Build(BuildFailure {
      target: target.into(),
      reason: reason.into(),
    })
  }

  /// Add context to an existing error
  pub fn context(self, ctx: impl Into<String>) -> Self {
    let ctx_str = ctx.into();
    match self {
      ShipError::Message { message, context, help } => ShipError::Message {
        message,
        context: Some(context.map(|c| format!("{}\n{}", ctx_str, c)).unwrap_or(ctx_str)),
        help,
      },
      ShipError::Io(e) => ShipError::Message {
        message: format!("I/O error: {}", e),
        context: Some(ctx_str),
        help: None,
      },
      _ => self,
    }
  }

  /// Get the appropriate exit code for this error
  pub fn exit_code(&self) -> ExitCode {
    match self {
      ShipError::Config(_) => ExitCode::User,
      ShipError::Planning(_) => ExitCode::User,
      ShipError::Build(_) => ExitCode::System,
      ShipError::PackagingMismatch { .. } => ExitCode::Validation,
      ShipError::AggregationIncomplete { .. } => ExitCode::RunFailed,
      ShipError::Publish(PublishError::MissingFiles { .. }) => ExitCode::Validation,
      ShipError::Publish(_) => ExitCode::System,
      ShipError::RunFailed { .. } => ExitCode::RunFailed,
      ShipError::Cancelled { .. } => ExitCode::RunFailed,
      ShipError::Io(_) => ExitCode::System,
      ShipError::Message { .. } => ExitCode::User,
    }
  }

  /// Get contextual help message for this error
  pub fn help_message(&self) -> Option<String> {
    match self {
      ShipError::Config(e) => e.help_message(),
      ShipError::Planning(_) => Some("Fix the [[targets]] catalog in shipyard.toml, then re-run `shipyard plan`.".to_string()),
      ShipError::PackagingMismatch { .. } => {
        Some("Check the container image used for this target; it must match the target architecture.".to_string())
      }
      ShipError::AggregationIncomplete { .. } => {
        Some("Raise [concurrency] timeout_mins or investigate the stuck targets.".to_string())
      }
      ShipError::Publish(e) => e.help_message(),
      ShipError::RunFailed { .. } => Some("No release was created or replaced. Fix the failed targets and re-run.".to_string()),
      ShipError::Message { help, .. } => help.clone(),
      _ => None,
    }
  }
}

impl fmt::Display for ShipError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ShipError::Config(e) => write!(f, "{}", e),
      ShipError::Planning(e) => write!(f, "{}", e),
      ShipError::Build(e) => write!(f, "{}", e),
      ShipError::PackagingMismatch {
        target,
        expected,
        actual,
      } => write!(
        f,
        "Packaging mismatch for {}: expected architecture '{}', package declares '{}'",
        target, expected, actual
      ),
      ShipError::AggregationIncomplete { pending } => {
        write!(f, "Supported targets never finished: {}", pending.join(", "))
      }
      ShipError::Publish(e) => write!(f, "{}", e),
      ShipError::RunFailed { failed_targets } => {
        write!(f, "Release run failed for supported targets: {}", failed_targets.join(", "))
      }
      ShipError::Cancelled { group } => write!(f, "Run superseded by a newer run in group '{}'", group),
      ShipError::Io(e) => write!(f, "I/O error: {}", e),
      ShipError::Message { message, context, .. } => {
        write!(f, "{}", message)?;
        if let Some(ctx) = context {
          write!(f, "\n{}", ctx)?;
        }
        Ok(())
      }
    }
  }
}

impl std::error::Error for ShipError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      ShipError::Io(e) => Some(e),
      _ => None,
    }
  }
}

impl From<io::Error> for ShipError {
  fn from(err: io::Error) -> Self {
    ShipError::Io(err)
  }
}

impl From<String> for ShipError {
  fn from(msg: String) -> Self {
    ShipError::message(msg)
  }
}

impl From<&str> for ShipError {
  fn from(msg: &str) -> Self {
    ShipError::message(msg)
  }
}

impl From<cargo_metadata::Error> for ShipError {
  fn from(err: cargo_metadata::Error) -> Self {
    ShipError::message(format!("Cargo metadata error: {}", err))
  }
}

impl From<toml_edit::de::Error> for ShipError {
  fn from(err: toml_edit::de::Error) -> Self {
    ShipError::message(format!("TOML deserialization error: {}", err))
  }
}

impl From<toml_edit::ser::Error> for ShipError {
  fn from(err: toml_edit::ser::Error) -> Self {
    ShipError::message(format!("TOML serialization error: {}", err))
  }
}

impl From<serde_json::Error> for ShipError {
  fn from(err: serde_json::Error) -> Self {
    ShipError::message(format!("JSON error: {}", err))
  }
}

impl From<zip::result::ZipError> for ShipError {
  fn from(err: zip::result::ZipError) -> Self {
    ShipError::message(format!("Zip archive error: {}", err))
  }
}

impl From<rayon::ThreadPoolBuildError> for ShipError {
  fn from(err: rayon::ThreadPoolBuildError) -> Self {
    ShipError::message(format!("Failed to start job pool: {}", err))
  }
}

impl From<std::path::StripPrefixError> for ShipError {
  fn from(err: std::path::StripPrefixError) -> Self {
    ShipError::message(format!("Path strip prefix error: {}", err))
  }
}

/// Configuration-related errors
#[derive(Debug)]
pub enum ConfigError {
  /// shipyard.toml not found
  NotFound { project_root: PathBuf },

  /// Missing required field
  MissingField { field: String },

  /// Field present but unusable
  InvalidValue { field: String, reason: String },
}

impl ConfigError {
  fn help_message(&self) -> Option<String> {
    match self {
      ConfigError::NotFound { .. } => Some("Run `shipyard init` to create a configuration file.".to_string()),
      ConfigError::MissingField { field } => Some(format!("Add `{}` to shipyard.toml.", field)),
      ConfigError::InvalidValue { .. } => None,
    }
  }
}

impl fmt::Display for ConfigError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ConfigError::NotFound { project_root } => {
        write!(
          f,
          "No shipyard configuration found.\nExpected file: {}/shipyard.toml",
          project_root.display()
        )
      }
      ConfigError::MissingField { field } => {
        write!(f, "Missing required field in config: {}", field)
      }
      ConfigError::InvalidValue { field, reason } => {
        write!(f, "Invalid value for {}: {}", field, reason)
      }
    }
  }
}

/// Catalog misconfiguration; aborts before any job starts
#[derive(Debug)]
pub struct PlanningError {
  pub reason: String,
}

impl fmt::Display for PlanningError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Planning failed: {}", self.reason)
  }
}

/// Build or packaging failure for one target
#[derive(Debug)]
pub struct BuildFailure {
  pub target: String,
  pub reason: String,
}

impl fmt::Display for BuildFailure {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Build failed for {}: {}", self.target, self.reason)
  }
}

/// Release store errors
#[derive(Debug)]
pub enum PublishError {
  /// Store rejected a delete for a reason other than not-found
  DeleteFailed { tag: String, reason: String },

  /// Store rejected a create
  CreateFailed { tag: String, reason: String },

  /// Declared bundle files are missing at publish time
  MissingFiles { tag: String, files: Vec<PathBuf> },

  /// Manifest failed mock/pre-publish validation
  InvalidManifest { tag: String, reason: String },
}

impl PublishError {
  fn help_message(&self) -> Option<String> {
    match self {
      PublishError::DeleteFailed { .. } | PublishError::CreateFailed { .. } => {
        Some("Inspect the release store, then re-run the release manually.".to_string())
      }
      PublishError::MissingFiles { .. } => {
        Some("A staged bundle disappeared before publish. Re-run the release to rebuild it.".to_string())
      }
      PublishError::InvalidManifest { .. } => None,
    }
  }
}

impl fmt::Display for PublishError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      PublishError::DeleteFailed { tag, reason } => write!(f, "Failed to delete release '{}': {}", tag, reason),
      PublishError::CreateFailed { tag, reason } => write!(f, "Failed to create release '{}': {}", tag, reason),
      PublishError::MissingFiles { tag, files } => {
        let names: Vec<String> = files.iter().map(|p| p.display().to_string()).collect();
        write!(
          f,
          "Refusing to create release '{}': declared files are missing: {}",
          tag,
          names.join(", ")
        )
      }
      PublishError::InvalidManifest { tag, reason } => write!(f, "Release manifest for '{}' is invalid: {}", tag, reason),
    }
  }
}

/// Result type alias for shipyard
pub type ShipResult<T> = Result<T, ShipError>;

/// Helper trait to add context to Results
pub trait ResultExt<T> {
  /// Add context to an error result
  fn context(self, ctx: impl Into<String>) -> ShipResult<T>;

  /// Add context using a closure (lazy evaluation)
  fn with_context<F>(self, f: F) -> ShipResult<T>
  where
    F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
  E: Into<ShipError>,
{
  fn context(self, ctx: impl Into<String>) -> ShipResult<T> {
    self.map_err(|e| e.into().context(ctx))
  }

  fn with_context<F>(self, f: F) -> ShipResult<T>
  where
    F: FnOnce() -> String,
  {
    self.map_err(|e| e.into().context(f()))
  }
}

/// Pretty-print an error to stderr with help text
pub fn print_error(error: &ShipError) {
  eprintln!("\n❌ {}\n", error);

  if let Some(help) = error.help_message() {
    eprintln!("💡 Help: {}\n", help);
  }
}
