//! External tool execution
//!
//! Every build and packaging tool goes through a `ToolRunner`, so the orchestration
//! can be exercised without a real toolchain.

use crate::core::config::ToolSpec;
use crate::core::error::{ShipResult, ResultExt};
use std::path::{Path, PathBuf};
use std::process::Command;

/// One fully-expanded tool invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
  pub program: String,
  pub args: Vec<String>,
  pub cwd: PathBuf,
  pub env: Vec<(String, String)>,
}

impl ToolCommand {
  /// Expand a configured tool against `vars` (`{name}` → value)
  pub fn from_spec(spec: &ToolSpec, cwd: &Path, vars: &[(&str, &str)]) -> Self {
    Self {
      program: expand(&spec.command, vars),
      args: spec.args.iter().map(|a| expand(a, vars)).collect(),
      cwd: cwd.to_path_buf(),
      env: Vec::new(),
    }
  }

  pub fn arg(mut self, arg: impl Into<String>) -> Self {
    self.args.push(arg.into());
    self
  }

  pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
    self.env.push((key.into(), value.into()));
    self
  }

  /// Render for logs
  pub fn display(&self) -> String {
    let mut out = self.program.clone();
    for arg in &self.args {
      out.push(' ');
      out.push_str(arg);
    }
    out
  }
}

/// Captured result of a finished tool
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
  pub success: bool,
  pub stdout: String,
  pub stderr: String,
}

impl ToolOutput {
  /// Last few stderr lines, for failure reasons
  pub fn stderr_tail(&self) -> String {
    let lines: Vec<&str> = self.stderr.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(5);
    lines[start..].join("\n")
  }
}

/// Runs external tools. A non-zero exit is reported through `ToolOutput::success`;
/// only a failure to launch is an `Err`.
pub trait ToolRunner: Send + Sync {
  fn run(&self, command: &ToolCommand) -> ShipResult<ToolOutput>;
}

/// Runs tools as child processes
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl ToolRunner for SystemRunner {
  fn run(&self, command: &ToolCommand) -> ShipResult<ToolOutput> {
    tracing::debug!(cmd = %command.display(), cwd = %command.cwd.display(), "running tool");

    let output = Command::new(&command.program)
      .args(&command.args)
      .current_dir(&command.cwd)
      .envs(command.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
      .output()
      .with_context(|| format!("Failed to launch '{}'", command.program))?;

    Ok(ToolOutput {
      success: output.status.success(),
      stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
      stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
  }
}

/// Replace `{name}` placeholders. Unknown placeholders are left as-is.
pub fn expand(template: &str, vars: &[(&str, &str)]) -> String {
  let mut out = template.to_string();
  for (name, value) in vars {
    out = out.replace(&format!("{{{}}}", name), value);
  }
  out
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_expand_placeholders() {
    let vars = [("target", "x86_64-unknown-linux-gnu"), ("output", "/tmp/out.deb")];
    assert_eq!(expand("--target={target}", &vars), "--target=x86_64-unknown-linux-gnu");
    assert_eq!(expand("{output}", &vars), "/tmp/out.deb");
    assert_eq!(expand("{unknown}", &vars), "{unknown}");
  }

  #[test]
  fn test_command_from_spec() {
    let spec = ToolSpec::new("cargo", &["build", "--target", "{target}"]);
    let cmd = ToolCommand::from_spec(&spec, Path::new("/src"), &[("target", "aarch64-apple-darwin")])
      .arg("--features")
      .arg("battery")
      .env("SHIPYARD_GENERATE", "true");
    assert_eq!(cmd.program, "cargo");
    assert_eq!(
      cmd.args,
      vec!["build", "--target", "aarch64-apple-darwin", "--features", "battery"]
    );
    assert_eq!(cmd.display(), "cargo build --target aarch64-apple-darwin --features battery");
    assert_eq!(cmd.env.len(), 1);
  }

  #[test]
  fn test_system_runner_reports_exit_status() {
    let dir = tempfile::TempDir::new().unwrap();
    let ok = ToolCommand::from_spec(&ToolSpec::new("sh", &["-c", "echo hi"]), dir.path(), &[]);
    let out = SystemRunner.run(&ok).unwrap();
    assert!(out.success);
    assert_eq!(out.stdout.trim(), "hi");

    let bad = ToolCommand::from_spec(&ToolSpec::new("sh", &["-c", "echo boom >&2; exit 3"]), dir.path(), &[]);
    let out = SystemRunner.run(&bad).unwrap();
    assert!(!out.success);
    assert_eq!(out.stderr_tail(), "boom");
  }

  #[test]
  fn test_missing_program_is_error() {
    let dir = tempfile::TempDir::new().unwrap();
    let cmd = ToolCommand::from_spec(&ToolSpec::new("shipyard-no-such-tool", &[]), dir.path(), &[]);
    assert!(SystemRunner.run(&cmd).is_err());
  }
}
