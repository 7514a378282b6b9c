//! Test helpers for integration tests

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// Stand-in build tool: writes a fake binary where cargo would (under the job's
/// `CARGO_TARGET_DIR`), or fails for any triple listed in `SHIPYARD_FAIL`.
const FAKE_BUILD: &str = r#"
for t in $SHIPYARD_FAIL; do
  if [ "$t" = "$SHIPYARD_TARGET" ]; then
    echo "error: linker failed for $SHIPYARD_TARGET" >&2
    exit 1
  fi
done
bin=demo
case "$SHIPYARD_TARGET" in *windows*) bin=demo.exe ;; esac
out="$CARGO_TARGET_DIR/$SHIPYARD_TARGET/release"
mkdir -p "$out"
echo "demo binary for $SHIPYARD_TARGET" > "$out/$bin"
"#;

/// A catalog target for the test config
pub struct TestTarget {
  pub family: &'static str,
  pub triple: &'static str,
  pub variant: &'static str,
  pub best_effort: bool,
}

pub const fn supported(family: &'static str, triple: &'static str) -> TestTarget {
  TestTarget {
    family,
    triple,
    variant: "native-archive",
    best_effort: false,
  }
}

/// A supported windows installer target
pub const fn installer(triple: &'static str) -> TestTarget {
  TestTarget {
    family: "windows",
    triple,
    variant: "installer",
    best_effort: false,
  }
}

pub const fn best_effort(family: &'static str, triple: &'static str) -> TestTarget {
  TestTarget {
    family,
    triple,
    variant: "native-archive",
    best_effort: true,
  }
}

/// A project directory with a shipyard.toml that builds with a shell script
/// and publishes to a local release store under `releases/`
pub struct TestProject {
  _root: TempDir,
  pub path: PathBuf,
  failing: Vec<String>,
}

impl TestProject {
  /// Three native-archive targets: linux, macos and windows
  pub fn new() -> Result<Self> {
    Self::with_targets(&[
      supported("linux", "x86_64-unknown-linux-gnu"),
      supported("macos", "aarch64-apple-darwin"),
      supported("windows", "x86_64-pc-windows-msvc"),
    ])
  }

  pub fn with_targets(targets: &[TestTarget]) -> Result<Self> {
    let root = TempDir::new()?;
    let path = root.path().to_path_buf();

    let mut config = format!(
      r#"[project]
name = "demo"

[build.native]
command = "sh"
args = ["-c", '''{}''', "sh", "{{target}}"]

[packaging.installer]
command = "sh"
args = ["-c", 'echo "installer for $1" > "$2"', "sh", "{{target}}", "{{output}}"]

[publish]
store = "local"
local_dir = "releases"
replace_pause_secs = 0
"#,
      FAKE_BUILD
    );

    for target in targets {
      config.push_str(&format!(
        "\n[[targets]]\nfamily = \"{}\"\ntriple = \"{}\"\nvariant = \"{}\"\ntier = \"{}\"\n",
        target.family,
        target.triple,
        target.variant,
        if target.best_effort { "best-effort" } else { "supported" }
      ));
    }

    std::fs::write(path.join("shipyard.toml"), config)?;

    Ok(Self {
      _root: root,
      path,
      failing: Vec::new(),
    })
  }

  /// Make the fake build fail for `triple`
  pub fn fail_target(&mut self, triple: &str) {
    self.failing.push(triple.to_string());
  }

  /// Run shipyard in the project directory without checking the exit status
  pub fn shipyard(&self, args: &[&str]) -> Result<Output> {
    Command::new(env!("CARGO_BIN_EXE_shipyard"))
      .current_dir(&self.path)
      .args(args)
      .env("SHIPYARD_FAIL", self.failing.join(" "))
      .env_remove("RUST_LOG")
      .output()
      .context("Failed to run shipyard")
  }

  /// Run shipyard and fail the test on a non-zero exit
  pub fn shipyard_ok(&self, args: &[&str]) -> Result<Output> {
    let output = self.shipyard(args)?;
    if !output.status.success() {
      anyhow::bail!(
        "shipyard {} failed\nstdout: {}\nstderr: {}",
        args.join(" "),
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
      );
    }
    Ok(output)
  }

  /// Run with `--json` and parse stdout
  pub fn shipyard_json(&self, args: &[&str]) -> Result<serde_json::Value> {
    let mut args = args.to_vec();
    args.push("--json");
    let output = self.shipyard_ok(&args)?;
    serde_json::from_slice(&output.stdout).context("stdout was not JSON")
  }

  /// Files attached to the local release at `tag`, sorted
  pub fn released_files(&self, tag: &str) -> Result<Vec<String>> {
    let dir = self.path.join("releases").join(tag);
    let mut files = Vec::new();
    for entry in std::fs::read_dir(&dir).with_context(|| format!("no release at {}", tag))? {
      let name = entry?.file_name().to_string_lossy().into_owned();
      if name != "release.json" {
        files.push(name);
      }
    }
    files.sort();
    Ok(files)
  }

  pub fn has_release(&self, tag: &str) -> bool {
    self.path.join("releases").join(tag).join("release.json").is_file()
  }

  pub fn staging_dir(&self) -> PathBuf {
    self.path.join(".shipyard").join("staging")
  }
}

/// Exit code of a finished process
pub fn exit_code(output: &Output) -> i32 {
  output.status.code().unwrap_or(-1)
}

pub fn stdout(output: &Output) -> String {
  String::from_utf8_lossy(&output.stdout).into_owned()
}

pub fn stderr(output: &Output) -> String {
  String::from_utf8_lossy(&output.stderr).into_owned()
}

/// Write a staged run directory with a creation stamp
pub fn stage_fake_run(staging: &Path, run_id: &str, created: &str) -> Result<()> {
  let dir = staging.join(run_id);
  std::fs::create_dir_all(dir.join("bundles"))?;
  std::fs::write(dir.join(".created"), created)?;
  Ok(())
}
