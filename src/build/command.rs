//! Command-template builder
//!
//! Expands the configured build tool for a job, runs it on the job's execution
//! backend, then collects the binary and side files into the job directory.
//!
//! Every job builds with `CARGO_TARGET_DIR` inside its own job directory, so jobs
//! for the same triple (old-glibc, distro, installer) never read each other's output.

use crate::build::runner::{ToolCommand, ToolRunner};
use crate::build::{BuildOutput, BuildSettings, Builder, ExecutionBackend, SideFile};
use crate::catalog::naming::SideFileKind;
use crate::catalog::{PackagingVariant, TargetDescriptor};
use crate::core::error::{ShipError, ShipResult, ResultExt};
use crate::matrix::BuildJob;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Mount point of the project inside emulation containers
const CONTAINER_PROJECT_DIR: &str = "/project";

/// Builds by running the configured native or cross tool
pub struct CommandBuilder {
  runner: Arc<dyn ToolRunner>,
}

impl CommandBuilder {
  pub fn new(runner: Arc<dyn ToolRunner>) -> Self {
    Self { runner }
  }

  /// Backend for a job. Cross distro packages with a container run the native
  /// toolchain inside that (architecture-matched) container.
  pub fn backend(target: &TargetDescriptor) -> ExecutionBackend {
    ExecutionBackend::for_target(target)
  }

  fn command(&self, job: &BuildJob, settings: &BuildSettings, job_dir: &Path) -> ShipResult<ToolCommand> {
    let cfg = &settings.config;
    let target = &job.target;
    let emulated = emulation_image(target);

    let spec = match (Self::backend(target), emulated) {
      (ExecutionBackend::Container { .. }, None) => &cfg.cross,
      _ => &cfg.native,
    };

    let target_dir = settings.target_dir(job);
    let (job_dir_arg, target_dir_arg) = match emulated {
      Some(_) => (
        container_path(&settings.root, job_dir)?,
        container_path(&settings.root, &target_dir)?,
      ),
      None => (job_dir.display().to_string(), target_dir.display().to_string()),
    };
    let vars = [
      ("target", target.triple.as_str()),
      ("version", job.version.as_str()),
      ("binary", settings.binary.as_str()),
      ("output", job_dir_arg.as_str()),
      ("target_dir", target_dir_arg.as_str()),
    ];

    let mut cmd = ToolCommand::from_spec(spec, &settings.root, &vars);
    if !job.features.is_empty() {
      cmd = cmd.arg("--features").arg(job.features.join(","));
    }

    cmd = cmd
      .env("CARGO_TARGET_DIR", target_dir_arg.as_str())
      .env("SHIPYARD_TARGET", target.triple.as_str())
      .env("SHIPYARD_VERSION", job.version.as_str());
    if cfg.generate_side_files {
      cmd = cmd
        .env(cfg.generate_env.as_str(), "true")
        .env(format!("{}_DIR", cfg.generate_env), format!("{}/generated", job_dir_arg));
    }

    match (Self::backend(target), emulated) {
      (ExecutionBackend::Container { image: Some(image) }, None) => {
        Ok(cmd.env(cross_image_env(&target.triple), image))
      }
      (_, Some(image)) => Ok(wrap_in_container(&cfg.container_engine, image, &settings.root, cmd)),
      _ => Ok(cmd),
    }
  }
}

impl Builder for CommandBuilder {
  fn build(&self, job: &BuildJob, settings: &BuildSettings) -> ShipResult<BuildOutput> {
    let target_id = job.target.id();
    let job_dir = settings.job_dir(job);
    fs::create_dir_all(&job_dir).with_context(|| format!("Failed to create {}", job_dir.display()))?;

    let cmd = self.command(job, settings, &job_dir)?;
    tracing::info!(target = %target_id, cmd = %cmd.display(), "building");

    let output = self
      .runner
      .run(&cmd)
      .map_err(|e| ShipError::build(&target_id, format!("could not start build: {}", e)))?;
    if !output.success {
      return Err(ShipError::build(
        &target_id,
        format!("'{}' failed\n{}", cmd.display(), output.stderr_tail()),
      ));
    }

    let built = settings.built_binary(job);
    if !built.is_file() {
      return Err(ShipError::build(
        &target_id,
        format!("build succeeded but {} was not produced", built.display()),
      ));
    }

    let bin_dir = job_dir.join("bin");
    fs::create_dir_all(&bin_dir)?;
    let binary = bin_dir.join(file_name(&built));
    fs::copy(&built, &binary).with_context(|| format!("Failed to copy {}", built.display()))?;

    let side_files = if settings.config.generate_side_files {
      collect_side_files(&job_dir.join("generated"))?
    } else {
      Vec::new()
    };

    tracing::debug!(target = %target_id, side_files = side_files.len(), "build output collected");
    Ok(BuildOutput {
      job_index: job.index,
      binary,
      side_files,
      work_dir: job_dir,
    })
  }
}

fn file_name(path: &Path) -> String {
  path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
}

/// Image for builds that must run inside an architecture-matched container
fn emulation_image(target: &TargetDescriptor) -> Option<&str> {
  if target.cross && target.variant == PackagingVariant::DistroPackage {
    target.container.as_deref()
  } else {
    None
  }
}

/// `CROSS_TARGET_<TRIPLE>_IMAGE`, the variable `cross` reads for a custom image
pub fn cross_image_env(triple: &str) -> String {
  let upper: String = triple
    .chars()
    .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
    .collect();
  format!("CROSS_TARGET_{}_IMAGE", upper)
}

/// Path of `path` as seen from inside an emulation container
pub fn container_path(root: &Path, path: &Path) -> ShipResult<String> {
  let relative = path.strip_prefix(root).map_err(|_| {
    ShipError::with_help(
      format!("{} is outside the project root", path.display()),
      "Container builds need the staging directory inside the project",
    )
  })?;
  Ok(format!("{}/{}", CONTAINER_PROJECT_DIR, relative.display()))
}

/// Run `inner` through `<engine> run --rm -v <root>:/project -w /project <image> ...`
pub fn wrap_in_container(engine: &str, image: &str, root: &Path, inner: ToolCommand) -> ToolCommand {
  let mut args = vec![
    "run".to_string(),
    "--rm".to_string(),
    "-v".to_string(),
    format!("{}:{}", root.display(), CONTAINER_PROJECT_DIR),
    "-w".to_string(),
    CONTAINER_PROJECT_DIR.to_string(),
  ];
  for (key, value) in &inner.env {
    args.push("-e".to_string());
    args.push(format!("{}={}", key, value));
  }
  args.push(image.to_string());
  args.push(inner.program);
  args.extend(inner.args);

  ToolCommand {
    program: engine.to_string(),
    args,
    cwd: inner.cwd,
    env: Vec::new(),
  }
}

/// Files under `<generated>/manpage` and `<generated>/completion`, sorted by path
fn collect_side_files(generated: &Path) -> ShipResult<Vec<SideFile>> {
  let mut files = Vec::new();
  for kind in [SideFileKind::Manpage, SideFileKind::Completion] {
    let dir = generated.join(kind.dir_name());
    if !dir.is_dir() {
      continue;
    }
    let mut paths: Vec<PathBuf> = fs::read_dir(&dir)
      .with_context(|| format!("Failed to read {}", dir.display()))?
      .filter_map(|entry| entry.ok().map(|e| e.path()))
      .filter(|p| p.is_file())
      .collect();
    paths.sort();
    files.extend(paths.into_iter().map(|path| SideFile { kind, path }));
  }
  Ok(files)
}
