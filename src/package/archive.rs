//! Native archives: `.tar.gz` everywhere except windows, which gets `.zip`
//!
//! Entries carry fixed timestamps and modes so the same inputs give the same bytes.

use crate::build::BuildOutput;
use crate::catalog::naming::bundle_extension;
use crate::catalog::{PackagingVariant, PlatformFamily};
use crate::core::error::{ShipResult, ResultExt};
use crate::matrix::BuildJob;
use crate::package::{BundleKind, PackContext, PackagedFile, PackagingStrategy};
use flate2::Compression;
use flate2::write::GzEncoder;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// A file to place in an archive
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
  pub source: PathBuf,
  /// Path inside the archive
  pub name: String,
  pub executable: bool,
}

impl ArchiveEntry {
  pub fn file(source: &Path, name: impl Into<String>) -> Self {
    Self {
      source: source.to_path_buf(),
      name: name.into(),
      executable: false,
    }
  }

  pub fn executable(source: &Path, name: impl Into<String>) -> Self {
    Self {
      executable: true,
      ..Self::file(source, name)
    }
  }

  fn mode(&self) -> u32 {
    if self.executable { 0o755 } else { 0o644 }
  }
}

/// Write a gzip-compressed tarball
pub fn write_tar_gz(dest: &Path, entries: &[ArchiveEntry]) -> ShipResult<()> {
  let file = File::create(dest).with_context(|| format!("Failed to create {}", dest.display()))?;
  let encoder = GzEncoder::new(BufWriter::new(file), Compression::best());
  let mut builder = tar::Builder::new(encoder);

  for entry in entries {
    let data = fs::read(&entry.source).with_context(|| format!("Failed to read {}", entry.source.display()))?;
    let mut header = tar::Header::new_gnu();
    header.set_size(data.len() as u64);
    header.set_mode(entry.mode());
    header.set_mtime(0);
    builder
      .append_data(&mut header, &entry.name, data.as_slice())
      .with_context(|| format!("Failed to add {} to {}", entry.name, dest.display()))?;
  }

  let encoder = builder.into_inner()?;
  encoder.finish()?.flush()?;
  Ok(())
}

/// Write a deflate-compressed zip
pub fn write_zip(dest: &Path, entries: &[ArchiveEntry]) -> ShipResult<()> {
  let file = File::create(dest).with_context(|| format!("Failed to create {}", dest.display()))?;
  let mut writer = zip::ZipWriter::new(BufWriter::new(file));

  for entry in entries {
    let options = zip::write::SimpleFileOptions::default()
      .compression_method(zip::CompressionMethod::Deflated)
      .last_modified_time(zip::DateTime::default())
      .unix_permissions(entry.mode());
    let data = fs::read(&entry.source).with_context(|| format!("Failed to read {}", entry.source.display()))?;
    writer.start_file(entry.name.as_str(), options)?;
    writer.write_all(&data)?;
  }

  writer.finish()?.flush()?;
  Ok(())
}

/// Binary plus side files in one archive
pub struct ArchiveStrategy;

impl PackagingStrategy for ArchiveStrategy {
  fn variant(&self) -> PackagingVariant {
    PackagingVariant::NativeArchive
  }

  fn produce(&self, output: &BuildOutput, job: &BuildJob, _ctx: &PackContext<'_>) -> ShipResult<Vec<PackagedFile>> {
    let mut entries = Vec::with_capacity(1 + output.side_files.len());
    let binary_name = file_name(&output.binary);
    entries.push(ArchiveEntry::executable(&output.binary, binary_name));
    for side in &output.side_files {
      entries.push(ArchiveEntry::file(
        &side.path,
        format!("{}/{}", side.kind.dir_name(), file_name(&side.path)),
      ));
    }

    let dest = output.work_dir.join(&job.bundle_name);
    match (job.target.family, bundle_extension(&job.target)) {
      (PlatformFamily::Windows, "zip") => write_zip(&dest, &entries)?,
      _ => write_tar_gz(&dest, &entries)?,
    }

    Ok(vec![PackagedFile {
      name: job.bundle_name.clone(),
      kind: BundleKind::Archive,
      path: dest,
    }])
  }
}

pub(crate) fn file_name(path: &Path) -> String {
  path
    .file_name()
    .map(|n| n.to_string_lossy().into_owned())
    .unwrap_or_default()
}
