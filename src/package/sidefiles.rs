//! Side-file bundles for the canonical target
//!
//! Manual pages are gzip-compressed and completions shipped as-is, each kind in its
//! own `.tar.gz`. Only one target in the matrix produces these.

use crate::build::BuildOutput;
use crate::catalog::naming::{SideFileKind, side_file_bundle_name};
use crate::core::error::{ShipResult, ResultExt};
use crate::matrix::BuildJob;
use crate::package::archive::{ArchiveEntry, file_name, write_tar_gz};
use crate::package::{BundleKind, PackContext, PackagedFile};
use flate2::Compression;
use flate2::write::GzEncoder;
use std::fs::{self, File};
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};

/// Build the manpage and completion bundles for `output`. Kinds without files are skipped.
pub fn side_file_bundles(output: &BuildOutput, job: &BuildJob, ctx: &PackContext<'_>) -> ShipResult<Vec<PackagedFile>> {
  let scratch = output.work_dir.join("side-files");
  let mut bundles = Vec::new();

  for kind in [SideFileKind::Manpage, SideFileKind::Completion] {
    let sources: Vec<&Path> = output.side_files_of(kind).collect();
    if sources.is_empty() {
      continue;
    }

    let kind_dir = scratch.join(kind.dir_name());
    fs::create_dir_all(&kind_dir).with_context(|| format!("Failed to create {}", kind_dir.display()))?;

    let mut entries = Vec::with_capacity(sources.len());
    for source in sources {
      let entry = match kind {
        SideFileKind::Manpage => {
          let compressed = gzip_manpage(source, &kind_dir)?;
          ArchiveEntry::file(&compressed, file_name(&compressed))
        }
        SideFileKind::Completion => ArchiveEntry::file(source, file_name(source)),
      };
      entries.push(entry);
    }

    let name = side_file_bundle_name(ctx.project, &job.target, kind);
    let dest = output.work_dir.join(&name);
    write_tar_gz(&dest, &entries)?;
    tracing::debug!(bundle = %name, files = entries.len(), "side-file bundle written");

    bundles.push(PackagedFile {
      name,
      kind: BundleKind::SideFiles,
      path: dest,
    });
  }

  Ok(bundles)
}

/// gzip `page` into `dir`, keeping pages that are already compressed as they are
fn gzip_manpage(page: &Path, dir: &Path) -> ShipResult<PathBuf> {
  let name = file_name(page);
  if name.ends_with(".gz") {
    let dest = dir.join(&name);
    fs::copy(page, &dest)?;
    return Ok(dest);
  }

  let dest = dir.join(format!("{}.gz", name));
  let mut reader = BufReader::new(File::open(page).with_context(|| format!("Failed to open {}", page.display()))?);
  let mut encoder = GzEncoder::new(File::create(&dest)?, Compression::best());
  io::copy(&mut reader, &mut encoder)?;
  encoder.finish()?.flush()?;
  Ok(dest)
}
