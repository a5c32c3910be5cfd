//! Archive stager: unpack the input bundle into a private temporary directory.
//!
//! Entry names are validated before anything is written: absolute paths,
//! drive prefixes and `..` segments are rejected.

use std::fs::{self, File};
use std::io;
use std::path::{Component, Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, info, warn};
use zip::ZipArchive;

use crate::error::ArchiveError;

/// An extracted bundle. The directory is removed on [`StagedBundle::release`] or drop.
#[derive(Debug)]
pub struct StagedBundle {
    dir: TempDir,
    entries: usize,
}

impl StagedBundle {
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Number of files written.
    pub fn entries(&self) -> usize {
        self.entries
    }

    /// Delete the staging directory now, reporting failures.
    pub fn release(self) -> io::Result<()> {
        let path = self.dir.path().to_path_buf();
        self.dir.close()?;
        debug!(path = %path.display(), "[STAGE] Released staging directory");
        Ok(())
    }
}

/// Extract every entry of the zip bundle at `bundle` into a new temp directory.
pub fn stage(bundle: &Path) -> Result<StagedBundle, ArchiveError> {
    let file = File::open(bundle).map_err(|source| ArchiveError::Open {
        path: bundle.to_path_buf(),
        source,
    })?;
    let mut archive = ZipArchive::new(file).map_err(|source| ArchiveError::Corrupt {
        path: bundle.to_path_buf(),
        source,
    })?;
    let dir = tempfile::Builder::new()
        .prefix("cloudgraph-")
        .tempdir()
        .map_err(ArchiveError::TempDir)?;
    info!(bundle = %bundle.display(), staging = %dir.path().display(), entries = archive.len(), "[STAGE] Extracting bundle");

    let mut written = 0;
    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .map_err(|source| ArchiveError::Entry { index, source })?;
        if entry.is_dir() && is_root_entry(entry.name()) {
            debug!(entry = %entry.name(), "[STAGE] Skipping root directory entry");
            continue;
        }
        let relative = sanitize_entry_name(entry.name())?;
        let out_path = dir.path().join(&relative);

        if entry.is_dir() {
            fs::create_dir_all(&out_path).map_err(|source| ArchiveError::Write {
                path: out_path.clone(),
                source,
            })?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent).map_err(|source| ArchiveError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let mut out = File::create(&out_path).map_err(|source| ArchiveError::Write {
            path: out_path.clone(),
            source,
        })?;
        io::copy(&mut entry, &mut out).map_err(|source| ArchiveError::Write {
            path: out_path.clone(),
            source,
        })?;
        debug!(entry = %relative.display(), size = entry.size(), "[STAGE] Extracted entry");
        written += 1;
    }

    if written == 0 {
        warn!(bundle = %bundle.display(), "[STAGE] Bundle contains no files");
    }
    Ok(StagedBundle { dir, entries: written })
}

/// Relative, traversal-free form of an archive entry name.
pub fn sanitize_entry_name(name: &str) -> Result<PathBuf, ArchiveError> {
    let unsafe_entry = || ArchiveError::UnsafeEntry {
        name: name.to_string(),
    };
    // Zip names use `/`, but some writers emit `\`.
    let normalized = name.replace('\\', "/");
    let mut relative = PathBuf::new();
    for component in Path::new(&normalized).components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(unsafe_entry())
            }
        }
    }
    if relative.as_os_str().is_empty() {
        return Err(unsafe_entry());
    }
    Ok(relative)
}

/// `./`-style names that denote the archive root itself.
fn is_root_entry(name: &str) -> bool {
    name.replace('\\', "/")
        .split('/')
        .all(|part| part.is_empty() || part == ".")
}
