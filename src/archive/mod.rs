//! Diff archives
//!
//! A diff archive is a gzip-compressed tar of the files and directories named
//! by a [`DiffTree`](crate::tree::DiffTree), stored at their relative paths.

pub mod applier;
pub mod builder;

pub use applier::{apply_archive, ApplySummary, ArchiveApplier};
pub use builder::{build_archive, ArchiveBuilder};

use crate::error::StorageError;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempPath;
use tracing::debug;

/// File suffix used for archives written by this crate.
pub const ARCHIVE_SUFFIX: &str = ".tar.gz";

/// Entry counts recorded while building an archive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArchiveStats {
    pub files: usize,
    pub directories: usize,
}

#[derive(Debug)]
enum Location {
    /// Removed when the handle is dropped
    Temporary(TempPath),
    Persisted(PathBuf),
}

/// A complete archive on disk.
///
/// Handles are only created for fully written archives. A temporary archive is
/// deleted when its handle is dropped unless it is persisted first.
#[derive(Debug)]
pub struct ArchiveHandle {
    location: Location,
    size_bytes: u64,
    stats: Option<ArchiveStats>,
}

impl ArchiveHandle {
    pub(crate) fn temporary(path: TempPath, size_bytes: u64, stats: Option<ArchiveStats>) -> Self {
        Self {
            location: Location::Temporary(path),
            size_bytes,
            stats,
        }
    }

    /// Refer to an existing archive file. The file is left in place on drop.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let metadata = std::fs::metadata(&path).map_err(|e| StorageError::fs(&path, e))?;
        if !metadata.is_file() {
            return Err(StorageError::Archive(format!("{:?} is not a file", path)));
        }
        Ok(Self {
            location: Location::Persisted(path),
            size_bytes: metadata.len(),
            stats: None,
        })
    }

    /// Store received archive bytes in a temporary file under `dir`.
    pub fn from_bytes(bytes: &[u8], dir: &Path) -> Result<Self, StorageError> {
        std::fs::create_dir_all(dir).map_err(|e| StorageError::fs(dir, e))?;
        let mut file = tempfile::Builder::new()
            .prefix(".updraft-download-")
            .suffix(ARCHIVE_SUFFIX)
            .tempfile_in(dir)
            .map_err(|e| StorageError::fs(dir, e))?;
        file.write_all(bytes)
            .and_then(|_| file.as_file().sync_all())
            .map_err(|e| StorageError::fs(file.path(), e))?;
        Ok(Self::temporary(file.into_temp_path(), bytes.len() as u64, None))
    }

    pub fn path(&self) -> &Path {
        match &self.location {
            Location::Temporary(path) => path.as_ref(),
            Location::Persisted(path) => path.as_path(),
        }
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    /// Entry counts, known only for archives built in this process.
    pub fn stats(&self) -> Option<ArchiveStats> {
        self.stats
    }

    pub fn is_temporary(&self) -> bool {
        matches!(self.location, Location::Temporary(_))
    }

    /// Move the archive to `dest` and keep it after the handle is dropped.
    ///
    /// A rename is tried first. When that fails (for instance across
    /// filesystems) the bytes are copied beside `dest` and renamed into place.
    pub fn persist(self, dest: &Path) -> Result<ArchiveHandle, StorageError> {
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StorageError::fs(parent, e))?;
        }
        match self.location {
            Location::Temporary(temp) => {
                if let Err(e) = temp.persist(dest) {
                    debug!(dest = %dest.display(), error = %e.error, "Rename failed, copying archive");
                    copy_into_place(&e.path, dest)?;
                }
            }
            Location::Persisted(path) => {
                if let Err(e) = std::fs::rename(&path, dest) {
                    debug!(dest = %dest.display(), error = %e, "Rename failed, copying archive");
                    copy_into_place(&path, dest)?;
                    std::fs::remove_file(&path).map_err(|e| StorageError::fs(&path, e))?;
                }
            }
        }
        Ok(ArchiveHandle {
            location: Location::Persisted(dest.to_path_buf()),
            size_bytes: self.size_bytes,
            stats: self.stats,
        })
    }

    pub async fn read_bytes(&self) -> Result<Vec<u8>, StorageError> {
        tokio::fs::read(self.path())
            .await
            .map_err(|e| StorageError::fs(self.path(), e))
    }
}

/// Copy `src` to a temporary file in `dest`'s directory, then rename it over `dest`.
fn copy_into_place(src: &Path, dest: &Path) -> Result<(), StorageError> {
    let dir = match dest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut staged = tempfile::Builder::new()
        .prefix(".updraft-")
        .suffix(ARCHIVE_SUFFIX)
        .tempfile_in(dir)
        .map_err(|e| StorageError::fs(dir, e))?;
    let mut source = std::fs::File::open(src).map_err(|e| StorageError::fs(src, e))?;
    std::io::copy(&mut source, staged.as_file_mut()).map_err(|e| StorageError::fs(staged.path(), e))?;
    staged
        .as_file()
        .sync_all()
        .map_err(|e| StorageError::fs(staged.path(), e))?;
    staged
        .persist(dest)
        .map_err(|e| StorageError::fs(dest, e.error))?;
    Ok(())
}
