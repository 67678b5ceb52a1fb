//! Archive applier: overlay an archive onto an install root
//!
//! Entries are written at their relative paths, creating parent directories
//! as needed and overwriting existing files. Nothing outside the archive is
//! touched or removed.

use crate::archive::ArchiveHandle;
use crate::error::StorageError;
use crate::tree::exclude::ExclusionRules;
use crate::tree::path::relative_segments;
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info, instrument, trace};

/// Counts of entries written by one apply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplySummary {
    pub files: usize,
    pub directories: usize,
}

pub struct ArchiveApplier {
    target_root: PathBuf,
    exclusions: ExclusionRules,
}

impl ArchiveApplier {
    pub fn new(target_root: impl Into<PathBuf>) -> Self {
        Self {
            target_root: target_root.into(),
            exclusions: ExclusionRules::default(),
        }
    }

    pub fn with_exclusions(mut self, exclusions: ExclusionRules) -> Self {
        self.exclusions = exclusions;
        self
    }

    /// Extract every entry of `archive` under the target root.
    ///
    /// Entries with absolute paths, `..` components or excluded names abort
    /// the apply. Files already written stay in place on failure.
    #[instrument(skip(self, archive), fields(target = %self.target_root.display(), archive = %archive.path().display()))]
    pub async fn apply(&self, archive: &ArchiveHandle) -> Result<ApplySummary, StorageError> {
        let start = Instant::now();
        info!(size_bytes = archive.size_bytes(), "Applying archive");

        let archive_path = archive.path().to_path_buf();
        let target_root = self.target_root.clone();
        let exclusions = self.exclusions.clone();

        let result = tokio::task::spawn_blocking(move || {
            let file = File::open(&archive_path).map_err(|e| StorageError::fs(&archive_path, e))?;
            unpack_into(BufReader::new(file), &target_root, &exclusions)
        })
        .await
        .map_err(|e| StorageError::Archive(format!("apply task failed: {}", e)))?;

        match result {
            Ok(summary) => {
                info!(
                    files = summary.files,
                    directories = summary.directories,
                    duration_ms = start.elapsed().as_millis(),
                    "Archive applied"
                );
                Ok(summary)
            }
            Err(e) => {
                error!("Archive apply failed: {}", e);
                Err(e)
            }
        }
    }
}

/// Apply `archive` onto `target_root`.
pub async fn apply_archive(
    archive: &ArchiveHandle,
    target_root: &Path,
    exclusions: &ExclusionRules,
) -> Result<ApplySummary, StorageError> {
    ArchiveApplier::new(target_root)
        .with_exclusions(exclusions.clone())
        .apply(archive)
        .await
}

fn unpack_into<R: Read>(
    reader: R,
    target_root: &Path,
    exclusions: &ExclusionRules,
) -> Result<ApplySummary, StorageError> {
    std::fs::create_dir_all(target_root).map_err(|e| StorageError::fs(target_root, e))?;

    let mut archive = tar::Archive::new(GzDecoder::new(reader));
    archive.set_preserve_permissions(true);
    archive.set_overwrite(true);

    let entries = archive
        .entries()
        .map_err(|e| StorageError::Archive(format!("unreadable archive: {}", e)))?;

    let mut summary = ApplySummary::default();
    for entry in entries {
        let mut entry =
            entry.map_err(|e| StorageError::Archive(format!("corrupt archive entry: {}", e)))?;
        let entry_path = entry
            .path()
            .map_err(|e| StorageError::Archive(format!("unreadable entry path: {}", e)))?
            .into_owned();

        let segments = relative_segments(&entry_path)?;
        if segments.is_empty() {
            continue;
        }
        if exclusions.excludes_any(segments.iter().map(String::as_str)) {
            return Err(StorageError::Archive(format!(
                "archive entry {:?} has an excluded name",
                entry_path
            )));
        }
        let dest = segments.iter().fold(target_root.to_path_buf(), |path, s| path.join(s));

        match entry.header().entry_type() {
            tar::EntryType::Directory => {
                ensure_directory_chain(target_root, &segments)?;
                summary.directories += 1;
            }
            tar::EntryType::Regular | tar::EntryType::Continuous => {
                ensure_directory_chain(target_root, &segments[..segments.len() - 1])?;
                if let Ok(existing) = std::fs::symlink_metadata(&dest) {
                    if existing.is_dir() {
                        return Err(StorageError::Archive(format!(
                            "cannot replace directory {:?} with a file",
                            dest
                        )));
                    }
                }
                entry
                    .unpack(&dest)
                    .map_err(|e| StorageError::fs(&dest, e))?;
                trace!(path = %dest.display(), "Wrote file");
                summary.files += 1;
            }
            other => {
                return Err(StorageError::Archive(format!(
                    "unsupported entry type {:?} for {:?}",
                    other, entry_path
                )));
            }
        }
    }

    Ok(summary)
}

/// Make every prefix of `segments` under `root` a real directory.
///
/// A file or symlink in the way is replaced by a directory.
fn ensure_directory_chain(root: &Path, segments: &[String]) -> Result<(), StorageError> {
    let mut current = root.to_path_buf();
    for segment in segments {
        current.push(segment);
        match std::fs::symlink_metadata(&current) {
            Ok(metadata) if metadata.is_dir() => continue,
            Ok(_) => {
                debug!(path = %current.display(), "Replacing non-directory with directory");
                std::fs::remove_file(&current).map_err(|e| StorageError::fs(&current, e))?;
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(StorageError::fs(&current, e)),
        }
        std::fs::create_dir(&current).map_err(|e| StorageError::fs(&current, e))?;
    }
    Ok(())
}
