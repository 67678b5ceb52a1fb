//! Archive builder: package the entries named by a diff tree

use crate::archive::{ArchiveHandle, ArchiveStats, ARCHIVE_SUFFIX};
use crate::error::StorageError;
use crate::tree::exclude::ExclusionRules;
use crate::tree::node::{Children, DiffTree, HashNode};
use crate::tree::path::validate_entry_name;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tempfile::NamedTempFile;
use tracing::{debug, error, info, instrument, trace};

/// Builds a gzip tar archive of diff entries read from a source root.
///
/// The archive is written to a private temporary file in the staging
/// directory and handed out only once it is complete.
pub struct ArchiveBuilder {
    source_root: PathBuf,
    staging_dir: PathBuf,
    exclusions: ExclusionRules,
}

impl ArchiveBuilder {
    pub fn new(source_root: impl Into<PathBuf>, staging_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_root: source_root.into(),
            staging_dir: staging_dir.into(),
            exclusions: ExclusionRules::default(),
        }
    }

    pub fn with_exclusions(mut self, exclusions: ExclusionRules) -> Self {
        self.exclusions = exclusions;
        self
    }

    /// Package every entry of `diff`. Any failure discards the partial archive.
    #[instrument(skip(self, diff), fields(source = %self.source_root.display(), files = diff.file_count()))]
    pub async fn build(&self, diff: &DiffTree) -> Result<ArchiveHandle, StorageError> {
        let start = Instant::now();
        info!("Starting archive build");

        let entries = diff.entries().clone();
        let source_root = self.source_root.clone();
        let staging_dir = self.staging_dir.clone();
        let exclusions = self.exclusions.clone();

        let result = tokio::task::spawn_blocking(move || {
            write_archive(&entries, &source_root, &staging_dir, &exclusions)
        })
        .await
        .map_err(|e| StorageError::Archive(format!("archive task failed: {}", e)))?;

        match result {
            Ok(handle) => {
                info!(
                    size_bytes = handle.size_bytes(),
                    duration_ms = start.elapsed().as_millis(),
                    "Archive build completed"
                );
                Ok(handle)
            }
            Err(e) => {
                error!("Archive build failed: {}", e);
                Err(e)
            }
        }
    }
}

/// Build an archive of `diff` from `source_root` into `staging_dir`.
pub async fn build_archive(
    diff: &DiffTree,
    source_root: &Path,
    staging_dir: &Path,
    exclusions: &ExclusionRules,
) -> Result<ArchiveHandle, StorageError> {
    ArchiveBuilder::new(source_root, staging_dir)
        .with_exclusions(exclusions.clone())
        .build(diff)
        .await
}

fn write_archive(
    entries: &Children,
    source_root: &Path,
    staging_dir: &Path,
    exclusions: &ExclusionRules,
) -> Result<ArchiveHandle, StorageError> {
    std::fs::create_dir_all(staging_dir).map_err(|e| StorageError::fs(staging_dir, e))?;

    // Dropping the temp file on any early return removes the partial archive
    let temp = tempfile::Builder::new()
        .prefix(".updraft-")
        .suffix(ARCHIVE_SUFFIX)
        .tempfile_in(staging_dir)
        .map_err(|e| StorageError::fs(staging_dir, e))?;

    let encoder = GzEncoder::new(temp, Compression::default());
    let mut builder = tar::Builder::new(encoder);
    builder.mode(tar::HeaderMode::Deterministic);
    builder.follow_symlinks(false);

    let mut stats = ArchiveStats::default();
    append_children(&mut builder, entries, source_root, Path::new(""), exclusions, &mut stats)?;

    let encoder = builder
        .into_inner()
        .map_err(|e| StorageError::Archive(format!("failed to finish tar stream: {}", e)))?;
    let mut temp: NamedTempFile = encoder
        .finish()
        .map_err(|e| StorageError::Archive(format!("failed to finish gzip stream: {}", e)))?;
    temp.flush().map_err(|e| StorageError::fs(temp.path(), e))?;
    temp.as_file()
        .sync_all()
        .map_err(|e| StorageError::fs(temp.path(), e))?;
    let size_bytes = temp
        .as_file()
        .metadata()
        .map_err(|e| StorageError::fs(temp.path(), e))?
        .len();

    debug!(files = stats.files, directories = stats.directories, "Archive written");
    Ok(ArchiveHandle::temporary(temp.into_temp_path(), size_bytes, Some(stats)))
}

fn append_children<W: Write>(
    builder: &mut tar::Builder<W>,
    children: &Children,
    source_root: &Path,
    relative: &Path,
    exclusions: &ExclusionRules,
    stats: &mut ArchiveStats,
) -> Result<(), StorageError> {
    for (name, node) in children {
        validate_entry_name(name)?;
        if exclusions.is_excluded(name) {
            return Err(StorageError::Archive(format!(
                "excluded entry {:?} cannot be archived",
                relative.join(name)
            )));
        }

        let entry_path = relative.join(name);
        let source_path = source_root.join(&entry_path);

        match node {
            HashNode::File(_) => {
                // Symlinked files are archived as the regular file they point at
                let metadata =
                    std::fs::metadata(&source_path).map_err(|e| StorageError::fs(&source_path, e))?;
                if !metadata.is_file() {
                    return Err(StorageError::Archive(format!(
                        "{:?} is not a regular file in the source tree",
                        entry_path
                    )));
                }
                let mut file =
                    File::open(&source_path).map_err(|e| StorageError::fs(&source_path, e))?;
                builder.append_file(&entry_path, &mut file).map_err(|e| {
                    StorageError::Archive(format!("failed to add {:?}: {}", entry_path, e))
                })?;
                trace!(path = %entry_path.display(), "Added file");
                stats.files += 1;
            }
            HashNode::Directory(grandchildren) => {
                let metadata = std::fs::symlink_metadata(&source_path)
                    .map_err(|e| StorageError::fs(&source_path, e))?;
                if !metadata.is_dir() {
                    return Err(StorageError::Archive(format!(
                        "{:?} is not a directory in the source tree",
                        entry_path
                    )));
                }
                builder.append_dir(&entry_path, &source_path).map_err(|e| {
                    StorageError::Archive(format!("failed to add {:?}: {}", entry_path, e))
                })?;
                stats.directories += 1;
                append_children(builder, grandchildren, source_root, &entry_path, exclusions, stats)?;
            }
        }
    }
    Ok(())
}
