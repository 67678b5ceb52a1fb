//! Manifest builder: concurrent construction of a content-hash tree

use crate::error::StorageError;
use crate::tree::exclude::ExclusionRules;
use crate::tree::hasher;
use crate::tree::node::{Children, HashNode, Manifest};
use futures::future::{try_join_all, BoxFuture, FutureExt};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Semaphore, SemaphorePermit};
use tracing::{debug, error, info, instrument, trace};

/// Default cap on simultaneously open directory listings and file reads.
pub const DEFAULT_MAX_CONCURRENT_IO: usize = 64;

/// Shared state for one build: exclusion rules, the I/O limiter and counters.
struct WalkContext {
    exclusions: ExclusionRules,
    permits: Semaphore,
    files: AtomicUsize,
    directories: AtomicUsize,
    excluded: AtomicUsize,
    links: AtomicUsize,
}

impl WalkContext {
    async fn permit(&self, path: &Path) -> Result<SemaphorePermit<'_>, StorageError> {
        self.permits.acquire().await.map_err(|_| {
            StorageError::fs(path, io::Error::new(io::ErrorKind::Other, "I/O limiter closed"))
        })
    }
}

/// Builds a [`Manifest`] snapshot of a directory tree.
///
/// Siblings are processed concurrently and directories recurse concurrently;
/// the first failure anywhere in the tree fails the whole build.
pub struct ManifestBuilder {
    root: PathBuf,
    exclusions: ExclusionRules,
    max_concurrent_io: usize,
}

impl ManifestBuilder {
    /// Create a builder for the given root with default exclusions
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            exclusions: ExclusionRules::default(),
            max_concurrent_io: DEFAULT_MAX_CONCURRENT_IO,
        }
    }

    pub fn with_exclusions(mut self, exclusions: ExclusionRules) -> Self {
        self.exclusions = exclusions;
        self
    }

    /// Bound the number of concurrent directory listings and file reads (minimum 1).
    pub fn with_max_concurrent_io(mut self, limit: usize) -> Self {
        self.max_concurrent_io = limit.max(1);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Walk the root and hash every non-excluded regular file.
    #[instrument(skip(self), fields(root = %self.root.display()))]
    pub async fn build(&self) -> Result<Manifest, StorageError> {
        let start = Instant::now();
        info!("Starting manifest build");

        let metadata = tokio::fs::metadata(&self.root)
            .await
            .map_err(|e| StorageError::fs(&self.root, e))?;
        if !metadata.is_dir() {
            return Err(StorageError::fs(
                &self.root,
                io::Error::new(io::ErrorKind::Other, "manifest root is not a directory"),
            ));
        }

        let ctx = Arc::new(WalkContext {
            exclusions: self.exclusions.clone(),
            permits: Semaphore::new(self.max_concurrent_io),
            files: AtomicUsize::new(0),
            directories: AtomicUsize::new(0),
            excluded: AtomicUsize::new(0),
            links: AtomicUsize::new(0),
        });

        let entries = match build_directory(Arc::clone(&ctx), self.root.clone()).await {
            Ok(entries) => entries,
            Err(e) => {
                error!("Manifest build failed: {}", e);
                return Err(e);
            }
        };

        info!(
            files = ctx.files.load(Ordering::Relaxed),
            directories = ctx.directories.load(Ordering::Relaxed),
            excluded = ctx.excluded.load(Ordering::Relaxed),
            links = ctx.links.load(Ordering::Relaxed),
            duration_ms = start.elapsed().as_millis(),
            "Manifest build completed"
        );

        Ok(Manifest::new(entries))
    }
}

/// Build a manifest of `root` with the given exclusion rules.
pub async fn build_manifest(root: &Path, exclusions: &ExclusionRules) -> Result<Manifest, StorageError> {
    ManifestBuilder::new(root)
        .with_exclusions(exclusions.clone())
        .build()
        .await
}

fn build_directory(ctx: Arc<WalkContext>, dir: PathBuf) -> BoxFuture<'static, Result<Children, StorageError>> {
    async move {
        let names = list_directory(&ctx, &dir).await?;

        let tasks = names.into_iter().map(|name| {
            let ctx = Arc::clone(&ctx);
            let path = dir.join(&name);
            async move { build_entry(ctx, name, path).await }
        });

        let children = try_join_all(tasks).await?;
        Ok(children.into_iter().collect())
    }
    .boxed()
}

/// List the non-excluded child names of a directory.
async fn list_directory(ctx: &WalkContext, dir: &Path) -> Result<Vec<String>, StorageError> {
    let _permit = ctx.permit(dir).await?;
    let mut reader = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| StorageError::fs(dir, e))?;

    let mut names = Vec::new();
    while let Some(entry) = reader.next_entry().await.map_err(|e| StorageError::fs(dir, e))? {
        // Manifest keys are UTF-8; an unrepresentable name fails the whole build
        let name = entry.file_name().into_string().map_err(|raw| {
            StorageError::InvalidPath(format!(
                "entry {:?} in {} is not valid UTF-8",
                raw,
                dir.display()
            ))
        })?;
        if ctx.exclusions.is_excluded(&name) {
            trace!(directory = %dir.display(), name = %name, "Excluded entry");
            ctx.excluded.fetch_add(1, Ordering::Relaxed);
            continue;
        }
        names.push(name);
    }
    Ok(names)
}

async fn build_entry(
    ctx: Arc<WalkContext>,
    name: String,
    path: PathBuf,
) -> Result<(String, HashNode), StorageError> {
    let metadata = {
        let _permit = ctx.permit(&path).await?;
        tokio::fs::symlink_metadata(&path)
            .await
            .map_err(|e| StorageError::fs(&path, e))?
    };
    let file_type = metadata.file_type();

    if file_type.is_dir() {
        let children = build_directory(Arc::clone(&ctx), path).await?;
        ctx.directories.fetch_add(1, Ordering::Relaxed);
        return Ok((name, HashNode::Directory(children)));
    }

    // A symlink stands for the regular file it points at
    let hashable = if file_type.is_symlink() {
        link_points_at_file(&ctx, &path).await?
    } else {
        file_type.is_file()
    };
    if !hashable {
        return Err(StorageError::fs(
            &path,
            io::Error::new(io::ErrorKind::Other, "unsupported file type in manifest root"),
        ));
    }

    let hash = {
        let _permit = ctx.permit(&path).await?;
        let blocking_path = path.clone();
        tokio::task::spawn_blocking(move || hasher::hash_file(&blocking_path))
            .await
            .map_err(|e| StorageError::HashComputation {
                path: path.clone(),
                message: format!("hashing task failed: {}", e),
            })??
    };
    trace!(path = %path.display(), content_hash = %hash, "Hashed file");
    ctx.files.fetch_add(1, Ordering::Relaxed);
    Ok((name, HashNode::File(hash)))
}

/// Resolve a symlink. Dangling links and links to directories fail the build.
async fn link_points_at_file(ctx: &WalkContext, path: &Path) -> Result<bool, StorageError> {
    let target = {
        let _permit = ctx.permit(path).await?;
        tokio::fs::metadata(path)
            .await
            .map_err(|e| StorageError::fs(path, e))?
    };
    if target.is_dir() {
        return Err(StorageError::fs(
            path,
            io::Error::new(io::ErrorKind::Other, "symbolic link to a directory is not supported"),
        ));
    }
    debug!(path = %path.display(), "Following symlink to file");
    ctx.links.fetch_add(1, Ordering::Relaxed);
    Ok(target.is_file())
}
