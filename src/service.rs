//! Update Service
//!
//! Server-side boundary operations: recompute and store an application's
//! master manifest, diff a client manifest against it, package a diff into
//! an archive, and report the master digest.

use crate::archive::{ArchiveBuilder, ArchiveHandle};
use crate::concurrency::AppLockManager;
use crate::config::UpdraftConfig;
use crate::error::{ApiError, StorageError};
use crate::store::{ManifestRecord, ManifestStore, SledManifestStore};
use crate::tree::builder::DEFAULT_MAX_CONCURRENT_IO;
use crate::tree::exclude::ExclusionRules;
use crate::tree::node::{DiffTree, Manifest};
use crate::tree::path::validate_entry_name;
use crate::tree::{diff, ManifestBuilder};
use crate::types::ContentHash;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Structured handler response: `{"status":"OK"}` or `{"status":"error","err":...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub err: Option<String>,
    /// Master manifest digest, set by the checksum handler
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
}

impl StatusResponse {
    pub const OK: &'static str = "OK";
    pub const ERROR: &'static str = "error";

    pub fn ok() -> Self {
        Self {
            status: Self::OK.to_string(),
            err: None,
            checksum: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: Self::ERROR.to_string(),
            err: Some(message.into()),
            checksum: None,
        }
    }

    pub fn with_checksum(mut self, checksum: &ContentHash) -> Self {
        self.checksum = Some(checksum.to_hex());
        self
    }

    pub fn is_ok(&self) -> bool {
        self.status == Self::OK
    }

    /// Convert a service result into a response instead of failing the handler.
    pub fn from_result<T>(result: &Result<T, ApiError>) -> Self {
        match result {
            Ok(_) => Self::ok(),
            Err(e) => Self::error(e.to_string()),
        }
    }

    /// Error responses become `ApiError::Network` on the receiving side.
    pub fn into_result(self) -> Result<Self, ApiError> {
        if self.is_ok() {
            Ok(self)
        } else {
            Err(ApiError::Network(
                self.err.unwrap_or_else(|| format!("server reported status {:?}", self.status)),
            ))
        }
    }
}

/// Outcome of one master manifest recompute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestSummary {
    pub app_id: String,
    pub digest: ContentHash,
    pub file_count: usize,
    pub computed_at_ms: i64,
}

impl From<&ManifestRecord> for ManifestSummary {
    fn from(record: &ManifestRecord) -> Self {
        ManifestSummary {
            app_id: record.app_id.clone(),
            digest: record.digest,
            file_count: record.file_count,
            computed_at_ms: record.computed_at_ms,
        }
    }
}

/// Resolves an application id to its master root.
///
/// Explicit entries win; otherwise the root is `<masters_dir>/<app_id>`.
#[derive(Debug, Clone, Default)]
pub struct MasterRoots {
    masters_dir: PathBuf,
    explicit: HashMap<String, PathBuf>,
}

impl MasterRoots {
    pub fn new(masters_dir: impl Into<PathBuf>) -> Self {
        Self {
            masters_dir: masters_dir.into(),
            explicit: HashMap::new(),
        }
    }

    pub fn with_app(mut self, app_id: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        self.explicit.insert(app_id.into(), root.into());
        self
    }

    pub fn resolve(&self, app_id: &str) -> Result<PathBuf, ApiError> {
        validate_entry_name(app_id)
            .map_err(|_| ApiError::UnknownApplication(app_id.to_string()))?;
        if let Some(root) = self.explicit.get(app_id) {
            return Ok(root.clone());
        }
        let root = self.masters_dir.join(app_id);
        if !root.is_dir() {
            return Err(ApiError::UnknownApplication(app_id.to_string()));
        }
        Ok(root)
    }
}

/// Update service over a manifest store.
pub struct UpdateService {
    store: Arc<dyn ManifestStore>,
    roots: MasterRoots,
    staging_dir: PathBuf,
    exclusions: ExclusionRules,
    max_concurrent_io: usize,
    /// One recompute in flight per application
    lock_manager: AppLockManager,
}

impl UpdateService {
    pub fn new(store: Arc<dyn ManifestStore>, roots: MasterRoots, staging_dir: impl Into<PathBuf>) -> Self {
        Self {
            store,
            roots,
            staging_dir: staging_dir.into(),
            exclusions: ExclusionRules::default(),
            max_concurrent_io: DEFAULT_MAX_CONCURRENT_IO,
            lock_manager: AppLockManager::new(),
        }
    }

    pub fn with_exclusions(mut self, exclusions: ExclusionRules) -> Self {
        self.exclusions = exclusions;
        self
    }

    pub fn with_max_concurrent_io(mut self, limit: usize) -> Self {
        self.max_concurrent_io = limit.max(1);
        self
    }

    /// Open the configured sled store and master roots.
    pub fn from_config(config: &UpdraftConfig) -> Result<Self, ApiError> {
        let store = SledManifestStore::new(&config.server.store_path)?;
        let mut roots = MasterRoots::new(&config.server.masters_dir);
        for (app_id, app) in &config.server.apps {
            roots = roots.with_app(app_id.clone(), app.master_root.clone());
        }
        Ok(Self::new(Arc::new(store), roots, &config.server.staging_dir)
            .with_exclusions(config.manifest.exclusions())
            .with_max_concurrent_io(config.manifest.max_concurrent_io))
    }

    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    pub fn master_root(&self, app_id: &str) -> Result<PathBuf, ApiError> {
        self.roots.resolve(app_id)
    }

    /// Rebuild the master manifest for `app_id` and replace its stored snapshot.
    #[instrument(skip(self))]
    pub async fn recompute_manifest(&self, app_id: &str) -> Result<ManifestSummary, ApiError> {
        let root = self.roots.resolve(app_id)?;

        let gate = self.lock_manager.get_lock(app_id);
        let _guard = gate.lock().await;

        let manifest = ManifestBuilder::new(&root)
            .with_exclusions(self.exclusions.clone())
            .with_max_concurrent_io(self.max_concurrent_io)
            .build()
            .await?;

        let record = ManifestRecord::from_manifest(app_id, &manifest)?;
        self.store.put(&record)?;

        info!(
            app_id = %app_id,
            digest = %record.digest,
            file_count = record.file_count,
            "Master manifest recomputed"
        );
        Ok(ManifestSummary::from(&record))
    }

    /// Diff the stored master snapshot against a client manifest.
    #[instrument(skip(self, local), fields(local_files = local.file_count()))]
    pub async fn compare_manifest(&self, app_id: &str, local: &Manifest) -> Result<DiffTree, ApiError> {
        let master = self.load_master(app_id)?.manifest()?;
        let result = diff(&master, local);
        info!(app_id = %app_id, files = result.file_count(), "Compared manifests");
        Ok(result)
    }

    /// JSON-in, JSON-out form of [`compare_manifest`](Self::compare_manifest).
    pub async fn compare_manifest_json(&self, app_id: &str, local_json: &str) -> Result<String, ApiError> {
        let local = Manifest::from_json(local_json).map_err(|e| ApiError::InvalidManifest(e.to_string()))?;
        let result = self.compare_manifest(app_id, &local).await?;
        Ok(result.to_json()?)
    }

    /// Package the files named by `diff` from the master root.
    #[instrument(skip(self, diff), fields(files = diff.file_count()))]
    pub async fn fetch_diff_archive(&self, app_id: &str, diff: &DiffTree) -> Result<ArchiveHandle, ApiError> {
        let root = self.roots.resolve(app_id)?;
        let archive = ArchiveBuilder::new(root, self.staging_dir.join(app_id))
            .with_exclusions(self.exclusions.clone())
            .build(diff)
            .await?;
        Ok(archive)
    }

    pub async fn manifest_digest(&self, app_id: &str) -> Result<ContentHash, ApiError> {
        Ok(self.load_master(app_id)?.digest)
    }

    /// Latest stored snapshot for `app_id`.
    pub fn manifest_record(&self, app_id: &str) -> Result<ManifestRecord, ApiError> {
        self.load_master(app_id)
    }

    pub fn list_applications(&self) -> Result<Vec<String>, ApiError> {
        Ok(self.store.list_app_ids()?)
    }

    fn load_master(&self, app_id: &str) -> Result<ManifestRecord, ApiError> {
        validate_entry_name(app_id)
            .map_err(|_| ApiError::UnknownApplication(app_id.to_string()))?;
        match self.store.get(app_id) {
            Ok(Some(record)) => Ok(record),
            Ok(None) => Err(ApiError::NotFound(app_id.to_string())),
            Err(StorageError::Serialization(message)) => {
                warn!(app_id = %app_id, "Stored manifest record is unreadable: {}", message);
                Err(ApiError::InvalidManifest(message))
            }
            Err(e) => Err(e.into()),
        }
    }
}
