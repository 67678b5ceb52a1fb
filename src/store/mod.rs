//! Manifest Store
//!
//! Holds the latest master manifest snapshot for each application. A record
//! is replaced wholesale on every recompute and never expires.

pub mod persistence;

pub use persistence::SledManifestStore;

use crate::error::StorageError;
use crate::tree::node::Manifest;
use crate::types::ContentHash;
use serde::{Deserialize, Serialize};

/// ManifestRecord: one application's stored master snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestRecord {
    pub app_id: String,
    /// Manifest in its wire JSON form
    pub manifest_json: String,
    /// BLAKE3 of `manifest_json`
    pub digest: ContentHash,
    pub computed_at_ms: i64,
    pub file_count: usize,
}

impl ManifestRecord {
    /// Snapshot `manifest` for `app_id`, stamped with the current time.
    pub fn from_manifest(app_id: &str, manifest: &Manifest) -> Result<Self, StorageError> {
        Ok(ManifestRecord {
            app_id: app_id.to_string(),
            manifest_json: manifest.to_json()?,
            digest: manifest.digest()?,
            computed_at_ms: chrono::Utc::now().timestamp_millis(),
            file_count: manifest.file_count(),
        })
    }

    pub fn manifest(&self) -> Result<Manifest, StorageError> {
        Manifest::from_json(&self.manifest_json)
    }
}

/// Manifest Store interface
pub trait ManifestStore: Send + Sync {
    fn get(&self, app_id: &str) -> Result<Option<ManifestRecord>, StorageError>;

    /// Insert or replace the record for `record.app_id`.
    fn put(&self, record: &ManifestRecord) -> Result<(), StorageError>;

    fn remove(&self, app_id: &str) -> Result<bool, StorageError>;

    fn list_app_ids(&self) -> Result<Vec<String>, StorageError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::node::{file_node, Children};

    #[test]
    fn test_record_from_manifest() {
        let mut entries = Children::new();
        entries.insert("a.txt".to_string(), file_node([1u8; 32]));
        let manifest = Manifest::new(entries);

        let record = ManifestRecord::from_manifest("editor", &manifest).unwrap();
        assert_eq!(record.app_id, "editor");
        assert_eq!(record.file_count, 1);
        assert_eq!(record.digest, manifest.digest().unwrap());
        assert_eq!(record.manifest().unwrap(), manifest);
        assert!(record.computed_at_ms > 0);
    }
}
