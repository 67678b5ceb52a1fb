//! Persistence layer for the Manifest Store

use crate::error::StorageError;
use crate::store::{ManifestRecord, ManifestStore};
use std::path::Path;
use tracing::debug;

const MANIFEST_TREE: &str = "manifests";

/// Sled-based implementation of ManifestStore
///
/// Records are bincode-encoded in a dedicated tree keyed by application id.
pub struct SledManifestStore {
    db: sled::Db,
    manifests: sled::Tree,
}

impl SledManifestStore {
    /// Open (or create) a store at the given directory.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let path = path.as_ref();
        let db = sled::open(path)
            .map_err(|e| StorageError::Store(format!("Failed to open sled database at {:?}: {}", path, e)))?;
        let manifests = db.open_tree(MANIFEST_TREE)?;
        Ok(Self { db, manifests })
    }

    /// In-memory store that is discarded on drop.
    pub fn temporary() -> Result<Self, StorageError> {
        let db = sled::Config::new().temporary(true).open()?;
        let manifests = db.open_tree(MANIFEST_TREE)?;
        Ok(Self { db, manifests })
    }

    /// Flush all pending writes to disk
    pub fn flush(&self) -> Result<(), StorageError> {
        self.db.flush()?;
        Ok(())
    }
}

fn decode(value: &[u8]) -> Result<ManifestRecord, StorageError> {
    bincode::deserialize(value)
        .map_err(|e| StorageError::Serialization(format!("Failed to deserialize manifest record: {}", e)))
}

impl ManifestStore for SledManifestStore {
    fn get(&self, app_id: &str) -> Result<Option<ManifestRecord>, StorageError> {
        match self.manifests.get(app_id.as_bytes())? {
            Some(value) => Ok(Some(decode(&value)?)),
            None => Ok(None),
        }
    }

    fn put(&self, record: &ManifestRecord) -> Result<(), StorageError> {
        let value = bincode::serialize(record)
            .map_err(|e| StorageError::Serialization(format!("Failed to serialize manifest record: {}", e)))?;
        // Single-key insert: readers see the old or the new record, never a mix
        self.manifests.insert(record.app_id.as_bytes(), value)?;
        self.manifests.flush()?;
        debug!(app_id = %record.app_id, digest = %record.digest, "Stored manifest record");
        Ok(())
    }

    fn remove(&self, app_id: &str) -> Result<bool, StorageError> {
        Ok(self.manifests.remove(app_id.as_bytes())?.is_some())
    }

    fn list_app_ids(&self) -> Result<Vec<String>, StorageError> {
        let mut ids = Vec::new();
        for key in self.manifests.iter().keys() {
            let key = key?;
            ids.push(String::from_utf8_lossy(&key).into_owned());
        }
        Ok(ids)
    }
}
