//! Error types for the updraft manifest, diff and archive engine.

use std::path::PathBuf;
use thiserror::Error;

/// Engine-level errors: filesystem, hashing, archives and the snapshot store.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Filesystem error at {path:?}: {source}")]
    FileSystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to hash {path:?}: {message}")]
    HashComputation { path: PathBuf, message: String },

    #[error("Archive error: {0}")]
    Archive(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl StorageError {
    /// Wrap an I/O failure together with the path it happened on.
    pub fn fs(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StorageError::FileSystem {
            path: path.into(),
            source,
        }
    }
}

impl From<sled::Error> for StorageError {
    fn from(err: sled::Error) -> Self {
        StorageError::Store(err.to_string())
    }
}

/// Service and client errors surfaced to the orchestrator and the CLI.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("No manifest recorded for application '{0}'. Recompute the master manifest first.")]
    NotFound(String),

    #[error("Unknown application '{0}'")]
    UnknownApplication(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid manifest: {0}")]
    InvalidManifest(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Network(format!("Request timed out: {}", err))
        } else if err.is_connect() {
            ApiError::Network(format!("Connection failed: {}", err))
        } else {
            ApiError::Network(err.to_string())
        }
    }
}
