//! Configuration System
//!
//! Layered configuration: built-in defaults, the global config file, workspace
//! config files and `UPDRAFT__SECTION__KEY` environment variables, in
//! increasing precedence. Tests included.

use crate::logging::LoggingConfig;
use crate::tree::builder::DEFAULT_MAX_CONCURRENT_IO;
use crate::tree::exclude::{ExclusionRules, DEFAULT_EXCLUDED_SUFFIX};
use crate::tree::path::validate_entry_name;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdraftConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub client: ClientConfig,

    #[serde(default)]
    pub manifest: ManifestConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server side: where master trees live and where snapshots are kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Master roots default to `<masters_dir>/<app_id>`
    #[serde(default = "default_masters_dir")]
    pub masters_dir: PathBuf,

    /// Explicit per-application master roots
    #[serde(default)]
    pub apps: HashMap<String, AppConfig>,

    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,

    /// Archives are built here before being served
    #[serde(default = "default_staging_dir")]
    pub staging_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    pub master_root: PathBuf,
}

/// Client side: which application to update and how to reach the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub app_id: Option<String>,

    #[serde(default)]
    pub install_root: Option<PathBuf>,

    /// Absent means the update service runs in-process
    #[serde(default)]
    pub server_url: Option<String>,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestConfig {
    #[serde(default = "default_exclude_suffixes")]
    pub exclude_suffixes: Vec<String>,

    #[serde(default)]
    pub exclude_names: Vec<String>,

    #[serde(default = "default_max_concurrent_io")]
    pub max_concurrent_io: usize,
}

impl ManifestConfig {
    pub fn exclusions(&self) -> ExclusionRules {
        ExclusionRules::new(self.exclude_suffixes.clone(), self.exclude_names.clone())
    }
}

/// Base directory for default data paths.
pub fn default_data_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "updraft")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".updraft"))
}

fn default_masters_dir() -> PathBuf {
    default_data_dir().join("masters")
}

fn default_store_path() -> PathBuf {
    default_data_dir().join("store")
}

fn default_staging_dir() -> PathBuf {
    default_data_dir().join("staging")
}

fn default_download_dir() -> PathBuf {
    default_data_dir().join("downloads")
}

fn default_request_timeout_secs() -> u64 {
    120
}

fn default_exclude_suffixes() -> Vec<String> {
    vec![DEFAULT_EXCLUDED_SUFFIX.to_string()]
}

fn default_max_concurrent_io() -> usize {
    DEFAULT_MAX_CONCURRENT_IO
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            masters_dir: default_masters_dir(),
            apps: HashMap::new(),
            store_path: default_store_path(),
            staging_dir: default_staging_dir(),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            app_id: None,
            install_root: None,
            server_url: None,
            request_timeout_secs: default_request_timeout_secs(),
            download_dir: default_download_dir(),
        }
    }
}

impl Default for ManifestConfig {
    fn default() -> Self {
        Self {
            exclude_suffixes: default_exclude_suffixes(),
            exclude_names: Vec::new(),
            max_concurrent_io: default_max_concurrent_io(),
        }
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    Server(String),
    Client(String),
    Manifest(String),
    Logging(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Server(msg) => write!(f, "server: {}", msg),
            ValidationError::Client(msg) => write!(f, "client: {}", msg),
            ValidationError::Manifest(msg) => write!(f, "manifest: {}", msg),
            ValidationError::Logging(msg) => write!(f, "logging: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl UpdraftConfig {
    /// Validate the entire configuration, collecting every problem.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        for app_id in self.server.apps.keys() {
            if validate_entry_name(app_id).is_err() {
                errors.push(ValidationError::Server(format!(
                    "application id {:?} must be a single path segment",
                    app_id
                )));
            }
        }
        for (name, path) in [
            ("masters_dir", &self.server.masters_dir),
            ("store_path", &self.server.store_path),
            ("staging_dir", &self.server.staging_dir),
        ] {
            if path.as_os_str().is_empty() {
                errors.push(ValidationError::Server(format!("{} cannot be empty", name)));
            }
        }

        if let Some(app_id) = &self.client.app_id {
            if validate_entry_name(app_id).is_err() {
                errors.push(ValidationError::Client(format!(
                    "app_id {:?} must be a single path segment",
                    app_id
                )));
            }
        }
        if let Some(url) = &self.client.server_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                errors.push(ValidationError::Client(format!(
                    "server_url {:?} must start with http:// or https://",
                    url
                )));
            }
        }
        if self.client.request_timeout_secs == 0 {
            errors.push(ValidationError::Client(
                "request_timeout_secs must be greater than zero".to_string(),
            ));
        }

        if self.manifest.max_concurrent_io == 0 {
            errors.push(ValidationError::Manifest(
                "max_concurrent_io must be greater than zero".to_string(),
            ));
        }
        if self.manifest.exclude_suffixes.iter().any(String::is_empty) {
            errors.push(ValidationError::Manifest(
                "exclude_suffixes cannot contain an empty suffix".to_string(),
            ));
        }

        if let Err(e) = self.logging.validate() {
            errors.push(ValidationError::Logging(e));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Make every relative path absolute against `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        let resolve = |path: &mut PathBuf| {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        };
        resolve(&mut self.server.masters_dir);
        resolve(&mut self.server.store_path);
        resolve(&mut self.server.staging_dir);
        for app in self.server.apps.values_mut() {
            resolve(&mut app.master_root);
        }
        if let Some(root) = self.client.install_root.as_mut() {
            resolve(root);
        }
        resolve(&mut self.client.download_dir);
        resolve(&mut self.logging.file);
    }

    /// Effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}
