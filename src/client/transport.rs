//! Transports between the sync orchestrator and the update service.

use crate::archive::ArchiveHandle;
use crate::error::ApiError;
use crate::service::{StatusResponse, UpdateService};
use crate::tree::node::{DiffTree, Manifest};
use crate::tree::path::validate_entry_name;
use crate::types::ContentHash;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

/// Client-side view of the update service boundary.
#[async_trait]
pub trait UpdateTransport: Send + Sync {
    /// Ask the service to rebuild its master manifest for `app_id`.
    async fn recompute(&self, app_id: &str) -> Result<(), ApiError>;

    /// Diff the master manifest against `local`.
    async fn compare(&self, app_id: &str, local: &Manifest) -> Result<DiffTree, ApiError>;

    /// Fetch an archive of the files named by `diff`.
    async fn fetch_archive(&self, app_id: &str, diff: &DiffTree) -> Result<ArchiveHandle, ApiError>;

    async fn manifest_digest(&self, app_id: &str) -> Result<ContentHash, ApiError>;
}

/// Calls an in-process [`UpdateService`] directly.
pub struct LocalTransport {
    service: Arc<UpdateService>,
}

impl LocalTransport {
    pub fn new(service: Arc<UpdateService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl UpdateTransport for LocalTransport {
    async fn recompute(&self, app_id: &str) -> Result<(), ApiError> {
        self.service.recompute_manifest(app_id).await.map(|_| ())
    }

    async fn compare(&self, app_id: &str, local: &Manifest) -> Result<DiffTree, ApiError> {
        self.service.compare_manifest(app_id, local).await
    }

    async fn fetch_archive(&self, app_id: &str, diff: &DiffTree) -> Result<ArchiveHandle, ApiError> {
        self.service.fetch_diff_archive(app_id, diff).await
    }

    async fn manifest_digest(&self, app_id: &str) -> Result<ContentHash, ApiError> {
        self.service.manifest_digest(app_id).await
    }
}

const HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Talks to an update server over HTTP.
///
/// Routes live under `{base}/autoupdate/{app_id}/`. A body of
/// `{"status":"error","err":...}` or a non-success status is a network error.
pub struct HttpTransport {
    client: Client,
    base_url: String,
    download_dir: PathBuf,
}

impl HttpTransport {
    pub fn new(
        base_url: impl Into<String>,
        request_timeout: Duration,
        download_dir: impl Into<PathBuf>,
    ) -> Result<Self, ApiError> {
        let client = Client::builder()
            .connect_timeout(HTTP_CONNECT_TIMEOUT)
            .timeout(request_timeout)
            .build()
            .map_err(|e| ApiError::Network(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            download_dir: download_dir.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn route(&self, app_id: &str, route: &str) -> Result<String, ApiError> {
        validate_entry_name(app_id).map_err(|_| ApiError::UnknownApplication(app_id.to_string()))?;
        Ok(format!("{}/autoupdate/{}/{}", self.base_url, app_id, route))
    }

    async fn checked(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<StatusResponse>(&body)
            .ok()
            .and_then(|s| s.err)
            .unwrap_or(body);
        Err(ApiError::Network(format!("Server returned {}: {}", status, message)))
    }
}

/// `Some(message)` when a JSON body is an error status response.
///
/// Diff bodies cannot collide: a file value is a hex digest, never `"error"`.
fn error_status(value: &Value) -> Option<String> {
    let object = value.as_object()?;
    if object.get("status")?.as_str()? != StatusResponse::ERROR {
        return None;
    }
    Some(
        object
            .get("err")
            .and_then(Value::as_str)
            .unwrap_or("unspecified server error")
            .to_string(),
    )
}

#[async_trait]
impl UpdateTransport for HttpTransport {
    #[instrument(skip(self))]
    async fn recompute(&self, app_id: &str) -> Result<(), ApiError> {
        let url = self.route(app_id, "recalcmastermanifest")?;
        let response = Self::checked(self.client.get(&url).send().await?).await?;
        let status: StatusResponse = response.json().await?;
        status.into_result().map(|_| ())
    }

    #[instrument(skip(self, local))]
    async fn compare(&self, app_id: &str, local: &Manifest) -> Result<DiffTree, ApiError> {
        let url = self.route(app_id, "compare")?;
        let response = Self::checked(self.client.post(&url).json(local).send().await?).await?;
        let body = response.text().await?;

        let value: Value = serde_json::from_str(&body)
            .map_err(|e| ApiError::Network(format!("Malformed diff response: {}", e)))?;
        if let Some(message) = error_status(&value) {
            return Err(ApiError::Network(message));
        }
        DiffTree::from_json(&body).map_err(|e| ApiError::Network(format!("Malformed diff response: {}", e)))
    }

    #[instrument(skip(self, diff), fields(files = diff.file_count()))]
    async fn fetch_archive(&self, app_id: &str, diff: &DiffTree) -> Result<ArchiveHandle, ApiError> {
        let url = self.route(app_id, "diffzip")?;
        let response = Self::checked(self.client.post(&url).json(diff).send().await?).await?;
        let bytes = response.bytes().await?;

        if let Ok(value) = serde_json::from_slice::<Value>(&bytes) {
            if let Some(message) = error_status(&value) {
                return Err(ApiError::Network(message));
            }
        }
        debug!(size_bytes = bytes.len(), "Downloaded archive");
        Ok(ArchiveHandle::from_bytes(&bytes, &self.download_dir)?)
    }

    async fn manifest_digest(&self, app_id: &str) -> Result<ContentHash, ApiError> {
        let url = self.route(app_id, "masterchecksum")?;
        let response = Self::checked(self.client.get(&url).send().await?).await?;
        let status: StatusResponse = response.json().await?;
        let checksum = status
            .into_result()?
            .checksum
            .ok_or_else(|| ApiError::Network("Checksum missing from response".to_string()))?;
        checksum
            .parse()
            .map_err(|e: String| ApiError::Network(format!("Malformed checksum: {}", e)))
    }
}
