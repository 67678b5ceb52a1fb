//! Sync orchestrator
//!
//! Sequences one client update: build the local manifest, have the service
//! recompute the master, diff, fetch an archive of the difference, overlay it
//! onto the install root and hand off to the restart collaborator.

use crate::archive::{ApplySummary, ArchiveApplier};
use crate::client::transport::UpdateTransport;
use crate::client::SyncState;
use crate::error::ApiError;
use crate::progress::ProgressBus;
use crate::tree::builder::DEFAULT_MAX_CONCURRENT_IO;
use crate::tree::exclude::ExclusionRules;
use crate::tree::node::DiffTree;
use crate::tree::ManifestBuilder;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, instrument, trace};

pub const LABEL_CREATING_MANIFEST: &str = "Creating manifest...";
pub const LABEL_RETRIEVING_MASTER: &str = "Retrieving master manifest...";
pub const LABEL_CREATING_DIFF: &str = "Creating diff...";
pub const LABEL_UPDATE_AVAILABLE: &str = "Update available.";
pub const LABEL_DOWNLOADING: &str = "Downloading files...";
pub const LABEL_APPLYING: &str = "Applying update...";
pub const LABEL_RESTARTING: &str = "Restarting...";
pub const LABEL_UP_TO_DATE: &str = "Up to date.";

/// Restarts the application once an update has been applied.
#[async_trait]
pub trait RestartHandle: Send + Sync {
    async fn restart(&self) -> Result<(), ApiError>;
}

/// Restart handle that only logs; used when no host process is attached.
pub struct NoopRestart;

#[async_trait]
impl RestartHandle for NoopRestart {
    async fn restart(&self) -> Result<(), ApiError> {
        info!("Update applied; restart the application to load it");
        Ok(())
    }
}

/// Result of a successful check or update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    UpToDate,
    /// Check only: the entries that would be fetched
    UpdateAvailable(DiffTree),
    Updated(ApplySummary),
}

pub struct SyncOrchestrator {
    transport: Arc<dyn UpdateTransport>,
    restart: Arc<dyn RestartHandle>,
    app_id: String,
    install_root: PathBuf,
    exclusions: ExclusionRules,
    max_concurrent_io: usize,
    bus: ProgressBus,
    state: Mutex<SyncState>,
}

impl SyncOrchestrator {
    pub fn new(
        transport: Arc<dyn UpdateTransport>,
        app_id: impl Into<String>,
        install_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            transport,
            restart: Arc::new(NoopRestart),
            app_id: app_id.into(),
            install_root: install_root.into(),
            exclusions: ExclusionRules::default(),
            max_concurrent_io: DEFAULT_MAX_CONCURRENT_IO,
            bus: ProgressBus::detached(),
            state: Mutex::new(SyncState::Idle),
        }
    }

    pub fn with_restart(mut self, restart: Arc<dyn RestartHandle>) -> Self {
        self.restart = restart;
        self
    }

    pub fn with_progress(mut self, bus: ProgressBus) -> Self {
        self.bus = bus;
        self
    }

    pub fn with_exclusions(mut self, exclusions: ExclusionRules) -> Self {
        self.exclusions = exclusions;
        self
    }

    pub fn with_max_concurrent_io(mut self, limit: usize) -> Self {
        self.max_concurrent_io = limit.max(1);
        self
    }

    pub fn state(&self) -> SyncState {
        self.state.lock().clone()
    }

    pub fn install_root(&self) -> &Path {
        &self.install_root
    }

    /// Determine whether an update is available without fetching it.
    #[instrument(skip(self), fields(app_id = %self.app_id))]
    pub async fn check(&self) -> Result<SyncOutcome, ApiError> {
        let result = self.run_check().await;
        self.finish(result)
    }

    /// Run the full workflow through to restart.
    #[instrument(skip(self), fields(app_id = %self.app_id))]
    pub async fn update(&self) -> Result<SyncOutcome, ApiError> {
        let start = Instant::now();
        let result = match self.run_check().await {
            Ok(SyncOutcome::UpdateAvailable(diff)) => self.run_update(&diff).await,
            other => other,
        };
        if result.is_ok() {
            info!(duration_ms = start.elapsed().as_millis(), "Sync completed");
        }
        self.finish(result)
    }

    async fn run_check(&self) -> Result<SyncOutcome, ApiError> {
        self.transition(SyncState::Checking, 10, LABEL_CREATING_MANIFEST);
        let local = ManifestBuilder::new(&self.install_root)
            .with_exclusions(self.exclusions.clone())
            .with_max_concurrent_io(self.max_concurrent_io)
            .build()
            .await?;

        self.transition(SyncState::Checking, 25, LABEL_RETRIEVING_MASTER);
        self.transport.recompute(&self.app_id).await?;

        self.transition(SyncState::Checking, 50, LABEL_CREATING_DIFF);
        let diff = self.transport.compare(&self.app_id, &local).await?;

        if diff.is_empty() {
            self.transition(SyncState::UpToDate, 100, LABEL_UP_TO_DATE);
            return Ok(SyncOutcome::UpToDate);
        }

        info!(files = diff.file_count(), "Update available");
        self.transition(SyncState::UpdateAvailable, 50, LABEL_UPDATE_AVAILABLE);
        Ok(SyncOutcome::UpdateAvailable(diff))
    }

    async fn run_update(&self, diff: &DiffTree) -> Result<SyncOutcome, ApiError> {
        self.transition(SyncState::Fetching, 75, LABEL_DOWNLOADING);
        // The handle removes the downloaded archive when dropped, applied or not
        let archive = self.transport.fetch_archive(&self.app_id, diff).await?;

        self.transition(SyncState::Applying, 90, LABEL_APPLYING);
        let summary = ArchiveApplier::new(&self.install_root)
            .with_exclusions(self.exclusions.clone())
            .apply(&archive)
            .await?;
        drop(archive);

        self.transition(SyncState::Restarting, 100, LABEL_RESTARTING);
        self.restart.restart().await?;
        Ok(SyncOutcome::Updated(summary))
    }

    fn finish(&self, result: Result<SyncOutcome, ApiError>) -> Result<SyncOutcome, ApiError> {
        if let Err(e) = &result {
            let message = e.to_string();
            error!("Sync failed: {}", message);
            self.transition(SyncState::Error(message.clone()), 0, message);
        }
        result
    }

    fn transition(&self, state: SyncState, percent: u8, label: impl Into<String>) {
        *self.state.lock() = state.clone();
        if self.bus.emit(percent, label, state).is_err() {
            trace!("No progress listener attached");
        }
    }
}
