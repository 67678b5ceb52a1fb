//! Client side of an update: transports to the update service and the sync
//! orchestrator that drives a check or a full update.

pub mod orchestrator;
pub mod transport;

pub use orchestrator::{NoopRestart, RestartHandle, SyncOrchestrator, SyncOutcome};
pub use transport::{HttpTransport, LocalTransport, UpdateTransport};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Orchestrator state. `Error` carries the message that halted the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    Idle,
    Checking,
    UpToDate,
    UpdateAvailable,
    Fetching,
    Applying,
    Restarting,
    Error(String),
}

impl SyncState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SyncState::UpToDate | SyncState::Restarting | SyncState::Error(_)
        )
    }
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncState::Idle => f.write_str("idle"),
            SyncState::Checking => f.write_str("checking"),
            SyncState::UpToDate => f.write_str("up to date"),
            SyncState::UpdateAvailable => f.write_str("update available"),
            SyncState::Fetching => f.write_str("fetching"),
            SyncState::Applying => f.write_str("applying"),
            SyncState::Restarting => f.write_str("restarting"),
            SyncState::Error(message) => write!(f, "error: {}", message),
        }
    }
}
