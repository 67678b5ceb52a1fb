//! Event schema for sync progress.

use crate::client::SyncState;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// One checkpoint of a sync run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub ts: u128,
    /// 0..=100; reset to 0 on error
    pub percent: u8,
    pub label: String,
    pub state: SyncState,
}

impl ProgressUpdate {
    pub fn new(percent: u8, label: impl Into<String>, state: SyncState) -> Self {
        Self {
            ts: now_millis(),
            percent: percent.min(100),
            label: label.into(),
            state,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.state, SyncState::Error(_))
    }
}

pub fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}
