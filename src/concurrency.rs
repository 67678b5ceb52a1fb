//! Per-application gates
//!
//! Serializes work on one application id while leaving different ids
//! fully independent.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Hands out one async mutex per application id.
#[derive(Default)]
pub struct AppLockManager {
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl AppLockManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the gate for `app_id`, creating it on first use.
    pub fn get_lock(&self, app_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock();
        Arc::clone(
            locks
                .entry(app_id.to_string())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(()))),
        )
    }

    pub fn len(&self) -> usize {
        self.locks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
