//! Sync progress reporting.
//!
//! The orchestrator emits a percentage and a label at each checkpoint. Updates
//! are advisory: nothing depends on them being received.

pub mod bus;
pub mod event;

pub use bus::ProgressBus;
pub use event::{now_millis, ProgressUpdate};
