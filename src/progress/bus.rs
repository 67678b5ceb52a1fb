//! In-process bus for sync progress updates.

use std::sync::mpsc::{channel, Receiver, SendError, Sender};

use crate::client::SyncState;
use crate::progress::event::ProgressUpdate;

#[derive(Clone)]
pub struct ProgressBus {
    sender: Sender<ProgressUpdate>,
}

impl ProgressBus {
    pub fn new_pair() -> (Self, Receiver<ProgressUpdate>) {
        let (sender, receiver) = channel();
        (Self { sender }, receiver)
    }

    /// A bus whose updates go nowhere.
    pub fn detached() -> Self {
        let (bus, _receiver) = Self::new_pair();
        bus
    }

    pub fn emit(
        &self,
        percent: u8,
        label: impl Into<String>,
        state: SyncState,
    ) -> Result<(), SendError<ProgressUpdate>> {
        self.sender.send(ProgressUpdate::new(percent, label, state))
    }
}
