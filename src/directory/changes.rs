use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};

use super::Snapshot;

/// Receiving side of the "projects changed" broadcast.
///
/// Each published snapshot is seen at most once and in install order. A
/// subscriber that falls more than the channel capacity behind skips ahead to
/// the oldest snapshot still buffered.
pub struct ProjectChanges {
    receiver: broadcast::Receiver<Snapshot>,
}

impl ProjectChanges {
    pub(super) fn new(receiver: broadcast::Receiver<Snapshot>) -> Self {
        Self { receiver }
    }

    /// Wait for the next published snapshot.
    ///
    /// Returns `None` once the directory is dropped.
    pub async fn next(&mut self) -> Option<Snapshot> {
        loop {
            match self.receiver.recv().await {
                Ok(snapshot) => return Some(snapshot),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("Project subscriber lagged, skipped {} snapshots", skipped);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Next snapshot if one is already waiting.
    pub fn try_next(&mut self) -> Option<Snapshot> {
        loop {
            match self.receiver.try_recv() {
                Ok(snapshot) => return Some(snapshot),
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::warn!("Project subscriber lagged, skipped {} snapshots", skipped);
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }

    /// Drain everything waiting and keep only the newest snapshot.
    pub fn latest(&mut self) -> Option<Snapshot> {
        let mut latest = None;
        while let Some(snapshot) = self.try_next() {
            latest = Some(snapshot);
        }
        latest
    }
}
