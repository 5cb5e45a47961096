//! Sync status observers.

use tokio::sync::watch;

use super::sync_state_model::SyncUiState;

/// Receives every sync state transition, in order.
pub trait SyncStateObserver: Send + Sync {
    fn on_state(&self, state: &SyncUiState);
}

#[derive(Clone, Default)]
pub struct NoOpSyncStateObserver;

impl SyncStateObserver for NoOpSyncStateObserver {
    fn on_state(&self, _state: &SyncUiState) {}
}

/// Publishes the latest state on a `watch` channel.
///
/// Subscribers see the most recent state; intermediate states can be missed
/// by a slow reader, the full sequence is available on the returned `SyncRun`.
pub struct WatchSyncStateObserver {
    sender: watch::Sender<SyncUiState>,
}

impl WatchSyncStateObserver {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(SyncUiState::Idle);
        Self { sender }
    }

    pub fn subscribe(&self) -> watch::Receiver<SyncUiState> {
        self.sender.subscribe()
    }

    pub fn current(&self) -> SyncUiState {
        self.sender.borrow().clone()
    }
}

impl Default for WatchSyncStateObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncStateObserver for WatchSyncStateObserver {
    fn on_state(&self, state: &SyncUiState) {
        // send_replace keeps the value even when nobody is subscribed.
        self.sender.send_replace(state.clone());
    }
}
