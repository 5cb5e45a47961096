//! Sync module - ledger snapshots, reconciliation and the sync pass.

mod observer;
mod reconciler;
mod snapshot_model;
mod sync_service;
mod sync_state_model;

pub use observer::{NoOpSyncStateObserver, SyncStateObserver, WatchSyncStateObserver};
pub use reconciler::{
    detect_divergence, reconcile, Divergence, EntityConflict, EntityType, Resolution,
    SyncStrategy,
};
pub use snapshot_model::{LedgerSnapshot, SnapshotOrigin};
pub use sync_service::{SyncConfig, SyncRun, SyncService};
pub use sync_state_model::SyncUiState;
