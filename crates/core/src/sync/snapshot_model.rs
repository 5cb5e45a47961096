//! Ledger snapshots exchanged between the local replica and the cloud.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::accounts::Account;
use crate::periodic::PeriodicDefinition;
use crate::transactions::Transaction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SnapshotOrigin {
    Local,
    Cloud,
}

/// Immutable point-in-time export of the whole ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerSnapshot {
    pub origin: SnapshotOrigin,
    /// Last modification of the exporting side.
    pub modified_at: DateTime<Utc>,
    /// Last successful sync as known by the exporting side.
    #[serde(default)]
    pub last_synced_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub accounts: Vec<Account>,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
    #[serde(default)]
    pub definitions: Vec<PeriodicDefinition>,
}

impl LedgerSnapshot {
    pub fn empty(origin: SnapshotOrigin, modified_at: DateTime<Utc>) -> Self {
        Self {
            origin,
            modified_at,
            last_synced_at: None,
            accounts: Vec::new(),
            transactions: Vec::new(),
            definitions: Vec::new(),
        }
    }

    pub fn with_origin(mut self, origin: SnapshotOrigin) -> Self {
        self.origin = origin;
        self
    }

    /// Whether this side changed after `since`. A side that never synced
    /// counts as changed.
    pub fn modified_since(&self, since: Option<DateTime<Utc>>) -> bool {
        since.map_or(true, |since| self.modified_at > since)
    }

    /// Marks the snapshot as the agreed state of a sync completed at `at`.
    pub fn stamped(mut self, at: DateTime<Utc>) -> Self {
        self.modified_at = at;
        self.last_synced_at = Some(at);
        self
    }
}
