//! Reconciliation of a local and a remote ledger snapshot.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::snapshot_model::{LedgerSnapshot, SnapshotOrigin};
use crate::errors::ValidationError;
use crate::periodic::PeriodicDefinition;
use crate::transactions::{DedupKey, Transaction};
use crate::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncStrategy {
    /// Local replaces remote unconditionally.
    OverwriteCloud,
    /// Remote replaces local unconditionally.
    OverwriteLocal,
    /// Entity-level merge.
    #[default]
    Merge,
}

impl fmt::Display for SyncStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyncStrategy::OverwriteCloud => "OVERWRITE_CLOUD",
            SyncStrategy::OverwriteLocal => "OVERWRITE_LOCAL",
            SyncStrategy::Merge => "MERGE",
        };
        f.write_str(name)
    }
}

impl FromStr for SyncStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "OVERWRITE_CLOUD" => Ok(SyncStrategy::OverwriteCloud),
            "OVERWRITE_LOCAL" => Ok(SyncStrategy::OverwriteLocal),
            "MERGE" => Ok(SyncStrategy::Merge),
            other => Err(Error::Validation(ValidationError::InvalidInput(format!(
                "Unknown sync strategy: {}",
                other
            )))),
        }
    }
}

/// How the two sides relate to their last common sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Divergence {
    InSync,
    LocalAhead,
    RemoteAhead,
    /// Both sides changed since the last common sync.
    Diverged,
}

/// Compares both snapshots against the local side's last sync timestamp.
pub fn detect_divergence(local: &LedgerSnapshot, remote: &LedgerSnapshot) -> Divergence {
    let base = local.last_synced_at;
    match (local.modified_since(base), remote.modified_since(base)) {
        (false, false) => Divergence::InSync,
        (true, false) => Divergence::LocalAhead,
        (false, true) => Divergence::RemoteAhead,
        (true, true) => Divergence::Diverged,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityType {
    Account,
    Transaction,
    Definition,
}

/// An entity that differs between the sides with identical modification times.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityConflict {
    pub entity: EntityType,
    pub id: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Snapshot to write back to both sides.
    Resolved {
        snapshot: LedgerSnapshot,
        divergence: Divergence,
    },
    Conflict {
        remote_modified_at: DateTime<Utc>,
        conflicts: Vec<EntityConflict>,
    },
}

impl Resolution {
    pub fn snapshot(&self) -> Option<&LedgerSnapshot> {
        match self {
            Resolution::Resolved { snapshot, .. } => Some(snapshot),
            Resolution::Conflict { .. } => None,
        }
    }
}

/// Resolves `local` against `remote` under `strategy`. Pure; nothing is written.
pub fn reconcile(
    local: LedgerSnapshot,
    remote: LedgerSnapshot,
    strategy: SyncStrategy,
) -> Resolution {
    let divergence = detect_divergence(&local, &remote);
    debug!("Reconciling with {} ({:?})", strategy, divergence);

    match strategy {
        SyncStrategy::OverwriteCloud => Resolution::Resolved {
            snapshot: local,
            divergence,
        },
        SyncStrategy::OverwriteLocal => Resolution::Resolved {
            snapshot: remote,
            divergence,
        },
        SyncStrategy::Merge => match divergence {
            Divergence::InSync | Divergence::LocalAhead | Divergence::RemoteAhead => {
                // One-sided change: the newer side wins wholesale, deletions included.
                let snapshot = if remote.modified_at > local.modified_at {
                    remote
                } else {
                    local
                };
                Resolution::Resolved {
                    snapshot,
                    divergence,
                }
            }
            Divergence::Diverged => merge(local, remote),
        },
    }
}

fn merge(local: LedgerSnapshot, remote: LedgerSnapshot) -> Resolution {
    let mut conflicts = Vec::new();

    let accounts = merge_by_id(
        local.accounts,
        remote.accounts,
        EntityType::Account,
        |a| &a.id,
        |a| a.updated_at,
        |winner, _| winner,
        &mut conflicts,
    );
    let definitions = merge_by_id(
        local.definitions,
        remote.definitions,
        EntityType::Definition,
        |d| &d.id,
        |d| d.updated_at,
        keep_schedule_progress,
        &mut conflicts,
    );
    let transactions = merge_transactions(local.transactions, remote.transactions, &mut conflicts);

    if !conflicts.is_empty() {
        warn!(
            "Merge found {} entities edited on both sides at the same instant",
            conflicts.len()
        );
        return Resolution::Conflict {
            remote_modified_at: remote.modified_at,
            conflicts,
        };
    }

    Resolution::Resolved {
        snapshot: LedgerSnapshot {
            origin: SnapshotOrigin::Local,
            modified_at: local.modified_at.max(remote.modified_at),
            last_synced_at: local.last_synced_at,
            accounts,
            transactions,
            definitions,
        },
        divergence: Divergence::Diverged,
    }
}

/// Merges two entity lists by id. Entities on one side only are kept; for an
/// entity on both sides that differs, the later `updated_at` wins, `settle`
/// folds in whatever must survive from the losing version, and a tie is
/// recorded as a conflict.
fn merge_by_id<T, I, U, S>(
    local: Vec<T>,
    remote: Vec<T>,
    entity: EntityType,
    id_of: I,
    updated_at_of: U,
    settle: S,
    conflicts: &mut Vec<EntityConflict>,
) -> Vec<T>
where
    T: PartialEq,
    I: Fn(&T) -> &String,
    U: Fn(&T) -> DateTime<Utc>,
    S: Fn(T, &T) -> T,
{
    let mut remote_by_id: HashMap<String, T> = remote
        .into_iter()
        .map(|item| (id_of(&item).clone(), item))
        .collect();
    let mut remote_order: Vec<String> = remote_by_id.keys().cloned().collect();
    remote_order.sort();

    let mut merged = Vec::with_capacity(local.len() + remote_by_id.len());
    for item in local {
        let Some(other) = remote_by_id.remove(id_of(&item)) else {
            merged.push(item);
            continue;
        };
        if item == other {
            merged.push(item);
            continue;
        }
        let (mine, theirs) = (updated_at_of(&item), updated_at_of(&other));
        if theirs > mine {
            merged.push(settle(other, &item));
        } else {
            if theirs == mine {
                conflicts.push(EntityConflict {
                    entity,
                    id: id_of(&item).clone(),
                    updated_at: mine,
                });
            }
            merged.push(settle(item, &other));
        }
    }
    merged.extend(
        remote_order
            .into_iter()
            .filter_map(|id| remote_by_id.remove(&id)),
    );
    merged
}

/// Occurrences already posted on either side stay posted: the merged
/// definition never moves `next_due` backwards or reactivates a definition
/// the other side completed or invalidated.
fn keep_schedule_progress(
    mut winner: PeriodicDefinition,
    other: &PeriodicDefinition,
) -> PeriodicDefinition {
    if other.next_due > winner.next_due {
        winner.next_due = other.next_due;
    }
    winner.active = winner.active && other.active;
    winner
}

/// Id merge plus dedup of records created independently on each side for the
/// same real-world transaction.
fn merge_transactions(
    local: Vec<Transaction>,
    remote: Vec<Transaction>,
    conflicts: &mut Vec<EntityConflict>,
) -> Vec<Transaction> {
    let local_ids: HashSet<String> = local.iter().map(|tx| tx.id.clone()).collect();
    let remote_ids: HashSet<String> = remote.iter().map(|tx| tx.id.clone()).collect();

    let mut local_only: HashMap<DedupKey, usize> = HashMap::new();
    for tx in local.iter().filter(|tx| !remote_ids.contains(&tx.id)) {
        *local_only.entry(tx.dedup_key()).or_default() += 1;
    }

    let mut merged = merge_by_id(
        local,
        remote,
        EntityType::Transaction,
        |tx| &tx.id,
        |tx| tx.updated_at,
        |winner, _| winner,
        conflicts,
    );

    merged.retain(|tx| {
        if local_ids.contains(&tx.id) {
            return true;
        }
        match local_only.get_mut(&tx.dedup_key()) {
            Some(count) if *count > 0 => {
                *count -= 1;
                debug!("Dropping remote transaction {} as a duplicate", tx.id);
                false
            }
            _ => true,
        }
    });
    merged.sort_by(|a, b| a.occurred_at.cmp(&b.occurred_at).then_with(|| a.id.cmp(&b.id)));
    merged
}
