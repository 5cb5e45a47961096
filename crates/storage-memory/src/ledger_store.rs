//! In-memory local replica.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, info};
use rust_decimal::Decimal;

use ledgerkeep_core::accounts::{Account, BalanceCache};
use ledgerkeep_core::errors::{Result, StoreError};
use ledgerkeep_core::periodic::PeriodicDefinition;
use ledgerkeep_core::store::LedgerStore;
use ledgerkeep_core::sync::{LedgerSnapshot, SnapshotOrigin};
use ledgerkeep_core::transactions::{
    check_advance, validate_posting, Posting, PostingReceipt, Transaction,
};

use crate::errors::StorageError;
use crate::write_actor::{spawn_writer, WriteHandle};

/// Everything the replica holds. Transactions are kept sorted by
/// `occurred_at`, ties in commit order.
#[derive(Debug)]
pub(crate) struct LedgerState {
    accounts: BTreeMap<String, Account>,
    transactions: Vec<Transaction>,
    definitions: BTreeMap<String, PeriodicDefinition>,
    modified_at: DateTime<Utc>,
    last_synced_at: Option<DateTime<Utc>>,
}

impl LedgerState {
    fn from_snapshot(snapshot: LedgerSnapshot) -> Self {
        let mut transactions = snapshot.transactions;
        transactions.sort_by_key(|tx| tx.occurred_at);
        Self {
            accounts: snapshot
                .accounts
                .into_iter()
                .map(|a| (a.id.clone(), a))
                .collect(),
            transactions,
            definitions: snapshot
                .definitions
                .into_iter()
                .map(|d| (d.id.clone(), d))
                .collect(),
            modified_at: snapshot.modified_at,
            last_synced_at: snapshot.last_synced_at,
        }
    }

    fn insert_transaction(&mut self, tx: Transaction) {
        let idx = self
            .transactions
            .partition_point(|existing| existing.occurred_at <= tx.occurred_at);
        self.transactions.insert(idx, tx);
    }

    /// Bumps the modification time, keeping it strictly increasing so that
    /// an export taken before this write never matches it.
    fn touch(&mut self) {
        let now = Utc::now();
        self.modified_at = if now > self.modified_at {
            now
        } else {
            self.modified_at + chrono::Duration::microseconds(1)
        };
    }
}

/// `LedgerStore` held entirely in memory.
///
/// Reads take a shared lock on the state. Writes are queued to a single
/// writer task, so each posting is validated and applied as one unit.
/// Derived balances are memoized and invalidated for every account a write
/// touches.
#[derive(Clone)]
pub struct MemoryLedgerStore {
    state: Arc<RwLock<LedgerState>>,
    balances: Arc<BalanceCache>,
    writer: WriteHandle,
}

impl MemoryLedgerStore {
    /// Empty ledger. Must be called from within a Tokio runtime.
    pub fn new() -> Self {
        Self::from_snapshot(LedgerSnapshot::empty(SnapshotOrigin::Local, Utc::now()))
    }

    /// Ledger seeded with the contents of `snapshot`.
    pub fn from_snapshot(snapshot: LedgerSnapshot) -> Self {
        info!(
            "Loading ledger: {} accounts, {} transactions, {} definitions",
            snapshot.accounts.len(),
            snapshot.transactions.len(),
            snapshot.definitions.len()
        );
        let state = Arc::new(RwLock::new(LedgerState::from_snapshot(snapshot)));
        let writer = spawn_writer(state.clone());
        Self {
            state,
            balances: Arc::new(BalanceCache::new()),
            writer,
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, LedgerState>> {
        self.state
            .read()
            .map_err(|_| StorageError::LockPoisoned.into())
    }
}

impl Default for MemoryLedgerStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn get_account(&self, account_id: &str) -> Result<Option<Account>> {
        Ok(self.read()?.accounts.get(account_id).cloned())
    }

    async fn list_accounts(&self) -> Result<Vec<Account>> {
        Ok(self.read()?.accounts.values().cloned().collect())
    }

    async fn save_account(&self, account: Account) -> Result<Account> {
        let balances = self.balances.clone();
        self.writer
            .exec(move |state| {
                // initial balance may have changed
                balances.invalidate(&account.id);
                state.accounts.insert(account.id.clone(), account.clone());
                state.touch();
                Ok(account)
            })
            .await
    }

    async fn list_transactions(&self, account_id: Option<&str>) -> Result<Vec<Transaction>> {
        let state = self.read()?;
        Ok(state
            .transactions
            .iter()
            .filter(|tx| account_id.map_or(true, |id| tx.account_id == id))
            .cloned()
            .collect())
    }

    async fn balance(&self, account_id: &str) -> Result<Decimal> {
        let state = self.read()?;
        let account = state
            .accounts
            .get(account_id)
            .ok_or_else(|| StoreError::NotFound(format!("account {}", account_id)))?;
        self.balances.get_or_derive(account, &state.transactions)
    }

    async fn get_definition(&self, definition_id: &str) -> Result<Option<PeriodicDefinition>> {
        Ok(self.read()?.definitions.get(definition_id).cloned())
    }

    async fn list_definitions(&self) -> Result<Vec<PeriodicDefinition>> {
        Ok(self.read()?.definitions.values().cloned().collect())
    }

    async fn list_due_definitions(&self, now: DateTime<Utc>) -> Result<Vec<PeriodicDefinition>> {
        Ok(self
            .read()?
            .definitions
            .values()
            .filter(|d| d.is_due(now))
            .cloned()
            .collect())
    }

    async fn save_definition(&self, definition: PeriodicDefinition) -> Result<PeriodicDefinition> {
        self.writer
            .exec(move |state| {
                state
                    .definitions
                    .insert(definition.id.clone(), definition.clone());
                state.touch();
                Ok(definition)
            })
            .await
    }

    async fn commit_posting(&self, posting: Posting) -> Result<PostingReceipt> {
        let balances = self.balances.clone();
        self.writer
            .exec(move |state| {
                if let Some(advance) = &posting.advance {
                    check_advance(advance, state.definitions.get(&advance.definition.id))?;
                }
                let resulting = {
                    let accounts = &state.accounts;
                    let transactions = &state.transactions;
                    validate_posting(
                        &posting,
                        |id| accounts.get(id).cloned(),
                        |account| balances.get_or_derive(account, transactions),
                    )?
                };

                let transaction_ids = posting.transactions.iter().map(|tx| tx.id.clone()).collect();
                for account_id in posting.account_ids() {
                    balances.invalidate(&account_id);
                }
                for tx in posting.transactions {
                    state.insert_transaction(tx);
                }
                if let Some(advance) = posting.advance {
                    state
                        .definitions
                        .insert(advance.definition.id.clone(), advance.definition);
                }
                state.touch();
                debug!("Committed posting touching {} accounts", resulting.len());

                Ok(PostingReceipt {
                    transaction_ids,
                    balances: resulting,
                })
            })
            .await
    }

    async fn export_snapshot(&self) -> Result<LedgerSnapshot> {
        let state = self.read()?;
        Ok(LedgerSnapshot {
            origin: SnapshotOrigin::Local,
            modified_at: state.modified_at,
            last_synced_at: state.last_synced_at,
            accounts: state.accounts.values().cloned().collect(),
            transactions: state.transactions.clone(),
            definitions: state.definitions.values().cloned().collect(),
        })
    }

    async fn replace_from_snapshot(
        &self,
        snapshot: LedgerSnapshot,
        expected_modified_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let balances = self.balances.clone();
        self.writer
            .exec(move |state| {
                if let Some(expected) = expected_modified_at {
                    if state.modified_at != expected {
                        return Err(StoreError::Integrity(format!(
                            "ledger modified at {} after export at {}",
                            state.modified_at, expected
                        ))
                        .into());
                    }
                }
                *state = LedgerState::from_snapshot(snapshot);
                balances.clear();
                Ok(())
            })
            .await
    }
}
