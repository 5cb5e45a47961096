//! Store traits.
//!
//! These traits define the contract for persistence without any
//! storage-specific types. Implementations convert their own failures into
//! [`StoreError`](crate::errors::StoreError) variants; `Unavailable` is
//! treated as transient by the engine.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::accounts::Account;
use crate::errors::Result;
use crate::periodic::PeriodicDefinition;
use crate::sync::LedgerSnapshot;
use crate::transactions::{Posting, PostingReceipt, Transaction};

/// The local replica that holds the system of record.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn get_account(&self, account_id: &str) -> Result<Option<Account>>;

    async fn list_accounts(&self) -> Result<Vec<Account>>;

    /// Creates or replaces an account.
    async fn save_account(&self, account: Account) -> Result<Account>;

    /// Lists transactions ordered by `occurred_at`, optionally for one account.
    async fn list_transactions(&self, account_id: Option<&str>) -> Result<Vec<Transaction>>;

    /// Derived balance of the account in its native currency.
    async fn balance(&self, account_id: &str) -> Result<Decimal>;

    async fn get_definition(&self, definition_id: &str) -> Result<Option<PeriodicDefinition>>;

    async fn list_definitions(&self) -> Result<Vec<PeriodicDefinition>>;

    /// Active definitions whose next-due time is at or before `now`.
    async fn list_due_definitions(&self, now: DateTime<Utc>) -> Result<Vec<PeriodicDefinition>>;

    /// Creates or replaces a definition without posting anything.
    async fn save_definition(&self, definition: PeriodicDefinition) -> Result<PeriodicDefinition>;

    /// Commits every leg of `posting` and its definition advance as one unit.
    ///
    /// Legs are re-validated against the Account Model with the balances the
    /// store holds at commit time. If any leg is rejected, or the definition
    /// is no longer due at the expected time, nothing is written.
    async fn commit_posting(&self, posting: Posting) -> Result<PostingReceipt>;

    /// Consistent export of the whole ledger.
    async fn export_snapshot(&self) -> Result<LedgerSnapshot>;

    /// Replaces the whole ledger with the snapshot contents.
    ///
    /// When `expected_modified_at` is given, the write is refused with
    /// `StoreError::Integrity` if the ledger was modified after that export,
    /// so postings committed during a sync pass are never overwritten.
    async fn replace_from_snapshot(
        &self,
        snapshot: LedgerSnapshot,
        expected_modified_at: Option<DateTime<Utc>>,
    ) -> Result<()>;
}

/// The cloud side of reconciliation.
#[async_trait]
pub trait RemoteLedgerStore: Send + Sync {
    /// Current remote snapshot, or `None` when nothing was uploaded yet.
    async fn pull(&self) -> Result<Option<LedgerSnapshot>>;

    async fn push(&self, snapshot: LedgerSnapshot) -> Result<()>;
}
