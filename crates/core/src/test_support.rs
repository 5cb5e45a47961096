//! Hand-written mocks and fixtures shared by the unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;

use crate::accounts::{derive_balance, Account, AccountKind, CreditTerms, DebtDirection, DebtTerms};
use crate::errors::{Result, StoreError};
use crate::fx::{ExchangeRateLookup, FxError};
use crate::periodic::PeriodicDefinition;
use crate::store::{LedgerStore, RemoteLedgerStore};
use crate::sync::{LedgerSnapshot, SnapshotOrigin, SyncStateObserver, SyncUiState};
use crate::transactions::{check_advance, validate_posting, Posting, PostingReceipt, Transaction};

pub fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 8, 0, 0).unwrap()
}

pub fn account(id: &str, currency: &str, initial: Decimal, kind: AccountKind) -> Account {
    Account {
        id: id.to_string(),
        name: id.to_string(),
        currency: currency.to_string(),
        initial_balance: initial,
        kind,
        created_at: at(2024, 1, 1),
        updated_at: at(2024, 1, 1),
    }
}

pub fn funds(id: &str, initial: Decimal) -> Account {
    account(id, "USD", initial, AccountKind::Funds)
}

pub fn credit(id: &str, initial: Decimal, limit: Decimal) -> Account {
    account(
        id,
        "USD",
        initial,
        AccountKind::Credit(CreditTerms {
            credit_limit: limit,
            allow_overpay: false,
            billing_day: None,
            repayment_day: None,
        }),
    )
}

pub fn debt(id: &str, initial: Decimal, direction: DebtDirection, counterparty: &str) -> Account {
    account(
        id,
        "USD",
        initial,
        AccountKind::Debt(DebtTerms {
            direction,
            counterparty: counterparty.to_string(),
        }),
    )
}

#[derive(Debug)]
struct LedgerState {
    accounts: Vec<Account>,
    transactions: Vec<Transaction>,
    definitions: Vec<PeriodicDefinition>,
    modified_at: DateTime<Utc>,
    last_synced_at: Option<DateTime<Utc>>,
}

/// In-memory `LedgerStore` with switchable availability.
#[derive(Clone)]
pub struct MockLedgerStore {
    state: Arc<Mutex<LedgerState>>,
    unavailable: Arc<AtomicBool>,
    /// Number of successful commits.
    commits: Arc<AtomicUsize>,
}

impl MockLedgerStore {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(LedgerState {
                accounts: Vec::new(),
                transactions: Vec::new(),
                definitions: Vec::new(),
                modified_at: at(2024, 1, 1),
                last_synced_at: None,
            })),
            unavailable: Arc::new(AtomicBool::new(false)),
            commits: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_accounts(self, accounts: Vec<Account>) -> Self {
        self.state.lock().unwrap().accounts = accounts;
        self
    }

    pub fn with_definitions(self, definitions: Vec<PeriodicDefinition>) -> Self {
        self.state.lock().unwrap().definitions = definitions;
        self
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn commits(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    pub fn transactions(&self) -> Vec<Transaction> {
        self.state.lock().unwrap().transactions.clone()
    }

    pub fn definition(&self, id: &str) -> Option<PeriodicDefinition> {
        self.state
            .lock()
            .unwrap()
            .definitions
            .iter()
            .find(|d| d.id == id)
            .cloned()
    }

    pub fn remove_account(&self, id: &str) {
        self.state.lock().unwrap().accounts.retain(|a| a.id != id);
    }

    pub fn balance_now(&self, id: &str) -> Decimal {
        let state = self.state.lock().unwrap();
        let account = state.accounts.iter().find(|a| a.id == id).unwrap();
        derive_balance(account, &state.transactions).unwrap()
    }

    fn check(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("mock store offline".to_string()).into());
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for MockLedgerStore {
    async fn get_account(&self, account_id: &str) -> Result<Option<Account>> {
        self.check()?;
        let state = self.state.lock().unwrap();
        Ok(state.accounts.iter().find(|a| a.id == account_id).cloned())
    }

    async fn list_accounts(&self) -> Result<Vec<Account>> {
        self.check()?;
        Ok(self.state.lock().unwrap().accounts.clone())
    }

    async fn save_account(&self, account: Account) -> Result<Account> {
        self.check()?;
        let mut state = self.state.lock().unwrap();
        state.accounts.retain(|a| a.id != account.id);
        state.accounts.push(account.clone());
        state.modified_at = Utc::now();
        Ok(account)
    }

    async fn list_transactions(&self, account_id: Option<&str>) -> Result<Vec<Transaction>> {
        self.check()?;
        let state = self.state.lock().unwrap();
        Ok(state
            .transactions
            .iter()
            .filter(|tx| account_id.map_or(true, |id| tx.account_id == id))
            .cloned()
            .collect())
    }

    async fn balance(&self, account_id: &str) -> Result<Decimal> {
        self.check()?;
        let state = self.state.lock().unwrap();
        let account = state
            .accounts
            .iter()
            .find(|a| a.id == account_id)
            .ok_or_else(|| StoreError::NotFound(account_id.to_string()))?;
        derive_balance(account, &state.transactions)
    }

    async fn get_definition(&self, definition_id: &str) -> Result<Option<PeriodicDefinition>> {
        self.check()?;
        Ok(self.definition(definition_id))
    }

    async fn list_definitions(&self) -> Result<Vec<PeriodicDefinition>> {
        self.check()?;
        Ok(self.state.lock().unwrap().definitions.clone())
    }

    async fn list_due_definitions(&self, now: DateTime<Utc>) -> Result<Vec<PeriodicDefinition>> {
        self.check()?;
        let state = self.state.lock().unwrap();
        Ok(state
            .definitions
            .iter()
            .filter(|d| d.is_due(now))
            .cloned()
            .collect())
    }

    async fn save_definition(&self, definition: PeriodicDefinition) -> Result<PeriodicDefinition> {
        self.check()?;
        let mut state = self.state.lock().unwrap();
        state.definitions.retain(|d| d.id != definition.id);
        state.definitions.push(definition.clone());
        state.modified_at = Utc::now();
        Ok(definition)
    }

    async fn commit_posting(&self, posting: Posting) -> Result<PostingReceipt> {
        self.check()?;
        let mut state = self.state.lock().unwrap();

        if let Some(advance) = &posting.advance {
            let stored = state
                .definitions
                .iter()
                .find(|d| d.id == advance.definition.id);
            check_advance(advance, stored)?;
        }
        let balances = {
            let accounts = &state.accounts;
            let transactions = &state.transactions;
            validate_posting(
                &posting,
                |id| accounts.iter().find(|a| a.id == id).cloned(),
                |account| derive_balance(account, transactions),
            )?
        };

        let transaction_ids = posting.transactions.iter().map(|tx| tx.id.clone()).collect();
        state.transactions.extend(posting.transactions);
        if let Some(advance) = posting.advance {
            state.definitions.retain(|d| d.id != advance.definition.id);
            state.definitions.push(advance.definition);
        }
        state.modified_at = Utc::now();
        self.commits.fetch_add(1, Ordering::SeqCst);

        Ok(PostingReceipt {
            transaction_ids,
            balances,
        })
    }

    async fn export_snapshot(&self) -> Result<LedgerSnapshot> {
        self.check()?;
        let state = self.state.lock().unwrap();
        Ok(LedgerSnapshot {
            origin: SnapshotOrigin::Local,
            modified_at: state.modified_at,
            last_synced_at: state.last_synced_at,
            accounts: state.accounts.clone(),
            transactions: state.transactions.clone(),
            definitions: state.definitions.clone(),
        })
    }

    async fn replace_from_snapshot(
        &self,
        snapshot: LedgerSnapshot,
        expected_modified_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        self.check()?;
        let mut state = self.state.lock().unwrap();
        if let Some(expected) = expected_modified_at {
            if state.modified_at != expected {
                return Err(StoreError::Integrity("ledger changed since export".to_string()).into());
            }
        }
        state.accounts = snapshot.accounts;
        state.transactions = snapshot.transactions;
        state.definitions = snapshot.definitions;
        state.modified_at = snapshot.modified_at;
        state.last_synced_at = snapshot.last_synced_at;
        Ok(())
    }
}

/// Remote snapshot store backed by a mutex.
#[derive(Clone, Default)]
pub struct MockRemoteStore {
    snapshot: Arc<Mutex<Option<LedgerSnapshot>>>,
    unavailable: Arc<AtomicBool>,
}

impl MockRemoteStore {
    pub fn current(&self) -> Option<LedgerSnapshot> {
        self.snapshot.lock().unwrap().clone()
    }

    /// Simulates another device writing to the cloud.
    pub fn push_direct(&self, snapshot: LedgerSnapshot) {
        *self.snapshot.lock().unwrap() = Some(snapshot);
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

#[async_trait]
impl RemoteLedgerStore for MockRemoteStore {
    async fn pull(&self) -> Result<Option<LedgerSnapshot>> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("remote offline".to_string()).into());
        }
        Ok(self.current())
    }

    async fn push(&self, snapshot: LedgerSnapshot) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("remote offline".to_string()).into());
        }
        *self.snapshot.lock().unwrap() = Some(snapshot);
        Ok(())
    }
}

/// Fixed conversion factors; `offline` makes every lookup transiently fail.
#[derive(Clone, Default)]
pub struct MockRates {
    rates: Arc<Mutex<HashMap<(String, String), Decimal>>>,
    offline: Arc<AtomicBool>,
}

impl MockRates {
    pub fn with_rate(self, from: &str, to: &str, rate: Decimal) -> Self {
        self.rates
            .lock()
            .unwrap()
            .insert((from.to_string(), to.to_string()), rate);
        self
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }
}

#[async_trait]
impl ExchangeRateLookup for MockRates {
    async fn rate(&self, from: &str, to: &str, _as_of: NaiveDate) -> Result<Decimal> {
        if from == to {
            return Ok(Decimal::ONE);
        }
        if self.offline.load(Ordering::SeqCst) {
            return Err(FxError::RateUnavailable {
                from: from.to_string(),
                to: to.to_string(),
                reason: "offline".to_string(),
            }
            .into());
        }
        self.rates
            .lock()
            .unwrap()
            .get(&(from.to_string(), to.to_string()))
            .copied()
            .ok_or_else(|| FxError::UnsupportedCurrency(to.to_string()).into())
    }
}

/// Records every published sync state.
#[derive(Clone, Default)]
pub struct RecordingObserver {
    states: Arc<Mutex<Vec<SyncUiState>>>,
}

impl RecordingObserver {
    pub fn states(&self) -> Vec<SyncUiState> {
        self.states.lock().unwrap().clone()
    }
}

impl SyncStateObserver for RecordingObserver {
    fn on_state(&self, state: &SyncUiState) {
        self.states.lock().unwrap().push(state.clone());
    }
}
