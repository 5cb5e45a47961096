use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::debug;
use rust_decimal::Decimal;

use super::transactions_model::{
    NewTransaction, NewTransfer, Posting, PostingReceipt, Transaction, TransactionSource,
};
use crate::accounts::{apply_transaction, Account, TransactionKind};
use crate::errors::{Result, StoreError};
use crate::events::{DomainEvent, DomainEventSink, NoOpDomainEventSink};
use crate::fx::{normalize_currency_code, ExchangeRateLookup, FxError};
use crate::store::LedgerStore;

/// Manual entry path: validates, converts and commits user transactions.
pub struct LedgerService {
    store: Arc<dyn LedgerStore>,
    rates: Arc<dyn ExchangeRateLookup>,
    event_sink: Arc<dyn DomainEventSink>,
}

impl LedgerService {
    pub fn new(store: Arc<dyn LedgerStore>, rates: Arc<dyn ExchangeRateLookup>) -> Self {
        Self {
            store,
            rates,
            event_sink: Arc::new(NoOpDomainEventSink),
        }
    }

    pub fn with_event_sink(mut self, event_sink: Arc<dyn DomainEventSink>) -> Self {
        self.event_sink = event_sink;
        self
    }

    /// Records a single manual transaction.
    pub async fn record(&self, new_transaction: NewTransaction) -> Result<PostingReceipt> {
        new_transaction.validate()?;
        let account = self.account(&new_transaction.account_id).await?;
        let tx = self
            .build_leg(
                &account,
                new_transaction.kind,
                new_transaction.amount,
                new_transaction.currency.as_deref(),
                new_transaction.occurred_at,
            )
            .await?
            .with_note(new_transaction.note);

        // Early check for a clean error; the store re-validates on commit.
        let balance = self.store.balance(&account.id).await?;
        apply_transaction(&account, balance, tx.amount, tx.kind)?;

        self.commit(Posting::manual(vec![tx])).await
    }

    /// Records a transfer as two legs committed together.
    pub async fn record_transfer(&self, transfer: NewTransfer) -> Result<PostingReceipt> {
        transfer.validate()?;
        let from = self.account(&transfer.from_account_id).await?;
        let to = self.account(&transfer.to_account_id).await?;
        let currency = transfer.currency.as_deref();

        let out_leg = self
            .build_leg(
                &from,
                TransactionKind::TransferOut,
                transfer.amount,
                currency,
                transfer.occurred_at,
            )
            .await?
            .with_note(transfer.note.clone());
        let in_leg = self
            .build_leg(
                &to,
                TransactionKind::TransferIn,
                transfer.amount,
                currency,
                transfer.occurred_at,
            )
            .await?
            .with_note(transfer.note);

        self.commit(Posting::manual(vec![out_leg, in_leg])).await
    }

    /// Current derived balance of an account in its native currency.
    pub async fn balance(&self, account_id: &str) -> Result<Decimal> {
        self.account(account_id).await?;
        self.store.balance(account_id).await
    }

    async fn account(&self, account_id: &str) -> Result<Account> {
        self.store
            .get_account(account_id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("account {}", account_id)).into())
    }

    /// Builds a leg in the account currency, converting when the amount was
    /// entered in another currency.
    async fn build_leg(
        &self,
        account: &Account,
        kind: TransactionKind,
        amount: Decimal,
        currency: Option<&str>,
        occurred_at: DateTime<Utc>,
    ) -> Result<Transaction> {
        let entered = match currency {
            Some(code) => Some(
                normalize_currency_code(code)
                    .ok_or_else(|| FxError::InvalidCurrencyCode(code.to_string()))?,
            ),
            None => None,
        };

        match entered {
            Some(code) if code != account.currency => {
                let converted = self
                    .rates
                    .convert(amount, &code, &account.currency, occurred_at.date_naive())
                    .await?;
                debug!(
                    "Converted {} {} to {} {} for account {}",
                    amount, code, converted, account.currency, account.id
                );
                Ok(
                    Transaction::new(&account.id, kind, converted, occurred_at, TransactionSource::Manual)
                        .with_original(amount, code),
                )
            }
            _ => Ok(Transaction::new(
                &account.id,
                kind,
                amount,
                occurred_at,
                TransactionSource::Manual,
            )),
        }
    }

    async fn commit(&self, posting: Posting) -> Result<PostingReceipt> {
        let account_ids = posting.account_ids();
        let receipt = self.store.commit_posting(posting).await?;
        self.event_sink.emit(DomainEvent::transactions_posted(
            account_ids,
            receipt.transaction_ids.clone(),
            None,
        ));
        Ok(receipt)
    }
}
