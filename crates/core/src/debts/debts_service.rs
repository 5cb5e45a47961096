use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use log::debug;

use super::debts_model::{DebtSummary, DebtTotals};
use crate::accounts::{Account, DebtDirection, TransactionKind};
use crate::errors::Result;
use crate::fx::{round_amount, ExchangeRateLookup};
use crate::store::LedgerStore;

/// Computes debt summaries on demand. Nothing is stored.
pub struct DebtSummaryService {
    store: Arc<dyn LedgerStore>,
    rates: Arc<dyn ExchangeRateLookup>,
    reporting_currency: String,
}

impl DebtSummaryService {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        rates: Arc<dyn ExchangeRateLookup>,
        reporting_currency: impl Into<String>,
    ) -> Self {
        Self {
            store,
            rates,
            reporting_currency: reporting_currency.into(),
        }
    }

    /// Summary for one counterparty (matched case-insensitively), at today's rates.
    pub async fn summarize(&self, counterparty: &str) -> Result<DebtSummary> {
        self.summarize_as_of(counterparty, Utc::now().date_naive())
            .await
    }

    pub async fn summarize_as_of(&self, counterparty: &str, as_of: NaiveDate) -> Result<DebtSummary> {
        let key = counterparty.trim().to_lowercase();
        let mut summaries = self.collect(as_of, Some(&key)).await?;
        Ok(summaries.remove(&key).unwrap_or_else(|| DebtSummary {
            counterparty: counterparty.trim().to_string(),
            currency: self.reporting_currency.clone(),
            payable: DebtTotals::default(),
            receivable: DebtTotals::default(),
            account_ids: Vec::new(),
        }))
    }

    /// Summaries for every counterparty, ordered by name.
    pub async fn summarize_all(&self) -> Result<Vec<DebtSummary>> {
        let summaries = self.collect(Utc::now().date_naive(), None).await?;
        Ok(summaries.into_values().collect())
    }

    async fn collect(
        &self,
        as_of: NaiveDate,
        only: Option<&str>,
    ) -> Result<BTreeMap<String, DebtSummary>> {
        let mut summaries: BTreeMap<String, DebtSummary> = BTreeMap::new();

        for account in self.store.list_accounts().await? {
            let Some(terms) = account.debt_terms() else {
                continue;
            };
            let key = terms.counterparty.trim().to_lowercase();
            if only.is_some_and(|only| only != key) {
                continue;
            }

            let totals = self.account_totals(&account).await?;
            let rate = self
                .rates
                .rate(&account.currency, &self.reporting_currency, as_of)
                .await?;
            let converted = totals.scaled(rate);
            debug!(
                "Debt account {} ({}): {:?} -> {:?} {}",
                account.id, account.currency, totals, converted, self.reporting_currency
            );

            let summary = summaries.entry(key).or_insert_with(|| DebtSummary {
                counterparty: terms.counterparty.trim().to_string(),
                currency: self.reporting_currency.clone(),
                payable: DebtTotals::default(),
                receivable: DebtTotals::default(),
                account_ids: Vec::new(),
            });
            match terms.direction {
                DebtDirection::Payable => summary.payable.add(converted),
                DebtDirection::Receivable => summary.receivable.add(converted),
            }
            summary.account_ids.push(account.id.clone());
        }

        for summary in summaries.values_mut() {
            for totals in [&mut summary.payable, &mut summary.receivable] {
                totals.principal = round_amount(totals.principal);
                totals.settled = round_amount(totals.settled);
                totals.interest = round_amount(totals.interest);
            }
        }
        Ok(summaries)
    }

    async fn account_totals(&self, account: &Account) -> Result<DebtTotals> {
        let mut totals = DebtTotals {
            principal: account.initial_balance,
            ..DebtTotals::default()
        };
        for tx in self.store.list_transactions(Some(&account.id)).await? {
            match tx.kind {
                TransactionKind::Append => totals.principal += tx.amount,
                TransactionKind::Interest => totals.interest += tx.amount,
                TransactionKind::Settle => totals.settled += tx.amount,
                // Rejected by the Account Model on debt accounts.
                TransactionKind::Income
                | TransactionKind::Expense
                | TransactionKind::TransferIn
                | TransactionKind::TransferOut => {}
            }
        }
        Ok(totals)
    }
}
