//! Transaction domain models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::accounts::TransactionKind;
use crate::errors::ValidationError;
use crate::periodic::PeriodicDefinition;
use crate::{Error, Result};

/// Where a transaction came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionSource {
    Manual,
    Periodic {
        #[serde(rename = "definitionId")]
        definition_id: String,
    },
}

impl TransactionSource {
    pub fn definition_id(&self) -> Option<&str> {
        match self {
            TransactionSource::Manual => None,
            TransactionSource::Periodic { definition_id } => Some(definition_id),
        }
    }
}

/// A posted transaction.
///
/// `amount` is unsigned and in the account's native currency; the signed
/// effect is derived from the account category and `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub account_id: String,
    pub kind: TransactionKind,
    pub amount: Decimal,
    /// Amount as entered, when it was converted from another currency.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_amount: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_currency: Option<String>,
    pub occurred_at: DateTime<Utc>,
    pub source: TransactionSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    pub fn new(
        account_id: impl Into<String>,
        kind: TransactionKind,
        amount: Decimal,
        occurred_at: DateTime<Utc>,
        source: TransactionSource,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            account_id: account_id.into(),
            kind,
            amount,
            original_amount: None,
            original_currency: None,
            occurred_at,
            source,
            note: None,
            updated_at: Utc::now(),
        }
    }

    pub fn with_original(mut self, amount: Decimal, currency: impl Into<String>) -> Self {
        self.original_amount = Some(amount);
        self.original_currency = Some(currency.into());
        self
    }

    pub fn with_note(mut self, note: Option<String>) -> Self {
        self.note = note;
        self
    }

    /// Key under which two independently created records are considered the
    /// same real-world transaction.
    pub fn dedup_key(&self) -> DedupKey {
        DedupKey {
            account_id: self.account_id.clone(),
            amount: self.amount.normalize(),
            occurred_at: self.occurred_at,
            source: self.source.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey {
    pub account_id: String,
    pub amount: Decimal,
    pub occurred_at: DateTime<Utc>,
    pub source: TransactionSource,
}

/// Input model for a manually entered transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTransaction {
    pub account_id: String,
    pub kind: TransactionKind,
    pub amount: Decimal,
    /// Currency the amount was entered in. Defaults to the account currency.
    #[serde(default)]
    pub currency: Option<String>,
    pub occurred_at: DateTime<Utc>,
    #[serde(default)]
    pub note: Option<String>,
}

impl NewTransaction {
    pub fn validate(&self) -> Result<()> {
        if self.account_id.trim().is_empty() {
            return Err(Error::Validation(ValidationError::MissingField(
                "accountId".to_string(),
            )));
        }
        if self.amount <= Decimal::ZERO {
            return Err(Error::Validation(ValidationError::NonPositiveAmount(
                self.amount,
            )));
        }
        Ok(())
    }
}

/// Input model for a manual transfer between two accounts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTransfer {
    pub from_account_id: String,
    pub to_account_id: String,
    pub amount: Decimal,
    #[serde(default)]
    pub currency: Option<String>,
    pub occurred_at: DateTime<Utc>,
    #[serde(default)]
    pub note: Option<String>,
}

impl NewTransfer {
    pub fn validate(&self) -> Result<()> {
        if self.from_account_id == self.to_account_id {
            return Err(Error::Validation(ValidationError::InvalidInput(
                "Cannot transfer to the same account".to_string(),
            )));
        }
        if self.amount <= Decimal::ZERO {
            return Err(Error::Validation(ValidationError::NonPositiveAmount(
                self.amount,
            )));
        }
        Ok(())
    }
}

/// Advance of a periodic definition committed together with its posting.
///
/// The store only accepts it while the stored definition is still due at
/// `expected_next_due`, so an occurrence can never be posted twice.
#[derive(Debug, Clone, PartialEq)]
pub struct DefinitionAdvance {
    pub expected_next_due: DateTime<Utc>,
    pub definition: PeriodicDefinition,
}

/// One atomic store write: all legs and the definition advance, or nothing.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Posting {
    pub transactions: Vec<Transaction>,
    pub advance: Option<DefinitionAdvance>,
}

impl Posting {
    pub fn manual(transactions: Vec<Transaction>) -> Self {
        Self {
            transactions,
            advance: None,
        }
    }

    pub fn account_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .transactions
            .iter()
            .map(|tx| tx.account_id.clone())
            .collect();
        ids.sort();
        ids.dedup();
        ids
    }
}

/// Outcome of a committed posting.
#[derive(Debug, Clone, PartialEq)]
pub struct PostingReceipt {
    pub transaction_ids: Vec<String>,
    /// New derived balance per affected account.
    pub balances: Vec<(String, Decimal)>,
}

impl PostingReceipt {
    pub fn balance_of(&self, account_id: &str) -> Option<Decimal> {
        self.balances
            .iter()
            .find(|(id, _)| id == account_id)
            .map(|(_, balance)| *balance)
    }
}
