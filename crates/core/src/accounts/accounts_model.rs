//! Account domain models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::ValidationError;
use crate::fx::normalize_currency_code;
use crate::{Error, Result};

/// Closed set of account categories. Drives the operation dispatch table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountCategory {
    Funds,
    Credit,
    Debt,
}

/// Which side of a debt the ledger owner is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DebtDirection {
    /// The owner owes the counterparty.
    Payable,
    /// The counterparty owes the owner.
    Receivable,
}

/// Revolving-credit terms. The balance of a credit account is the amount owed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditTerms {
    pub credit_limit: Decimal,
    /// Lifts both bounds: the limit may be exceeded and the balance may go negative.
    #[serde(default)]
    pub allow_overpay: bool,
    /// Day of month the statement is cut (1..=31).
    pub billing_day: Option<u8>,
    /// Day of month the statement is due (1..=31).
    pub repayment_day: Option<u8>,
}

/// Payable/receivable terms. The balance of a debt account is the outstanding amount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebtTerms {
    pub direction: DebtDirection,
    pub counterparty: String,
}

/// Category together with its category-specific fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountKind {
    Funds,
    Credit(CreditTerms),
    Debt(DebtTerms),
}

impl AccountKind {
    pub fn category(&self) -> AccountCategory {
        match self {
            AccountKind::Funds => AccountCategory::Funds,
            AccountKind::Credit(_) => AccountCategory::Credit,
            AccountKind::Debt(_) => AccountCategory::Debt,
        }
    }
}

/// Domain model representing an account in the ledger.
///
/// There is deliberately no stored "current balance": balances are derived
/// from `initial_balance` and the transaction log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: String,
    pub name: String,
    pub currency: String,
    pub initial_balance: Decimal,
    pub kind: AccountKind,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    pub fn category(&self) -> AccountCategory {
        self.kind.category()
    }

    pub fn credit_terms(&self) -> Option<&CreditTerms> {
        match &self.kind {
            AccountKind::Credit(terms) => Some(terms),
            _ => None,
        }
    }

    pub fn debt_terms(&self) -> Option<&DebtTerms> {
        match &self.kind {
            AccountKind::Debt(terms) => Some(terms),
            _ => None,
        }
    }
}

/// Input model for creating a new account.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAccount {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub currency: String,
    #[serde(default)]
    pub initial_balance: Decimal,
    pub kind: AccountKind,
}

impl NewAccount {
    /// Validates the new account data.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Validation(ValidationError::InvalidInput(
                "Account name cannot be empty".to_string(),
            )));
        }
        if normalize_currency_code(&self.currency).is_none() {
            return Err(Error::Validation(ValidationError::InvalidInput(format!(
                "Invalid currency code: {}",
                self.currency
            ))));
        }
        match &self.kind {
            AccountKind::Funds => {}
            AccountKind::Credit(terms) => {
                if terms.credit_limit.is_sign_negative() {
                    return Err(Error::Validation(ValidationError::InvalidInput(
                        "Credit limit cannot be negative".to_string(),
                    )));
                }
                for day in [terms.billing_day, terms.repayment_day].into_iter().flatten() {
                    if !(1..=31).contains(&day) {
                        return Err(Error::Validation(ValidationError::InvalidInput(format!(
                            "Day of month out of range: {}",
                            day
                        ))));
                    }
                }
            }
            AccountKind::Debt(terms) => {
                if terms.counterparty.trim().is_empty() {
                    return Err(Error::Validation(ValidationError::MissingField(
                        "counterparty".to_string(),
                    )));
                }
                if self.initial_balance.is_sign_negative() {
                    return Err(Error::Validation(ValidationError::InvalidInput(
                        "Debt accounts cannot start with a negative outstanding amount"
                            .to_string(),
                    )));
                }
            }
        }
        Ok(())
    }

    /// Validates and builds the account, generating an id when none was given.
    pub fn into_account(self, now: DateTime<Utc>) -> Result<Account> {
        self.validate()?;
        let currency = normalize_currency_code(&self.currency).unwrap_or_default();
        Ok(Account {
            id: self
                .id
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            name: self.name.trim().to_string(),
            currency,
            initial_balance: self.initial_balance,
            kind: self.kind,
            created_at: now,
            updated_at: now,
        })
    }
}
