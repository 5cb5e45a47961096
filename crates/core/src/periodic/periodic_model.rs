//! Periodic transaction domain models.

use chrono::{DateTime, Datelike, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::accounts::{DebtDirection, TransactionKind};
use crate::errors::ValidationError;
use crate::fx::normalize_currency_code;
use crate::utils::time_utils::{add_days, add_months_clamped};
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecurrenceUnit {
    Day,
    Week,
    Month,
    Year,
}

/// "Every `interval` `unit`s", stepping month and year intervals relative to
/// the anchor's day of month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recurrence {
    pub interval: u32,
    pub unit: RecurrenceUnit,
    pub anchor: DateTime<Utc>,
}

impl Recurrence {
    pub fn new(interval: u32, unit: RecurrenceUnit, anchor: DateTime<Utc>) -> Self {
        Self {
            interval,
            unit,
            anchor,
        }
    }

    pub fn every_days(days: u32, anchor: DateTime<Utc>) -> Self {
        Self::new(days, RecurrenceUnit::Day, anchor)
    }

    pub fn every_weeks(weeks: u32, anchor: DateTime<Utc>) -> Self {
        Self::new(weeks, RecurrenceUnit::Week, anchor)
    }

    pub fn every_months(months: u32, anchor: DateTime<Utc>) -> Self {
        Self::new(months, RecurrenceUnit::Month, anchor)
    }

    /// The occurrence following `due`.
    ///
    /// Always computed from the previous occurrence, never from the wall
    /// clock, so a late pass does not shift the schedule.
    pub fn next_after(&self, due: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if self.interval == 0 {
            return None;
        }
        match self.unit {
            RecurrenceUnit::Day => add_days(due, self.interval as i64),
            RecurrenceUnit::Week => add_days(due, self.interval as i64 * 7),
            RecurrenceUnit::Month => add_months_clamped(due, self.interval, self.anchor.day()),
            RecurrenceUnit::Year => {
                add_months_clamped(due, self.interval.checked_mul(12)?, self.anchor.day())
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PeriodicKind {
    Income,
    Expense,
    /// Moves money from the source account to the counter account.
    Transfer,
    /// Incurs more debt on the source (debt) account.
    DebtAppend,
    /// Pays down the source (debt) account. Completes when it reaches zero.
    DebtSettle,
}

impl PeriodicKind {
    /// Operation applied to the source account.
    pub fn source_operation(self) -> TransactionKind {
        match self {
            PeriodicKind::Income => TransactionKind::Income,
            PeriodicKind::Expense => TransactionKind::Expense,
            PeriodicKind::Transfer => TransactionKind::TransferOut,
            PeriodicKind::DebtAppend => TransactionKind::Append,
            PeriodicKind::DebtSettle => TransactionKind::Settle,
        }
    }

    /// Operation applied to the counter account, if one is linked.
    ///
    /// For debt schedules the cash side depends on the direction: repaying a
    /// payable debt takes money out, collecting a receivable brings it in.
    pub fn counter_operation(self, direction: Option<DebtDirection>) -> Option<TransactionKind> {
        match (self, direction) {
            (PeriodicKind::Income | PeriodicKind::Expense, _) => None,
            (PeriodicKind::Transfer, _) => Some(TransactionKind::TransferIn),
            (PeriodicKind::DebtAppend, Some(DebtDirection::Payable))
            | (PeriodicKind::DebtSettle, Some(DebtDirection::Receivable)) => {
                Some(TransactionKind::TransferIn)
            }
            (PeriodicKind::DebtAppend, Some(DebtDirection::Receivable))
            | (PeriodicKind::DebtSettle, Some(DebtDirection::Payable)) => {
                Some(TransactionKind::TransferOut)
            }
            (PeriodicKind::DebtAppend | PeriodicKind::DebtSettle, None) => None,
        }
    }

    pub fn requires_counter_account(self) -> bool {
        self == PeriodicKind::Transfer
    }
}

/// Lifecycle of a single occurrence.
///
/// `Scheduled -> Due -> Executing -> {Posted, Failed}`. `Posted` moves the
/// definition to its next occurrence; `Failed` keeps the same one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OccurrenceState {
    Scheduled,
    Due,
    Executing,
    Posted,
    Failed,
}

/// A user-defined recurring transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodicDefinition {
    pub id: String,
    pub account_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counter_account_id: Option<String>,
    pub kind: PeriodicKind,
    pub amount: Decimal,
    pub currency: String,
    pub recurrence: Recurrence,
    pub next_due: DateTime<Utc>,
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl PeriodicDefinition {
    pub fn state_at(&self, now: DateTime<Utc>) -> OccurrenceState {
        if self.active && self.next_due <= now {
            OccurrenceState::Due
        } else {
            OccurrenceState::Scheduled
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.state_at(now) == OccurrenceState::Due
    }

    /// Copy advanced to the occurrence after the current one.
    pub fn advanced(&self, now: DateTime<Utc>) -> Option<Self> {
        let next_due = self.recurrence.next_after(self.next_due)?;
        Some(Self {
            next_due,
            updated_at: now,
            ..self.clone()
        })
    }

    pub fn deactivated(&self, now: DateTime<Utc>) -> Self {
        Self {
            active: false,
            updated_at: now,
            ..self.clone()
        }
    }
}

/// Input model for creating a periodic definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPeriodicDefinition {
    #[serde(default)]
    pub id: Option<String>,
    pub account_id: String,
    #[serde(default)]
    pub counter_account_id: Option<String>,
    pub kind: PeriodicKind,
    pub amount: Decimal,
    pub currency: String,
    pub recurrence: Recurrence,
    /// First occurrence. Defaults to the recurrence anchor.
    #[serde(default)]
    pub first_due: Option<DateTime<Utc>>,
    #[serde(default)]
    pub note: Option<String>,
}

impl NewPeriodicDefinition {
    pub fn validate(&self) -> Result<()> {
        if self.amount <= Decimal::ZERO {
            return Err(Error::Validation(ValidationError::NonPositiveAmount(
                self.amount,
            )));
        }
        if self.recurrence.interval == 0 {
            return Err(Error::Validation(ValidationError::InvalidInput(
                "Recurrence interval must be at least 1".to_string(),
            )));
        }
        if normalize_currency_code(&self.currency).is_none() {
            return Err(Error::Validation(ValidationError::InvalidInput(format!(
                "Invalid currency code: {}",
                self.currency
            ))));
        }
        match (&self.counter_account_id, self.kind.requires_counter_account()) {
            (None, true) => {
                return Err(Error::Validation(ValidationError::MissingField(
                    "counterAccountId".to_string(),
                )))
            }
            (Some(counter), _) if counter == &self.account_id => {
                return Err(Error::Validation(ValidationError::InvalidInput(
                    "Counter account must differ from the source account".to_string(),
                )))
            }
            _ => {}
        }
        Ok(())
    }

    pub fn into_definition(self, now: DateTime<Utc>) -> Result<PeriodicDefinition> {
        self.validate()?;
        let currency = normalize_currency_code(&self.currency).unwrap_or_default();
        let counter_account_id = match self.kind {
            PeriodicKind::Income | PeriodicKind::Expense => None,
            _ => self.counter_account_id,
        };
        Ok(PeriodicDefinition {
            id: self.id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            account_id: self.account_id,
            counter_account_id,
            kind: self.kind,
            amount: self.amount,
            currency,
            next_due: self.first_due.unwrap_or(self.recurrence.anchor),
            recurrence: self.recurrence,
            active: true,
            note: self.note,
            updated_at: now,
        })
    }
}
