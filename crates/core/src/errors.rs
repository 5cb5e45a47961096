//! Core error types for the Ledgerkeep engine.
//!
//! This module defines storage-agnostic error types. Storage-specific errors
//! are converted to these types by the storage layer.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::accounts::{AccountCategory, TransactionKind};
use crate::fx::FxError;

/// Type alias for Result using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Root error type for the engine.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Ledger rule violated: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Store operation failed: {0}")]
    Store(#[from] StoreError),

    #[error("Fx error: {0}")]
    Fx(#[from] FxError),

    #[error("Input validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Periodic definition {definition_id} invalidated: {reason}")]
    DefinitionInvalidated {
        definition_id: String,
        reason: String,
    },

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl Error {
    /// Whether the failure is expected to clear up on its own.
    ///
    /// Transient failures abort the current pass and ask the trigger source
    /// to re-run it later. Everything else is surfaced to the caller.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Fx(err) => err.is_transient(),
            Error::Store(StoreError::Unavailable(_)) => true,
            _ => false,
        }
    }
}

/// Account Model rejections.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// The operation is not permitted for the account's category.
    #[error("{kind:?} is not permitted on a {category:?} account")]
    InvalidOperation {
        category: AccountCategory,
        kind: TransactionKind,
    },

    /// The resulting balance would leave the account's allowed range.
    #[error("Account {account_id}: resulting balance {attempted} is outside the allowed range (limit {limit})")]
    LimitExceeded {
        account_id: String,
        limit: Decimal,
        attempted: Decimal,
    },
}

/// Storage-agnostic error type for store operations.
///
/// Implementations of the store contracts convert their own failures into
/// one of these variants.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The store cannot be reached or did not answer in time.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// The requested record was not found.
    #[error("Record not found: {0}")]
    NotFound(String),

    /// A write was refused because it would break store integrity.
    #[error("Integrity violation: {0}")]
    Integrity(String),
}

/// Validation errors for user input and data parsing.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Required field '{0}' is missing")]
    MissingField(String),

    #[error("Amount must be positive, got {0}")]
    NonPositiveAmount(Decimal),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Validation(ValidationError::InvalidInput(err.to_string()))
    }
}

impl From<Error> for String {
    fn from(err: Error) -> Self {
        err.to_string()
    }
}
