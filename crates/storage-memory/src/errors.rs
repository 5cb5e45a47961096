//! Storage-specific error types.
//!
//! These errors never leave the crate: they are converted into
//! `ledgerkeep_core::Error` at the store boundary.

use ledgerkeep_core::errors::{Error, StoreError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Snapshot could not be (de)serialized: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Writer task is not running")]
    WriterStopped,

    #[error("Ledger state lock poisoned")]
    LockPoisoned,

    #[error("Writer returned an unexpected result type")]
    ResultType,
}

impl From<StorageError> for Error {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Io(e) => Error::Store(StoreError::Unavailable(e.to_string())),
            StorageError::WriterStopped => {
                Error::Store(StoreError::Unavailable("ledger writer stopped".to_string()))
            }
            StorageError::Serialization(e) => Error::Store(StoreError::Integrity(e.to_string())),
            StorageError::LockPoisoned | StorageError::ResultType => {
                Error::Unexpected(err.to_string())
            }
        }
    }
}

/// Converts I/O and serde results into core results through [`StorageError`].
pub trait IntoCore<T> {
    fn into_core(self) -> ledgerkeep_core::Result<T>;
}

impl<T> IntoCore<T> for std::result::Result<T, std::io::Error> {
    fn into_core(self) -> ledgerkeep_core::Result<T> {
        self.map_err(|e| StorageError::from(e).into())
    }
}

impl<T> IntoCore<T> for std::result::Result<T, serde_json::Error> {
    fn into_core(self) -> ledgerkeep_core::Result<T> {
        self.map_err(|e| StorageError::from(e).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_failure_is_transient() {
        let err: Error =
            StorageError::Io(std::io::Error::new(std::io::ErrorKind::TimedOut, "slow disk")).into();
        assert!(err.is_transient());
    }

    #[test]
    fn test_corrupt_snapshot_is_not_transient() {
        let parse = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: Error = StorageError::Serialization(parse).into();
        assert!(matches!(err, Error::Store(StoreError::Integrity(_))));
        assert!(!err.is_transient());
    }
}
