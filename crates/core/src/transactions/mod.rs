//! Transactions module - transaction records, postings and the manual entry path.

mod transactions_model;
mod transactions_posting;
mod transactions_service;

#[cfg(test)]
mod transactions_service_tests;

pub use transactions_model::{
    DedupKey, DefinitionAdvance, NewTransaction, NewTransfer, Posting, PostingReceipt,
    Transaction, TransactionSource,
};
pub use transactions_posting::{check_advance, validate_posting};
pub use transactions_service::LedgerService;
