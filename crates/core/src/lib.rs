//! Ledgerkeep Core - balance rules, periodic scheduling and sync reconciliation.
//!
//! This crate contains the consistency engine of a personal ledger.
//! It is storage-agnostic and defines traits (`LedgerStore`,
//! `RemoteLedgerStore`, `ExchangeRateLookup`) that are implemented by
//! storage crates and by the market-data crate.

pub mod accounts;
pub mod debts;
pub mod errors;
pub mod events;
pub mod fx;
pub mod periodic;
pub mod store;
pub mod sync;
pub mod transactions;
pub mod utils;

// Re-export error types
pub use errors::Error;
pub use errors::Result;

#[cfg(test)]
mod test_support;
