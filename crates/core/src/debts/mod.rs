//! Debt summaries - per-counterparty aggregates over DEBT accounts.

mod debts_model;
mod debts_service;


pub use debts_model::{DebtSummary, DebtTotals};
pub use debts_service::DebtSummaryService;
