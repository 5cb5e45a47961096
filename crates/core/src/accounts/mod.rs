//! Accounts module - categories, balance rules and balance derivation.

mod accounts_balance;
mod accounts_model;
mod accounts_rules;


// Re-export the public interface
pub use accounts_balance::{apply_transaction, derive_balance, signed_amount, BalanceCache};
pub use accounts_model::{
    Account, AccountCategory, AccountKind, CreditTerms, DebtDirection, DebtTerms, NewAccount,
};
pub use accounts_rules::{operation_rule, BalanceBound, BalanceEffect, OperationRule, TransactionKind};
