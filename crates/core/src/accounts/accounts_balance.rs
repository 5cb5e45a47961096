//! Balance computation for the Account Model.
//!
//! Balances are always derived: `initial_balance` plus the signed sum of the
//! account's transactions. [`BalanceCache`] only memoizes that derivation.

use std::collections::HashMap;
use std::sync::RwLock;

use log::debug;
use rust_decimal::Decimal;

use super::accounts_model::{Account, AccountKind};
use super::accounts_rules::{operation_rule, BalanceBound, BalanceEffect, TransactionKind};
use crate::errors::{LedgerError, ValidationError};
use crate::transactions::Transaction;
use crate::{Error, Result};

/// Signed effect of `kind` on an account's native balance.
pub fn signed_amount(
    account: &Account,
    kind: TransactionKind,
    amount: Decimal,
) -> std::result::Result<Decimal, LedgerError> {
    let category = account.category();
    let rule = operation_rule(category, kind)
        .ok_or(LedgerError::InvalidOperation { category, kind })?;
    Ok(match rule.effect {
        BalanceEffect::Increase => amount,
        BalanceEffect::Decrease => -amount,
    })
}

/// Applies one operation to `balance` and returns the new balance.
///
/// Pure: nothing is persisted. The caller commits the transaction record and
/// the balance change together.
pub fn apply_transaction(
    account: &Account,
    balance: Decimal,
    amount: Decimal,
    kind: TransactionKind,
) -> Result<Decimal> {
    if amount <= Decimal::ZERO {
        return Err(Error::Validation(ValidationError::NonPositiveAmount(amount)));
    }

    let category = account.category();
    let rule = operation_rule(category, kind)
        .ok_or(LedgerError::InvalidOperation { category, kind })?;

    let next = match rule.effect {
        BalanceEffect::Increase => balance + amount,
        BalanceEffect::Decrease => balance - amount,
    };

    match (rule.bound, &account.kind) {
        (BalanceBound::CreditLine, AccountKind::Credit(terms)) if !terms.allow_overpay => {
            // Only the bound the operation moves towards is checked, so a
            // repayment on an account that is already over its limit still
            // goes through.
            let crossed = match rule.effect {
                BalanceEffect::Increase if next > terms.credit_limit => Some(terms.credit_limit),
                BalanceEffect::Decrease if next < Decimal::ZERO => Some(Decimal::ZERO),
                _ => None,
            };
            if let Some(limit) = crossed {
                return Err(LedgerError::LimitExceeded {
                    account_id: account.id.clone(),
                    limit,
                    attempted: next,
                }
                .into());
            }
        }
        (BalanceBound::Outstanding, _) if next < Decimal::ZERO => {
            return Err(LedgerError::LimitExceeded {
                account_id: account.id.clone(),
                limit: balance,
                attempted: next,
            }
            .into());
        }
        _ => {}
    }

    Ok(next)
}

/// Replays the transaction log for `account` from its initial balance.
///
/// Transactions belonging to other accounts are ignored, so the whole ledger
/// can be passed in.
pub fn derive_balance(account: &Account, transactions: &[Transaction]) -> Result<Decimal> {
    transactions
        .iter()
        .filter(|tx| tx.account_id == account.id)
        .try_fold(account.initial_balance, |balance, tx| -> Result<Decimal> {
            Ok(balance + signed_amount(account, tx.kind, tx.amount)?)
        })
}

/// Memoized derived balances, invalidated per account on every write.
#[derive(Debug, Default)]
pub struct BalanceCache {
    balances: RwLock<HashMap<String, Decimal>>,
}

impl BalanceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, account_id: &str) -> Option<Decimal> {
        self.balances
            .read()
            .ok()
            .and_then(|balances| balances.get(account_id).copied())
    }

    /// Returns the cached balance, deriving and caching it on a miss.
    pub fn get_or_derive(&self, account: &Account, transactions: &[Transaction]) -> Result<Decimal> {
        if let Some(balance) = self.get(&account.id) {
            return Ok(balance);
        }
        let balance = derive_balance(account, transactions)?;
        debug!("Derived balance {} for account {}", balance, account.id);
        if let Ok(mut balances) = self.balances.write() {
            balances.insert(account.id.clone(), balance);
        }
        Ok(balance)
    }

    pub fn invalidate(&self, account_id: &str) {
        if let Ok(mut balances) = self.balances.write() {
            balances.remove(account_id);
        }
    }

    pub fn clear(&self) {
        if let Ok(mut balances) = self.balances.write() {
            balances.clear();
        }
    }
}
