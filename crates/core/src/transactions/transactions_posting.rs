//! Commit-time checks shared by store implementations.

use std::collections::HashMap;

use rust_decimal::Decimal;

use super::transactions_model::{DefinitionAdvance, Posting};
use crate::accounts::{apply_transaction, Account};
use crate::errors::{Result, StoreError};
use crate::periodic::PeriodicDefinition;

/// Validates every leg of `posting` against the Account Model, in order.
///
/// `balance_of` supplies the committed balance of an account; legs hitting
/// the same account see each other's effect. Returns the resulting balance per
/// affected account, in first-touched order. Store implementations call this
/// while holding their write lock and only write when it succeeds.
pub fn validate_posting<A, B>(
    posting: &Posting,
    mut account_of: A,
    mut balance_of: B,
) -> Result<Vec<(String, Decimal)>>
where
    A: FnMut(&str) -> Option<Account>,
    B: FnMut(&Account) -> Result<Decimal>,
{
    let mut order: Vec<String> = Vec::new();
    let mut balances: HashMap<String, Decimal> = HashMap::new();

    for tx in &posting.transactions {
        let account = account_of(&tx.account_id)
            .ok_or_else(|| StoreError::NotFound(format!("account {}", tx.account_id)))?;
        let current = match balances.get(&account.id) {
            Some(balance) => *balance,
            None => {
                order.push(account.id.clone());
                balance_of(&account)?
            }
        };
        let next = apply_transaction(&account, current, tx.amount, tx.kind)?;
        balances.insert(account.id.clone(), next);
    }

    Ok(order
        .into_iter()
        .map(|id| {
            let balance = balances.get(&id).copied().unwrap_or_default();
            (id, balance)
        })
        .collect())
}

/// Checks that the stored definition is still at the occurrence the advance
/// was computed from.
pub fn check_advance(
    advance: &DefinitionAdvance,
    stored: Option<&PeriodicDefinition>,
) -> Result<()> {
    let id = &advance.definition.id;
    let still_due = stored
        .map(|stored| stored.active && stored.next_due == advance.expected_next_due)
        .unwrap_or(false);
    if !still_due {
        return Err(StoreError::Integrity(format!(
            "periodic definition {} is no longer due at {}",
            id, advance.expected_next_due
        ))
        .into());
    }
    Ok(())
}
