//! Operation dispatch table: {category, kind} -> rule.
//!
//! Every combination is spelled out so that adding a category or a kind
//! fails to compile until its rules are decided.

use serde::{Deserialize, Serialize};

use super::accounts_model::AccountCategory;

/// Kinds of transaction that can be posted against an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionKind {
    Income,
    Expense,
    TransferIn,
    TransferOut,
    /// Incur more debt (borrow or lend).
    Append,
    /// Interest accrued on a debt; an append that is reported separately.
    Interest,
    /// Repay or collect debt.
    Settle,
}

/// Direction in which an operation moves the account's native balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceEffect {
    Increase,
    Decrease,
}

/// Which bound the resulting balance is checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceBound {
    Unbounded,
    /// `0 <= balance <= credit_limit`, unless overpay is allowed.
    CreditLine,
    /// `balance >= 0`: a debt cannot be settled beyond what is outstanding.
    Outstanding,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationRule {
    pub effect: BalanceEffect,
    pub bound: BalanceBound,
}

const fn rule(effect: BalanceEffect, bound: BalanceBound) -> Option<OperationRule> {
    Some(OperationRule { effect, bound })
}

/// Returns the rule for `kind` on an account of `category`, or `None` when
/// the operation is not permitted.
pub const fn operation_rule(
    category: AccountCategory,
    kind: TransactionKind,
) -> Option<OperationRule> {
    use AccountCategory as C;
    use BalanceBound as B;
    use BalanceEffect::{Decrease, Increase};
    use TransactionKind as K;

    match (category, kind) {
        (C::Funds, K::Income | K::TransferIn) => rule(Increase, B::Unbounded),
        (C::Funds, K::Expense | K::TransferOut) => rule(Decrease, B::Unbounded),
        (C::Funds, K::Append | K::Interest | K::Settle) => None,

        // Credit balance is the amount owed: spending raises it.
        (C::Credit, K::Expense | K::TransferOut) => rule(Increase, B::CreditLine),
        (C::Credit, K::Income | K::TransferIn) => rule(Decrease, B::CreditLine),
        (C::Credit, K::Append | K::Interest | K::Settle) => None,

        (C::Debt, K::Append | K::Interest) => rule(Increase, B::Unbounded),
        (C::Debt, K::Settle) => rule(Decrease, B::Outstanding),
        (C::Debt, K::Income | K::Expense | K::TransferIn | K::TransferOut) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_KINDS: [TransactionKind; 7] = [
        TransactionKind::Income,
        TransactionKind::Expense,
        TransactionKind::TransferIn,
        TransactionKind::TransferOut,
        TransactionKind::Append,
        TransactionKind::Interest,
        TransactionKind::Settle,
    ];

    #[test]
    fn test_debt_only_allows_append_interest_settle() {
        let allowed: Vec<_> = ALL_KINDS
            .into_iter()
            .filter(|k| operation_rule(AccountCategory::Debt, *k).is_some())
            .collect();
        assert_eq!(
            allowed,
            vec![
                TransactionKind::Append,
                TransactionKind::Interest,
                TransactionKind::Settle
            ]
        );
    }

    #[test]
    fn test_funds_and_credit_reject_debt_operations() {
        for category in [AccountCategory::Funds, AccountCategory::Credit] {
            for kind in [
                TransactionKind::Append,
                TransactionKind::Interest,
                TransactionKind::Settle,
            ] {
                assert!(operation_rule(category, kind).is_none());
            }
        }
    }

    #[test]
    fn test_credit_spending_increases_owed() {
        let rule = operation_rule(AccountCategory::Credit, TransactionKind::Expense).unwrap();
        assert_eq!(rule.effect, BalanceEffect::Increase);
        assert_eq!(rule.bound, BalanceBound::CreditLine);
    }
}
