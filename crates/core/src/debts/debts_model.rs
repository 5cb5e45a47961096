use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Running totals for one direction of debt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebtTotals {
    /// Opening balances plus every append.
    pub principal: Decimal,
    /// Repaid or collected to date.
    pub settled: Decimal,
    /// Accrued interest.
    pub interest: Decimal,
}

impl DebtTotals {
    pub fn outstanding(&self) -> Decimal {
        self.principal + self.interest - self.settled
    }

    pub(crate) fn add(&mut self, other: DebtTotals) {
        self.principal += other.principal;
        self.settled += other.settled;
        self.interest += other.interest;
    }

    pub(crate) fn scaled(self, rate: Decimal) -> DebtTotals {
        DebtTotals {
            principal: self.principal * rate,
            settled: self.settled * rate,
            interest: self.interest * rate,
        }
    }
}

/// Derived view of everything owed to or by one counterparty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebtSummary {
    pub counterparty: String,
    /// Reporting currency every amount is expressed in.
    pub currency: String,
    /// What the owner owes the counterparty.
    pub payable: DebtTotals,
    /// What the counterparty owes the owner.
    pub receivable: DebtTotals,
    pub account_ids: Vec<String>,
}

impl DebtSummary {
    /// Positive when the counterparty owes the owner on balance.
    pub fn net_position(&self) -> Decimal {
        self.receivable.outstanding() - self.payable.outstanding()
    }
}
