use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::Currency;

/// Conversion factors published by a provider for one base currency.
///
/// Mirrors the wire shape `{amount, base, date, rates: {code: factor}}`.
/// `date` is the provider's own publication day, which may differ from the
/// day that was requested (weekends, holidays, time zones).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateTable {
    /// Amount of `base` the factors refer to (almost always 1).
    #[serde(default = "default_amount")]
    pub amount: Decimal,
    pub base: Currency,
    pub date: NaiveDate,
    pub rates: HashMap<Currency, Decimal>,
}

fn default_amount() -> Decimal {
    Decimal::ONE
}

impl RateTable {
    /// Factor converting one unit of `base` into `to`.
    pub fn factor(&self, to: &str) -> Option<Decimal> {
        if to.eq_ignore_ascii_case(&self.base) {
            return Some(Decimal::ONE);
        }
        if self.amount.is_zero() {
            return None;
        }
        self.rates
            .get(to)
            .or_else(|| self.rates.get(&to.to_ascii_uppercase()))
            .map(|rate| *rate / self.amount)
    }

    /// Factor converting one unit of `from` into `base`, derived by inversion.
    pub fn inverse_factor(&self, from: &str) -> Option<Decimal> {
        self.factor(from)
            .filter(|rate| !rate.is_zero())
            .map(|rate| Decimal::ONE / rate)
    }
}
