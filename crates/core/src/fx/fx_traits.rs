use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::currency::round_amount;
use crate::errors::Result;

/// Conversion factors between currencies as of a given day.
#[async_trait]
pub trait ExchangeRateLookup: Send + Sync {
    /// Factor converting one unit of `from` into `to`.
    async fn rate(&self, from: &str, to: &str, as_of: NaiveDate) -> Result<Decimal>;

    /// Converts `amount` and rounds it to cents.
    async fn convert(
        &self,
        amount: Decimal,
        from: &str,
        to: &str,
        as_of: NaiveDate,
    ) -> Result<Decimal> {
        let rate = self.rate(from, to, as_of).await?;
        Ok(round_amount(amount * rate))
    }
}
