use thiserror::Error;

/// Errors raised by the exchange-rate cache.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FxError {
    /// No rate could be fetched and nothing usable is cached.
    #[error("No exchange rate available for {from}/{to}: {reason}")]
    RateUnavailable {
        from: String,
        to: String,
        reason: String,
    },

    /// The rate source does not know this currency. Retrying will not help.
    #[error("Unsupported currency: {0}")]
    UnsupportedCurrency(String),

    #[error("Invalid currency code: {0}")]
    InvalidCurrencyCode(String),

    #[error("Rate cache error: {0}")]
    CacheError(String),
}

impl FxError {
    pub fn is_transient(&self) -> bool {
        matches!(self, FxError::RateUnavailable { .. })
    }
}
