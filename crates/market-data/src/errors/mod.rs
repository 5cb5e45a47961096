//! Error types and retry classification for the market data crate.
//!
//! This module provides:
//! - [`MarketDataError`]: The main error enum for all rate fetches
//! - [`RetryClass`]: Classification for determining retry behavior

mod retry;

pub use retry::RetryClass;

use thiserror::Error;

/// Errors that can occur while fetching exchange rates.
///
/// Each variant is classified into a [`RetryClass`] via the
/// [`retry_class`](Self::retry_class) method.
#[derive(Error, Debug)]
pub enum MarketDataError {
    /// The provider does not know the requested currency.
    /// This is a terminal error - retrying won't help.
    #[error("Unsupported currency: {0}")]
    UnsupportedCurrency(String),

    /// The provider rate limited the request (HTTP 429).
    #[error("Rate limited: {provider}")]
    RateLimited {
        /// The provider that rate limited the request
        provider: String,
    },

    /// The request to the provider timed out.
    #[error("Timeout: {provider}")]
    Timeout {
        /// The provider that timed out
        provider: String,
    },

    /// A provider-specific error occurred (non-success status, server error).
    #[error("Provider error: {provider} - {message}")]
    ProviderError {
        /// The provider that returned the error
        provider: String,
        /// The error message from the provider
        message: String,
    },

    /// The provider answered, but the payload could not be understood.
    #[error("Invalid response from {provider}: {message}")]
    InvalidResponse {
        /// The provider that returned the payload
        provider: String,
        /// What was wrong with it
        message: String,
    },

    /// A network error occurred while communicating with a provider.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl MarketDataError {
    /// Returns the retry classification for this error.
    ///
    /// # Examples
    ///
    /// ```
    /// use ledgerkeep_market_data::errors::{MarketDataError, RetryClass};
    ///
    /// let error = MarketDataError::RateLimited { provider: "FRANKFURTER".to_string() };
    /// assert_eq!(error.retry_class(), RetryClass::WithBackoff);
    ///
    /// let error = MarketDataError::UnsupportedCurrency("XYZ".to_string());
    /// assert_eq!(error.retry_class(), RetryClass::Never);
    /// ```
    pub fn retry_class(&self) -> RetryClass {
        match self {
            Self::UnsupportedCurrency(_) | Self::InvalidResponse { .. } => RetryClass::Never,

            Self::RateLimited { .. }
            | Self::Timeout { .. }
            | Self::ProviderError { .. }
            | Self::Network(_) => RetryClass::WithBackoff,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_currency_never_retries() {
        let error = MarketDataError::UnsupportedCurrency("XYZ".to_string());
        assert_eq!(error.retry_class(), RetryClass::Never);
    }

    #[test]
    fn test_invalid_response_never_retries() {
        let error = MarketDataError::InvalidResponse {
            provider: "FRANKFURTER".to_string(),
            message: "missing rates".to_string(),
        };
        assert_eq!(error.retry_class(), RetryClass::Never);
    }

    #[test]
    fn test_rate_limited_retries_with_backoff() {
        let error = MarketDataError::RateLimited {
            provider: "FRANKFURTER".to_string(),
        };
        assert_eq!(error.retry_class(), RetryClass::WithBackoff);
    }

    #[test]
    fn test_timeout_retries_with_backoff() {
        let error = MarketDataError::Timeout {
            provider: "FRANKFURTER".to_string(),
        };
        assert_eq!(error.retry_class(), RetryClass::WithBackoff);
    }

    #[test]
    fn test_error_display() {
        let error = MarketDataError::UnsupportedCurrency("XYZ".to_string());
        assert_eq!(format!("{}", error), "Unsupported currency: XYZ");

        let error = MarketDataError::ProviderError {
            provider: "FRANKFURTER".to_string(),
            message: "HTTP 502".to_string(),
        };
        assert_eq!(
            format!("{}", error),
            "Provider error: FRANKFURTER - HTTP 502"
        );
    }
}
