//! Exchange-rate provider trait definitions.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::errors::MarketDataError;
use crate::models::RateTable;

use super::capabilities::{ProviderCapabilities, RateLimit};

/// Trait for exchange-rate providers.
///
/// Implement this trait to add support for a new rate source. Providers
/// perform one request per call; they do not cache and do not retry.
#[async_trait]
pub trait RateProvider: Send + Sync {
    /// Unique identifier for this provider, e.g. "FRANKFURTER".
    fn id(&self) -> &'static str;

    /// Describes what this provider can do.
    fn capabilities(&self) -> ProviderCapabilities;

    /// Rate limiting configuration.
    fn rate_limit(&self) -> RateLimit {
        RateLimit::default()
    }

    /// Fetch the most recently published table for `base`.
    ///
    /// The returned table's `date` is the provider's publication day.
    async fn latest(&self, base: &str) -> Result<RateTable, MarketDataError>;

    /// Fetch the table published for `base` on `date`.
    ///
    /// Providers may answer with the closest earlier publication day
    /// (e.g. a Friday table for a Sunday request). Default implementation
    /// reports the capability as missing.
    async fn on_date(&self, base: &str, date: NaiveDate) -> Result<RateTable, MarketDataError> {
        let _ = date;
        Err(MarketDataError::ProviderError {
            provider: self.id().to_string(),
            message: format!("historical rates not supported (base {})", base),
        })
    }
}
