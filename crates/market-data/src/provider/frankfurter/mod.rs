//! Frankfurter provider for daily reference exchange rates.
//!
//! The Frankfurter API republishes central-bank reference rates once per
//! working day. Requests for weekends or holidays are answered with the
//! previous working day's table, and the response's `date` field says so.
//!
//! Endpoints used:
//! - `GET {base_url}/latest?from=EUR`
//! - `GET {base_url}/2024-03-08?from=EUR`

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, StatusCode};
use std::time::Duration;

use crate::errors::MarketDataError;
use crate::models::RateTable;
use crate::provider::{ProviderCapabilities, RateLimit, RateProvider};

/// Provider ID constant
const PROVIDER_ID: &str = "FRANKFURTER";

/// Public instance of the API
pub const DEFAULT_BASE_URL: &str = "https://api.frankfurter.app";

/// Default HTTP request timeout
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Frankfurter exchange-rate provider.
///
/// # Example
///
/// ```ignore
/// use ledgerkeep_market_data::FrankfurterProvider;
///
/// let provider = FrankfurterProvider::new("https://api.frankfurter.app");
/// let table = provider.latest("EUR").await?;
/// ```
pub struct FrankfurterProvider {
    client: Client,
    base_url: String,
}

impl FrankfurterProvider {
    /// Create a provider pointed at `base_url` (no trailing slash needed).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_timeout(base_url, REQUEST_TIMEOUT)
    }

    /// Create a provider with a custom HTTP timeout.
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn latest_url(&self, base: &str) -> String {
        format!("{}/latest?from={}", self.base_url, base.to_ascii_uppercase())
    }

    fn dated_url(&self, base: &str, date: NaiveDate) -> String {
        format!(
            "{}/{}?from={}",
            self.base_url,
            date.format("%Y-%m-%d"),
            base.to_ascii_uppercase()
        )
    }

    async fn fetch(&self, url: &str, base: &str) -> Result<RateTable, MarketDataError> {
        log::debug!("Fetching exchange rates from {}", url);

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                MarketDataError::Timeout {
                    provider: PROVIDER_ID.to_string(),
                }
            } else {
                MarketDataError::Network(e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(match status {
                StatusCode::NOT_FOUND | StatusCode::UNPROCESSABLE_ENTITY => {
                    MarketDataError::UnsupportedCurrency(base.to_string())
                }
                StatusCode::TOO_MANY_REQUESTS => MarketDataError::RateLimited {
                    provider: PROVIDER_ID.to_string(),
                },
                other => MarketDataError::ProviderError {
                    provider: PROVIDER_ID.to_string(),
                    message: format!("HTTP {}", other.as_u16()),
                },
            });
        }

        let table: RateTable =
            response
                .json()
                .await
                .map_err(|e| MarketDataError::InvalidResponse {
                    provider: PROVIDER_ID.to_string(),
                    message: e.to_string(),
                })?;

        if !table.base.eq_ignore_ascii_case(base) {
            return Err(MarketDataError::InvalidResponse {
                provider: PROVIDER_ID.to_string(),
                message: format!("asked for base {}, got {}", base, table.base),
            });
        }

        Ok(table)
    }
}

#[async_trait]
impl RateProvider for FrankfurterProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            supports_historical: true,
        }
    }

    fn rate_limit(&self) -> RateLimit {
        RateLimit {
            min_delay: Duration::from_millis(250),
        }
    }

    async fn latest(&self, base: &str) -> Result<RateTable, MarketDataError> {
        let url = self.latest_url(base);
        self.fetch(&url, base).await
    }

    async fn on_date(&self, base: &str, date: NaiveDate) -> Result<RateTable, MarketDataError> {
        let url = self.dated_url(base, date);
        self.fetch(&url, base).await
    }
}
