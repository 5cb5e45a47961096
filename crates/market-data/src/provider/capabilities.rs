//! Provider capabilities and rate limiting configuration.

use std::time::Duration;

/// Describes what an exchange-rate provider can do.
#[derive(Clone, Debug)]
pub struct ProviderCapabilities {
    /// Whether the provider can serve tables for a past date.
    pub supports_historical: bool,
}

/// Rate limiting configuration for a provider.
///
/// Controls how aggressively we can call a provider to avoid
/// hitting their rate limits and getting blocked.
#[derive(Clone, Debug)]
pub struct RateLimit {
    /// Minimum delay between requests.
    pub min_delay: Duration,
}

impl Default for RateLimit {
    fn default() -> Self {
        Self {
            min_delay: Duration::from_millis(100),
        }
    }
}
