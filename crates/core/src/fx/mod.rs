//! FX module - currency codes, exchange-rate cache and conversion.

pub mod currency;
mod fx_errors;
mod fx_traits;
mod rate_cache;

#[cfg(test)]
mod rate_cache_tests;

pub use currency::{normalize_currency_code, round_amount};
pub use fx_errors::FxError;
pub use fx_traits::ExchangeRateLookup;
pub use rate_cache::{ExchangeRateCache, RateCacheConfig};
