//! Tests for the exchange-rate cache.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use ledgerkeep_market_data::{MarketDataError, ProviderCapabilities, RateProvider, RateTable};

use super::{ExchangeRateCache, ExchangeRateLookup, FxError, RateCacheConfig};
use crate::Error;

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn table(base: &str, date: NaiveDate, rates: &[(&str, Decimal)]) -> RateTable {
    RateTable {
        amount: Decimal::ONE,
        base: base.to_string(),
        date,
        rates: rates
            .iter()
            .map(|(code, rate)| (code.to_string(), *rate))
            .collect::<HashMap<_, _>>(),
    }
}

#[derive(Default)]
struct MockProvider {
    tables: Mutex<HashMap<String, RateTable>>,
    calls: AtomicUsize,
    offline: AtomicBool,
    unsupported: AtomicBool,
    delay: Mutex<Option<Duration>>,
}

impl MockProvider {
    fn with_table(table: RateTable) -> Arc<Self> {
        let provider = Self::default();
        provider
            .tables
            .lock()
            .unwrap()
            .insert(table.base.clone(), table);
        Arc::new(provider)
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn answer(&self, base: &str) -> Result<RateTable, MarketDataError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.offline.load(Ordering::SeqCst) {
            return Err(MarketDataError::ProviderError {
                provider: "MOCK".to_string(),
                message: "offline".to_string(),
            });
        }
        if self.unsupported.load(Ordering::SeqCst) {
            return Err(MarketDataError::UnsupportedCurrency(base.to_string()));
        }
        self.tables
            .lock()
            .unwrap()
            .get(base)
            .cloned()
            .ok_or_else(|| MarketDataError::UnsupportedCurrency(base.to_string()))
    }
}

#[async_trait]
impl RateProvider for MockProvider {
    fn id(&self) -> &'static str {
        "MOCK"
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            supports_historical: true,
        }
    }

    async fn latest(&self, base: &str) -> Result<RateTable, MarketDataError> {
        self.answer(base).await
    }

    async fn on_date(&self, base: &str, _date: NaiveDate) -> Result<RateTable, MarketDataError> {
        self.answer(base).await
    }
}

fn cache(provider: Arc<MockProvider>) -> ExchangeRateCache {
    ExchangeRateCache::new(provider, RateCacheConfig::default())
}

#[tokio::test]
async fn test_identical_currencies_skip_lookup() {
    let provider = Arc::new(MockProvider::default());
    let cache = cache(provider.clone());

    let rate = cache.rate("usd", "USD", day(2024, 3, 8)).await.unwrap();
    assert_eq!(rate, Decimal::ONE);
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn test_request_day_is_aliased_to_provider_date() {
    // Sunday request answered with Friday's table.
    let provider = MockProvider::with_table(table("EUR", day(2024, 3, 8), &[("USD", dec!(1.09))]));
    let cache = cache(provider.clone());

    let sunday = day(2024, 3, 10);
    assert_eq!(cache.rate("EUR", "USD", sunday).await.unwrap(), dec!(1.09));
    assert_eq!(cache.rate("EUR", "USD", sunday).await.unwrap(), dec!(1.09));
    assert_eq!(provider.calls(), 1);
    assert_eq!(cache.len(), 1);

    // The provider date itself is a hit as well.
    assert_eq!(cache.rate("EUR", "USD", day(2024, 3, 8)).await.unwrap(), dec!(1.09));
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn test_convert_rounds_to_cents() {
    let provider = MockProvider::with_table(table("EUR", day(2024, 3, 8), &[("USD", dec!(1.0937))]));
    let cache = cache(provider);

    let amount = cache
        .convert(dec!(20), "EUR", "USD", day(2024, 3, 8))
        .await
        .unwrap();
    assert_eq!(amount, dec!(21.87));
}

#[tokio::test]
async fn test_unreachable_source_without_cache_is_rate_unavailable() {
    let provider = Arc::new(MockProvider::default());
    provider.offline.store(true, Ordering::SeqCst);
    let cache = cache(provider);

    let err = cache.rate("EUR", "USD", day(2024, 3, 8)).await.unwrap_err();
    assert!(matches!(err, Error::Fx(FxError::RateUnavailable { .. })));
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_stale_table_is_used_when_fetch_fails() {
    let provider = Arc::new(MockProvider::default());
    provider.offline.store(true, Ordering::SeqCst);
    let cache = cache(provider);
    cache
        .insert_table(table("EUR", day(2024, 3, 1), &[("USD", dec!(1.05))]))
        .unwrap();

    let rate = cache.rate("EUR", "USD", day(2024, 3, 8)).await.unwrap();
    assert_eq!(rate, dec!(1.05));
}

#[tokio::test]
async fn test_inverse_pair_is_used_when_fetch_fails() {
    let provider = Arc::new(MockProvider::default());
    provider.offline.store(true, Ordering::SeqCst);
    let cache = cache(provider);
    cache
        .insert_table(table("USD", day(2024, 3, 1), &[("EUR", dec!(0.8))]))
        .unwrap();

    let rate = cache.rate("EUR", "USD", day(2024, 3, 8)).await.unwrap();
    assert_eq!(rate, dec!(1.25));
}

#[tokio::test]
async fn test_later_tables_are_not_used_as_fallback() {
    let provider = Arc::new(MockProvider::default());
    provider.offline.store(true, Ordering::SeqCst);
    let cache = cache(provider);
    cache
        .insert_table(table("EUR", day(2024, 4, 1), &[("USD", dec!(1.05))]))
        .unwrap();

    let err = cache.rate("EUR", "USD", day(2024, 3, 8)).await.unwrap_err();
    assert!(matches!(err, Error::Fx(FxError::RateUnavailable { .. })));
}

#[tokio::test]
async fn test_unsupported_currency_is_not_transient() {
    let provider = Arc::new(MockProvider::default());
    provider.unsupported.store(true, Ordering::SeqCst);
    let cache = cache(provider);

    let err = cache.rate("XYZ", "USD", day(2024, 3, 8)).await.unwrap_err();
    assert!(matches!(err, Error::Fx(FxError::UnsupportedCurrency(_))));
    assert!(!err.is_transient());
}

#[tokio::test]
async fn test_invalid_code_is_rejected_before_lookup() {
    let provider = Arc::new(MockProvider::default());
    let cache = cache(provider.clone());

    let err = cache.rate("EURO", "USD", day(2024, 3, 8)).await.unwrap_err();
    assert!(matches!(err, Error::Fx(FxError::InvalidCurrencyCode(_))));
    assert_eq!(provider.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_slow_source_times_out_as_rate_unavailable() {
    let provider = MockProvider::with_table(table("EUR", day(2024, 3, 8), &[("USD", dec!(1.09))]));
    *provider.delay.lock().unwrap() = Some(Duration::from_secs(60));
    let cache = ExchangeRateCache::new(
        provider,
        RateCacheConfig {
            fetch_timeout: Duration::from_secs(1),
        },
    );

    let err = cache.rate("EUR", "USD", day(2024, 3, 8)).await.unwrap_err();
    assert!(matches!(err, Error::Fx(FxError::RateUnavailable { .. })));
}

#[tokio::test(start_paused = true)]
async fn test_back_to_back_fetches_respect_min_delay() {
    let provider = MockProvider::with_table(table("EUR", day(2024, 3, 8), &[("USD", dec!(1.09))]));
    let cache = cache(provider.clone());
    let min_delay = provider.rate_limit().min_delay;

    let started = tokio::time::Instant::now();
    cache.rate("EUR", "USD", day(2024, 3, 4)).await.unwrap();
    cache.rate("EUR", "USD", day(2024, 3, 5)).await.unwrap();

    assert_eq!(provider.calls(), 2);
    assert!(started.elapsed() >= min_delay);
}
