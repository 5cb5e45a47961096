//! Exchange-rate cache in front of a [`RateProvider`].
//!
//! Tables are stored under `(base, provider date)`. A request for
//! `(base, day)` that was answered with a table of another date is aliased to
//! it, so the provider is asked at most once per requested day.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use log::{debug, error, warn};
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use tokio::time::Instant;

use ledgerkeep_market_data::{MarketDataError, RateProvider, RateTable, RetryClass};

use super::currency::normalize_currency_code;
use super::fx_errors::FxError;
use super::fx_traits::ExchangeRateLookup;
use crate::errors::Result;

#[derive(Debug, Clone)]
pub struct RateCacheConfig {
    /// Upper bound for a single provider request.
    pub fetch_timeout: Duration,
}

impl Default for RateCacheConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(10),
        }
    }
}

type TableKey = (String, NaiveDate);

pub struct ExchangeRateCache {
    provider: Arc<dyn RateProvider>,
    config: RateCacheConfig,
    tables: RwLock<BTreeMap<TableKey, RateTable>>,
    aliases: RwLock<HashMap<TableKey, NaiveDate>>,
    /// Serializes provider fetches so concurrent misses for the same day
    /// produce a single request. Holds the time of the last request, used to
    /// honor the provider's minimum delay.
    fetch_lock: Mutex<Option<Instant>>,
}

impl ExchangeRateCache {
    pub fn new(provider: Arc<dyn RateProvider>, config: RateCacheConfig) -> Self {
        Self {
            provider,
            config,
            tables: RwLock::new(BTreeMap::new()),
            aliases: RwLock::new(HashMap::new()),
            fetch_lock: Mutex::new(None),
        }
    }

    /// Stores a table as if it had been fetched. Useful for seeding the cache
    /// from a previous run.
    pub fn insert_table(&self, table: RateTable) -> Result<()> {
        let base = normalize_currency_code(&table.base)
            .ok_or_else(|| FxError::InvalidCurrencyCode(table.base.clone()))?;
        let mut tables = self
            .tables
            .write()
            .map_err(|e| FxError::CacheError(e.to_string()))?;
        tables.insert((base, table.date), table);
        Ok(())
    }

    /// Number of distinct provider tables held.
    pub fn len(&self) -> usize {
        self.tables.read().map(|t| t.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn cached_table(&self, base: &str, day: NaiveDate) -> Result<Option<RateTable>> {
        let provider_day = {
            let aliases = self
                .aliases
                .read()
                .map_err(|e| FxError::CacheError(e.to_string()))?;
            aliases
                .get(&(base.to_string(), day))
                .copied()
                .unwrap_or(day)
        };
        let tables = self
            .tables
            .read()
            .map_err(|e| FxError::CacheError(e.to_string()))?;
        Ok(tables.get(&(base.to_string(), provider_day)).cloned())
    }

    fn store(&self, requested: NaiveDate, table: RateTable) -> Result<RateTable> {
        let base = normalize_currency_code(&table.base)
            .ok_or_else(|| FxError::InvalidCurrencyCode(table.base.clone()))?;
        if table.date != requested {
            debug!(
                "Aliasing {} rates for {} to provider date {}",
                base, requested, table.date
            );
            self.aliases
                .write()
                .map_err(|e| FxError::CacheError(e.to_string()))?
                .insert((base.clone(), requested), table.date);
        }
        self.tables
            .write()
            .map_err(|e| FxError::CacheError(e.to_string()))?
            .insert((base, table.date), table.clone());
        Ok(table)
    }

    async fn fetch(&self, base: &str, day: NaiveDate) -> std::result::Result<RateTable, MarketDataError> {
        let historical =
            day < Utc::now().date_naive() && self.provider.capabilities().supports_historical;
        let request = async {
            if historical {
                self.provider.on_date(base, day).await
            } else {
                self.provider.latest(base).await
            }
        };
        match tokio::time::timeout(self.config.fetch_timeout, request).await {
            Ok(result) => result,
            Err(_) => Err(MarketDataError::Timeout {
                provider: self.provider.id().to_string(),
            }),
        }
    }

    async fn throttled_fetch(
        &self,
        last_fetch: &mut Option<Instant>,
        base: &str,
        day: NaiveDate,
    ) -> std::result::Result<RateTable, MarketDataError> {
        if let Some(at) = *last_fetch {
            let wait = self.provider.rate_limit().min_delay.saturating_sub(at.elapsed());
            if !wait.is_zero() {
                tokio::time::sleep(wait).await;
            }
        }
        let result = self.fetch(base, day).await;
        *last_fetch = Some(Instant::now());
        result
    }

    /// Nearest table on or before `day`, for either the requested base or the
    /// inverse pair.
    fn fallback_rate(&self, from: &str, to: &str, day: NaiveDate) -> Option<(Decimal, NaiveDate)> {
        let tables = self.tables.read().ok()?;
        let nearest = |base: &str| {
            tables
                .range((base.to_string(), NaiveDate::MIN)..=(base.to_string(), day))
                .next_back()
                .map(|(_, table)| table)
        };

        if let Some(table) = nearest(from) {
            if let Some(rate) = table.factor(to) {
                return Some((rate, table.date));
            }
        }
        nearest(to).and_then(|table| table.inverse_factor(from).map(|rate| (rate, table.date)))
    }
}

#[async_trait]
impl ExchangeRateLookup for ExchangeRateCache {
    async fn rate(&self, from: &str, to: &str, as_of: NaiveDate) -> Result<Decimal> {
        let from_code =
            normalize_currency_code(from).ok_or_else(|| FxError::InvalidCurrencyCode(from.to_string()))?;
        let to_code =
            normalize_currency_code(to).ok_or_else(|| FxError::InvalidCurrencyCode(to.to_string()))?;
        if from_code == to_code {
            return Ok(Decimal::ONE);
        }

        let table = match self.cached_table(&from_code, as_of)? {
            Some(table) => table,
            None => {
                let mut last_fetch = self.fetch_lock.lock().await;
                // Another caller may have filled the slot while we waited.
                match self.cached_table(&from_code, as_of)? {
                    Some(table) => table,
                    None => match self.throttled_fetch(&mut last_fetch, &from_code, as_of).await {
                        Ok(table) => self.store(as_of, table)?,
                        Err(MarketDataError::UnsupportedCurrency(code)) => {
                            return Err(FxError::UnsupportedCurrency(code).into());
                        }
                        Err(err) => {
                            if err.retry_class() == RetryClass::Never {
                                error!(
                                    "Rate provider {} returned unusable data: {}",
                                    self.provider.id(),
                                    err
                                );
                            }
                            if let Some((rate, date)) = self.fallback_rate(&from_code, &to_code, as_of) {
                                warn!(
                                    "Rate fetch for {}/{} on {} failed ({}). Using cached rate from {}",
                                    from_code, to_code, as_of, err, date
                                );
                                return Ok(rate);
                            }
                            return Err(FxError::RateUnavailable {
                                from: from_code,
                                to: to_code,
                                reason: err.to_string(),
                            }
                            .into());
                        }
                    },
                }
            }
        };

        table
            .factor(&to_code)
            .ok_or_else(|| FxError::UnsupportedCurrency(to_code).into())
    }
}
