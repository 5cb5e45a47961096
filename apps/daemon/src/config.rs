use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use ledgerkeep_core::sync::SyncStrategy;

pub const DEFAULT_RATES_URL: &str = "https://api.frankfurter.app";
const DEFAULT_SCHEDULER_INTERVAL_SECS: u64 = 60 * 60;
const DEFAULT_SYNC_INTERVAL_SECS: u64 = 15 * 60;
const DEFAULT_RATE_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Clone)]
pub struct Config {
    /// Local ledger JSON. Loaded at startup, written back on shutdown.
    pub ledger_path: PathBuf,
    /// Remote snapshot JSON shared between devices.
    pub remote_path: PathBuf,
    pub rates_url: String,
    pub scheduler_interval: Duration,
    pub sync_interval: Duration,
    pub sync_strategy: SyncStrategy,
    pub base_currency: String,
    pub rate_timeout: Duration,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        // A missing .env file is fine.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let secs = |key: &str, default: u64| -> anyhow::Result<u64> {
            match var(key) {
                Some(raw) => raw
                    .trim()
                    .parse::<u64>()
                    .with_context(|| format!("{} must be a whole number, got {:?}", key, raw)),
                None => Ok(default),
            }
        };

        let sync_strategy = match var("LK_SYNC_STRATEGY") {
            Some(raw) => raw
                .parse::<SyncStrategy>()
                .with_context(|| format!("Invalid LK_SYNC_STRATEGY {:?}", raw))?,
            None => SyncStrategy::default(),
        };
        let base_currency = var("LK_BASE_CURRENCY").unwrap_or_else(|| "USD".to_string());
        let base_currency = ledgerkeep_core::fx::normalize_currency_code(&base_currency)
            .with_context(|| format!("Invalid LK_BASE_CURRENCY {:?}", base_currency))?;

        Ok(Self {
            ledger_path: var("LK_LEDGER_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./ledger.json")),
            remote_path: var("LK_REMOTE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./cloud.json")),
            rates_url: var("LK_RATES_URL").unwrap_or_else(|| DEFAULT_RATES_URL.to_string()),
            scheduler_interval: Duration::from_secs(
                secs("LK_SCHEDULER_INTERVAL_SECS", DEFAULT_SCHEDULER_INTERVAL_SECS)?.max(1),
            ),
            sync_interval: Duration::from_secs(
                secs("LK_SYNC_INTERVAL_SECS", DEFAULT_SYNC_INTERVAL_SECS)?.max(1),
            ),
            sync_strategy,
            base_currency,
            rate_timeout: Duration::from_millis(
                secs("LK_RATE_TIMEOUT_MS", DEFAULT_RATE_TIMEOUT_MS)?,
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(config.rates_url, DEFAULT_RATES_URL);
        assert_eq!(config.scheduler_interval, Duration::from_secs(3600));
        assert_eq!(config.sync_interval, Duration::from_secs(900));
        assert_eq!(config.sync_strategy, SyncStrategy::Merge);
        assert_eq!(config.base_currency, "USD");
        assert_eq!(config.rate_timeout, Duration::from_millis(10_000));
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("LK_SYNC_STRATEGY", "overwrite-cloud"),
            ("LK_BASE_CURRENCY", " eur "),
            ("LK_SYNC_INTERVAL_SECS", "30"),
            ("LK_LEDGER_PATH", "/var/lib/ledgerkeep/ledger.json"),
        ])
        .unwrap();
        assert_eq!(config.sync_strategy, SyncStrategy::OverwriteCloud);
        assert_eq!(config.base_currency, "EUR");
        assert_eq!(config.sync_interval, Duration::from_secs(30));
        assert_eq!(
            config.ledger_path,
            PathBuf::from("/var/lib/ledgerkeep/ledger.json")
        );
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(config(&[("LK_SCHEDULER_INTERVAL_SECS", "hourly")]).is_err());
        assert!(config(&[("LK_SYNC_STRATEGY", "newest-wins")]).is_err());
        assert!(config(&[("LK_BASE_CURRENCY", "dollars")]).is_err());
    }
}
