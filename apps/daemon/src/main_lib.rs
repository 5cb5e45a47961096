use std::sync::Arc;

use anyhow::Context;
use ledgerkeep_core::{
    debts::DebtSummaryService,
    events::DomainEventSink,
    fx::{ExchangeRateCache, ExchangeRateLookup, RateCacheConfig},
    periodic::PeriodicScheduler,
    store::LedgerStore,
    sync::{SyncConfig, SyncService, WatchSyncStateObserver},
};
use ledgerkeep_market_data::FrankfurterProvider;
use ledgerkeep_storage_memory::{read_snapshot, write_snapshot, JsonFileRemote, MemoryLedgerStore};
use tokio::sync::{mpsc, Notify};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::Config;
use crate::domain_events::DaemonDomainEventSink;

pub struct AppState {
    pub config: Config,
    pub store: Arc<MemoryLedgerStore>,
    pub scheduler: Arc<PeriodicScheduler>,
    pub sync_service: Arc<SyncService>,
    pub sync_observer: Arc<WatchSyncStateObserver>,
    pub debt_service: Arc<DebtSummaryService>,
    /// Woken by the event worker when the ledger changed.
    pub sync_trigger: Arc<Notify>,
}

pub fn init_tracing() {
    let log_format = std::env::var("LK_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init();
    }
}

/// Wires the engine together. Returns the state and the receiving end of the
/// domain event channel, to be drained by the queue worker.
pub async fn build_state(
    config: &Config,
) -> anyhow::Result<(Arc<AppState>, mpsc::UnboundedReceiver<ledgerkeep_core::events::DomainEvent>)>
{
    let seed = read_snapshot(&config.ledger_path)
        .await
        .with_context(|| format!("Failed to load ledger from {}", config.ledger_path.display()))?;
    let store = Arc::new(match seed {
        Some(snapshot) => MemoryLedgerStore::from_snapshot(snapshot),
        None => {
            tracing::info!(
                "No ledger at {}; starting empty",
                config.ledger_path.display()
            );
            MemoryLedgerStore::new()
        }
    });
    let remote = Arc::new(JsonFileRemote::new(config.remote_path.clone()));

    let provider = Arc::new(FrankfurterProvider::with_timeout(
        config.rates_url.clone(),
        config.rate_timeout,
    ));
    let rates: Arc<dyn ExchangeRateLookup> = Arc::new(ExchangeRateCache::new(
        provider,
        RateCacheConfig {
            fetch_timeout: config.rate_timeout,
        },
    ));

    let (sink, events_rx) = DaemonDomainEventSink::new();
    let sink: Arc<dyn DomainEventSink> = Arc::new(sink);
    let ledger: Arc<dyn LedgerStore> = store.clone();

    let scheduler = Arc::new(
        PeriodicScheduler::new(ledger.clone(), rates.clone()).with_event_sink(sink.clone()),
    );
    let sync_observer = Arc::new(WatchSyncStateObserver::new());
    let sync_service = Arc::new(
        SyncService::new(ledger.clone(), remote)
            .with_observer(sync_observer.clone())
            .with_event_sink(sink)
            .with_config(SyncConfig {
                strategy: config.sync_strategy,
            }),
    );
    let debt_service = Arc::new(DebtSummaryService::new(
        ledger,
        rates,
        config.base_currency.clone(),
    ));

    let state = Arc::new(AppState {
        config: config.clone(),
        store,
        scheduler,
        sync_service,
        sync_observer,
        debt_service,
        sync_trigger: Arc::new(Notify::new()),
    });
    Ok((state, events_rx))
}

/// Writes the local ledger back to its file.
pub async fn persist_ledger(state: &AppState) -> anyhow::Result<()> {
    let snapshot = state.store.export_snapshot().await?;
    write_snapshot(&state.config.ledger_path, &snapshot)
        .await
        .with_context(|| {
            format!(
                "Failed to write ledger to {}",
                state.config.ledger_path.display()
            )
        })?;
    tracing::info!(
        "Ledger saved to {} ({} transactions)",
        state.config.ledger_path.display(),
        snapshot.transactions.len()
    );
    Ok(())
}

/// Logs the outstanding position per counterparty.
pub async fn log_debt_summaries(state: &AppState) {
    match state.debt_service.summarize_all().await {
        Ok(summaries) => {
            for summary in summaries {
                tracing::info!(
                    "Debts with {}: payable {}, receivable {}, net {} {}",
                    summary.counterparty,
                    summary.payable.outstanding(),
                    summary.receivable.outstanding(),
                    summary.net_position(),
                    summary.currency
                );
            }
        }
        Err(e) => tracing::warn!("Debt summary unavailable: {}", e),
    }
}
