mod config;
mod domain_events;
mod main_lib;
mod scheduler;

use config::Config;
use domain_events::event_queue_worker;
use main_lib::{build_state, init_tracing, log_debt_summaries, persist_ledger};
use tokio::sync::watch;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_tracing();
    tracing::info!(
        "Ledgerkeep daemon starting: ledger {}, remote {}",
        config.ledger_path.display(),
        config.remote_path.display()
    );

    let (state, events_rx) = build_state(&config).await?;
    log_debt_summaries(&state).await;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let event_worker = tokio::spawn(event_queue_worker(events_rx, state.sync_trigger.clone()));
    let state_logger = scheduler::start_sync_state_logger(state.clone());
    let scheduler_loop = scheduler::start_periodic_scheduler(state.clone(), shutdown_rx.clone());
    let sync_loop = scheduler::start_sync_loop(state.clone(), shutdown_rx);

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown requested");

    state.scheduler.request_shutdown();
    let _ = shutdown_tx.send(true);
    let _ = tokio::join!(scheduler_loop, sync_loop);
    state_logger.abort();
    let _ = state_logger.await;

    persist_ledger(&state).await?;
    log_debt_summaries(&state).await;

    // Dropping the services closes the event channel and lets the worker drain.
    drop(state);
    let _ = event_worker.await;
    Ok(())
}
