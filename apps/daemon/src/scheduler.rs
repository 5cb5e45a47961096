//! Background loops driving the periodic scheduler and the sync pass.

use std::sync::Arc;
use std::time::Duration;

use backoff::backoff::Backoff;
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use chrono::Utc;
use ledgerkeep_core::periodic::{PassOutcome, PassReport, PeriodicScheduler, SchedulerError};
use ledgerkeep_core::sync::SyncUiState;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::main_lib::AppState;

/// Delay before the first scheduler pass, letting startup logging settle.
const INITIAL_DELAY_SECS: u64 = 1;

/// Retry policy for a pass that reported `Retryable`. Retries stop well before
/// the next regular tick.
fn retry_policy(tick: Duration) -> ExponentialBackoff {
    ExponentialBackoffBuilder::new()
        .with_initial_interval(Duration::from_secs(5))
        .with_max_interval(Duration::from_secs(5 * 60))
        .with_max_elapsed_time(Some(tick / 2))
        .build()
}

/// Runs one scheduler pass, retrying transient failures with backoff.
///
/// A pass in flight always runs to completion; it stops between occurrences
/// on its own once shutdown was requested on the scheduler. Shutdown only cuts
/// short the wait before a retry.
pub async fn run_scheduler_pass(
    scheduler: Arc<PeriodicScheduler>,
    mut policy: ExponentialBackoff,
    mut shutdown: watch::Receiver<bool>,
) -> Result<PassOutcome, SchedulerError> {
    policy.reset();
    loop {
        let err = match scheduler.run_pass(Utc::now()).await {
            Ok(outcome) => return Ok(outcome),
            Err(e) if e.is_retryable() => e,
            Err(e) => return Err(e),
        };
        let Some(wait) = policy.next_backoff() else {
            return Err(err);
        };
        if *shutdown.borrow() {
            return Err(err);
        }
        warn!("Scheduler pass will be retried in {:?}: {}", wait, err);
        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            Ok(()) = shutdown.changed() => {
                info!("Shutdown during scheduler retry wait");
                return Err(err);
            }
        }
    }
}

fn log_report(report: &PassReport) {
    let quiet = report.transaction_count() == 0
        && report.invalidated.is_empty()
        && report.completed.is_empty()
        && report.rejected.is_empty();
    if quiet {
        debug!("Scheduler pass: nothing due");
        return;
    }
    info!(
        "Scheduler pass: {} occurrences posted ({} transactions), {} invalidated, {} completed, {} held",
        report.posted.len(),
        report.transaction_count(),
        report.invalidated.len(),
        report.completed.len(),
        report.rejected.len()
    );
    if report.interrupted {
        info!("Scheduler pass stopped early; the remainder stays due");
    }
}

pub fn start_periodic_scheduler(
    state: Arc<AppState>,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let tick = state.config.scheduler_interval;
        info!("Periodic scheduler started ({:?} interval)", tick);

        tokio::select! {
            _ = tokio::time::sleep(Duration::from_secs(INITIAL_DELAY_SECS)) => {}
            _ = shutdown.changed() => return,
        }

        let mut ticker = interval(tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.changed() => break,
            }

            let pass = run_scheduler_pass(
                state.scheduler.clone(),
                retry_policy(tick),
                shutdown.clone(),
            );
            match pass.await {
                Ok(PassOutcome::Completed(report)) => log_report(&report),
                Ok(PassOutcome::Coalesced) => debug!("Scheduler pass already running"),
                Err(e) => error!("Scheduler pass failed: {}", e),
            }
            if *shutdown.borrow() {
                break;
            }
        }
        info!("Periodic scheduler stopped");
    })
}

pub fn start_sync_loop(state: Arc<AppState>, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let tick = state.config.sync_interval;
        info!(
            "Sync loop started ({:?} interval, {} strategy)",
            tick, state.config.sync_strategy
        );

        let mut ticker = interval(tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = state.sync_trigger.notified() => debug!("Early sync requested"),
                _ = shutdown.changed() => break,
            }

            let run = state.sync_service.run().await;
            if run.coalesced {
                debug!("Sync pass already running");
                continue;
            }
            match run.final_state() {
                Some(SyncUiState::Success(message)) => info!("Sync finished: {}", message),
                Some(SyncUiState::Conflict(remote_modified_at)) => warn!(
                    "Sync conflict with remote modified at {}; pick OVERWRITE_CLOUD or OVERWRITE_LOCAL to resolve",
                    remote_modified_at
                ),
                Some(SyncUiState::Error(message)) => warn!("Sync failed: {}", message),
                other => debug!("Sync ended in state {:?}", other),
            }
        }
        info!("Sync loop stopped");
    })
}

/// Mirrors sync state transitions into the log.
pub fn start_sync_state_logger(state: Arc<AppState>) -> JoinHandle<()> {
    let mut rx = state.sync_observer.subscribe();
    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let current = rx.borrow_and_update().clone();
            debug!("Sync state: {:?}", current);
        }
    })
}
