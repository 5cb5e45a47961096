//! Reconciliation pass between the local store and the remote snapshot store.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use chrono::Utc;
use log::{debug, error, info, warn};

use super::observer::{NoOpSyncStateObserver, SyncStateObserver};
use super::reconciler::{reconcile, Divergence, Resolution, SyncStrategy};
use super::snapshot_model::SnapshotOrigin;
use super::sync_state_model::SyncUiState;
use crate::events::{DomainEvent, DomainEventSink, NoOpDomainEventSink};
use crate::store::{LedgerStore, RemoteLedgerStore};
use crate::utils::PassGuard;

#[derive(Debug, Clone, Default)]
pub struct SyncConfig {
    pub strategy: SyncStrategy,
}

/// Result of one reconciliation pass.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SyncRun {
    /// Every state published during the pass, in order.
    pub transitions: Vec<SyncUiState>,
    /// `None` when the pass failed before reconciling or was coalesced.
    pub resolution: Option<Resolution>,
    pub coalesced: bool,
}

impl SyncRun {
    pub fn final_state(&self) -> Option<&SyncUiState> {
        self.transitions.last()
    }
}

pub struct SyncService {
    local: Arc<dyn LedgerStore>,
    remote: Arc<dyn RemoteLedgerStore>,
    observer: Arc<dyn SyncStateObserver>,
    event_sink: Arc<dyn DomainEventSink>,
    config: SyncConfig,
    in_progress: Arc<AtomicBool>,
}

impl SyncService {
    pub fn new(local: Arc<dyn LedgerStore>, remote: Arc<dyn RemoteLedgerStore>) -> Self {
        Self {
            local,
            remote,
            observer: Arc::new(NoOpSyncStateObserver),
            event_sink: Arc::new(NoOpDomainEventSink),
            config: SyncConfig::default(),
            in_progress: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn SyncStateObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_event_sink(mut self, event_sink: Arc<dyn DomainEventSink>) -> Self {
        self.event_sink = event_sink;
        self
    }

    pub fn with_config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    /// Runs a pass with the configured strategy.
    pub async fn run(&self) -> SyncRun {
        self.run_with(self.config.strategy).await
    }

    pub async fn run_with(&self, strategy: SyncStrategy) -> SyncRun {
        let Some(_guard) = PassGuard::try_acquire(&self.in_progress) else {
            debug!("Sync pass already in progress, coalescing");
            return SyncRun {
                coalesced: true,
                ..SyncRun::default()
            };
        };

        let mut run = SyncRun::default();
        self.publish(&mut run, SyncUiState::Idle);
        self.publish(&mut run, SyncUiState::Loading(format!("Syncing ledger ({})", strategy)));

        let local = match self.local.export_snapshot().await {
            Ok(snapshot) => snapshot,
            Err(err) => return self.fail(run, "Could not read local ledger", err),
        };
        let exported_at = local.modified_at;

        let resolution = match self.remote.pull().await {
            Ok(Some(remote)) => reconcile(local, remote, strategy),
            Ok(None) => {
                info!("No remote snapshot yet, uploading local ledger");
                Resolution::Resolved {
                    snapshot: local,
                    divergence: Divergence::LocalAhead,
                }
            }
            Err(err) => return self.fail(run, "Could not reach remote ledger", err),
        };

        let snapshot = match &resolution {
            Resolution::Conflict {
                remote_modified_at,
                conflicts,
            } => {
                warn!(
                    "Sync conflict on {} entities, remote modified at {}",
                    conflicts.len(),
                    remote_modified_at
                );
                let state = SyncUiState::Conflict(*remote_modified_at);
                run.resolution = Some(resolution.clone());
                self.publish(&mut run, state);
                return run;
            }
            Resolution::Resolved { snapshot, .. } => snapshot.clone(),
        };

        let synced_at = Utc::now();
        let agreed = snapshot.stamped(synced_at);
        let transaction_count = agreed.transactions.len();

        if let Err(err) = self
            .local
            .replace_from_snapshot(agreed.clone().with_origin(SnapshotOrigin::Local), Some(exported_at))
            .await
        {
            return self.fail(run, "Could not update local ledger", err);
        }
        if let Err(err) = self
            .remote
            .push(agreed.with_origin(SnapshotOrigin::Cloud))
            .await
        {
            return self.fail(run, "Could not update remote ledger", err);
        }

        self.event_sink.emit(DomainEvent::ledger_reconciled(
            strategy,
            synced_at,
            transaction_count,
        ));
        info!(
            "Ledger synced at {} with {} ({} transactions)",
            synced_at, strategy, transaction_count
        );
        run.resolution = Some(resolution);
        self.publish(
            &mut run,
            SyncUiState::Success(format!("Synced {} transactions", transaction_count)),
        );
        run
    }

    fn publish(&self, run: &mut SyncRun, state: SyncUiState) {
        self.observer.on_state(&state);
        run.transitions.push(state);
    }

    fn fail(&self, mut run: SyncRun, context: &str, err: crate::Error) -> SyncRun {
        error!("{}: {}", context, err);
        self.publish(&mut run, SyncUiState::Error(format!("{}: {}", context, err)));
        run
    }
}
