//! Event queue worker.
//!
//! Receives events from an mpsc channel, debounces them with a 500ms window,
//! then logs the batch and wakes the sync loop when the ledger changed.

use std::sync::Arc;
use std::time::Duration;

use ledgerkeep_core::events::DomainEvent;
use tokio::sync::{mpsc, Notify};

use super::planner::{plan_attention, plan_sync};

/// Debounce window for collecting events before processing.
const DEBOUNCE_DURATION: Duration = Duration::from_millis(500);

/// Runs until every sink sender has been dropped.
pub async fn event_queue_worker(
    mut rx: mpsc::UnboundedReceiver<DomainEvent>,
    sync_trigger: Arc<Notify>,
) {
    tracing::info!("Domain event queue worker started");

    let mut pending_events: Vec<DomainEvent> = Vec::new();

    loop {
        if pending_events.is_empty() {
            match rx.recv().await {
                Some(event) => pending_events.push(event),
                None => break,
            }
            continue;
        }

        tokio::select! {
            event = rx.recv() => match event {
                Some(event) => pending_events.push(event),
                None => break,
            },
            _ = tokio::time::sleep(DEBOUNCE_DURATION) => {
                let batch = std::mem::take(&mut pending_events);
                process_event_batch(&batch, &sync_trigger);
            }
        }
    }

    if !pending_events.is_empty() {
        process_event_batch(&pending_events, &sync_trigger);
    }
    tracing::info!("Domain event queue worker shutting down");
}

fn process_event_batch(events: &[DomainEvent], sync_trigger: &Notify) {
    tracing::info!("Processing batch of {} domain event(s)", events.len());
    for event in events {
        match serde_json::to_string(event) {
            Ok(json) => tracing::debug!(target: "ledgerkeep::events", "{}", json),
            Err(_) => tracing::debug!(target: "ledgerkeep::events", "{:?}", event),
        }
    }

    let attention = plan_attention(events);
    if !attention.is_empty() {
        tracing::warn!("Periodic definitions need attention: {:?}", attention);
    }

    if plan_sync(events) {
        tracing::debug!("Ledger changed; requesting an early sync pass");
        sync_trigger.notify_one();
    }
}
