use ledgerkeep_core::events::{DomainEvent, DomainEventSink};
use tokio::sync::mpsc;

/// Forwards events to the queue worker. Never blocks the emitting service.
#[derive(Clone)]
pub struct DaemonDomainEventSink {
    tx: mpsc::UnboundedSender<DomainEvent>,
}

impl DaemonDomainEventSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<DomainEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl DomainEventSink for DaemonDomainEventSink {
    fn emit(&self, event: DomainEvent) {
        if self.tx.send(event).is_err() {
            tracing::debug!("Domain event dropped: queue worker stopped");
        }
    }
}
