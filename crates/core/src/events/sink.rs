//! Domain event sink trait and implementations.

use std::sync::{Arc, Mutex};

use super::DomainEvent;

/// Receiver of domain events.
///
/// Core services emit through this trait after a store write has committed.
/// Nothing is emitted for writes that were rejected. `emit` is called from
/// inside scheduler and sync passes, so it must return quickly and must not
/// fail the caller.
pub trait DomainEventSink: Send + Sync {
    fn emit(&self, event: DomainEvent);
}

/// Discards every event.
#[derive(Clone, Default)]
pub struct NoOpDomainEventSink;

impl DomainEventSink for NoOpDomainEventSink {
    fn emit(&self, _event: DomainEvent) {}
}

/// Collects events in memory; used by tests.
#[derive(Clone, Default)]
pub struct MockDomainEventSink {
    events: Arc<Mutex<Vec<DomainEvent>>>,
}

impl MockDomainEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<DomainEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().unwrap().is_empty()
    }
}

impl DomainEventSink for MockDomainEventSink {
    fn emit(&self, event: DomainEvent) {
        self.events.lock().unwrap().push(event);
    }
}
