//! Domain events runtime bridge for the daemon.
//!
//! Receives domain events via `DomainEventSink`, debounces them, logs them,
//! and asks the sync loop for an early pass when the ledger changed.

mod planner;
mod queue_worker;
mod sink;

pub use queue_worker::event_queue_worker;
pub use sink::DaemonDomainEventSink;
