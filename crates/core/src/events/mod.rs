//! Domain events module.
//!
//! Provides domain event types and the sink trait for emitting events
//! after successful ledger mutations. Host adapters implement the sink to
//! translate events into notifications, UI refreshes and the like.

mod domain_event;
mod sink;

pub use domain_event::*;
pub use sink::*;
