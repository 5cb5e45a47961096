//! Periodic transactions - recurring definitions and the scheduler pass.

mod periodic_model;
mod periodic_scheduler;
mod periodic_service;


pub use periodic_model::{
    NewPeriodicDefinition, OccurrenceState, PeriodicDefinition, PeriodicKind, Recurrence,
    RecurrenceUnit,
};
pub use periodic_scheduler::{
    PassOutcome, PassReport, PeriodicScheduler, PostedOccurrence, RejectedOccurrence,
    SchedulerConfig, SchedulerError,
};
pub use periodic_service::PeriodicService;
