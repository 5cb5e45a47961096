//! In-memory storage implementation for Ledgerkeep.
//!
//! This crate implements the store contracts defined in `ledgerkeep-core`:
//! - [`MemoryLedgerStore`]: the local replica. Writes go through a single
//!   writer task so every posting lands as one atomic unit.
//! - [`JsonFileRemote`]: a remote snapshot store backed by one JSON file.
//!
//! ```text
//!   scheduler / sync (core)
//!             │
//!             ▼
//!   MemoryLedgerStore ──► write actor ──► LedgerState
//!             │
//!   JsonFileRemote ──► snapshot.json
//! ```

pub mod errors;
pub mod json_remote;
pub mod ledger_store;
mod write_actor;

pub use errors::{IntoCore, StorageError};
pub use json_remote::{read_snapshot, write_snapshot, JsonFileRemote};
pub use ledger_store::MemoryLedgerStore;

// Re-export from ledgerkeep-core for convenience
pub use ledgerkeep_core::errors::{Error, Result, StoreError};
