//! Store contracts consumed by the engine.

mod store_traits;

pub use store_traits::{LedgerStore, RemoteLedgerStore};
