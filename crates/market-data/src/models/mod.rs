//! Market data models
//!
//! - `types` - Type aliases for common identifiers (Currency)
//! - `rate_table` - A provider's published conversion factors for one base currency

mod rate_table;
mod types;

pub use rate_table::RateTable;
pub use types::Currency;
