//! Exchange-rate provider abstractions and implementations.
//!
//! This module contains:
//! - The `RateProvider` trait that all providers implement
//! - Provider capabilities and rate limiting configuration
//! - Concrete provider implementations (Frankfurter)

mod capabilities;
mod traits;

pub mod frankfurter;

pub use capabilities::{ProviderCapabilities, RateLimit};
pub use traits::RateProvider;
