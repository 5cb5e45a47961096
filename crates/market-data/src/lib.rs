//! Ledgerkeep Market Data Crate
//!
//! Provider-agnostic exchange-rate fetching for the Ledgerkeep engine.
//!
//! # Overview
//!
//! A rate source answers one question: "given a base currency, what are the
//! conversion factors to every other currency, as published for some day?"
//! The answer is a [`RateTable`], carrying the provider's own date stamp.
//!
//! ```text
//! +------------------+     +------------------+     +------------------+
//! |  Rate cache      | --> |   RateProvider   | --> |    RateTable     |
//! |  (core crate)    |     | (Frankfurter...) |     | {base,date,rates}|
//! +------------------+     +------------------+     +------------------+
//! ```
//!
//! Caching, fallback and timeouts live in `ledgerkeep-core`; providers only
//! perform the request and classify failures via [`RetryClass`].

pub mod errors;
pub mod models;
pub mod provider;

pub use errors::{MarketDataError, RetryClass};
pub use models::{Currency, RateTable};
pub use provider::frankfurter::FrankfurterProvider;
pub use provider::{ProviderCapabilities, RateLimit, RateProvider};
