//! Data ingestion and caching
//!
//! Handles:
//! - CBOE delayed-quote JSON chains
//! - CBOE quotedata CSV exports
//! - Risk-free rate lookup
//! - TTL caching shared by the lookups

pub mod cache;
pub mod chain;
pub mod csv;
pub mod rates;

pub use cache::*;
pub use chain::*;
pub use rates::*;

pub use self::csv::parse_csv_chain;
