//! Core data types for the exposure engine
//!
//! Defines fundamental types:
//! - ContractRecord / ContractSet: normalized chain rows
//! - ExposureSnapshot: everything one analysis run produces
//! - GexError: error taxonomy

pub mod contract;
pub mod error;
pub mod snapshot;

pub use contract::*;
pub use error::*;
pub use snapshot::*;
