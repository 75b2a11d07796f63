//! Sensitivity models
//!
//! Implements:
//! - Black-Scholes dealer exposure grids (delta, gamma, vanna, charm)

pub mod black_scholes;

pub use black_scholes::*;
