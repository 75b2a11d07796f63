//! Dealer Exposure Aggregation
//!
//! Turns a normalized chain into dealer-positioning analytics:
//! - **Per-contract exposures**: Delta/gamma from the feed's own greeks, vanna/charm from the pricing model
//! - **Ladder profiles**: Net exposure curves over a hypothetical spot ladder, with next-expiry and post-OPEX variants
//! - **Flip points**: First zero crossing of the net delta and gamma profiles
//! - **IV summaries**: Mean implied vol by strike (within the band) and by expiration
//!
//! Pipeline stages:
//! 1. **Scope**: Drop stale expirations, restrict the chain to the requested expiry scope
//! 2. **Aggregate**: Build per-side sensitivity grids and collapse them into net curves
//! 3. **Locate**: Interpolate flip points and summarize implied vols

mod aggregate;
mod config;
mod engine;
mod flip;

pub use aggregate::*;
pub use config::*;
pub use engine::*;
pub use flip::*;

use serde::{Deserialize, Serialize};

/// Which expirations an analysis covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExpiryScope {
    /// Every expiration in the chain
    All,
    /// Expirations within the nearest expiry's calendar month
    Monthly,
    /// The nearest expiration only
    ZeroDte,
    /// Expirations up to and including monthly OPEX
    Opex,
}

impl ExpiryScope {
    /// Lowercase label used in logs and request parameters
    pub fn label(&self) -> &'static str {
        match self {
            ExpiryScope::All => "all",
            ExpiryScope::Monthly => "monthly",
            ExpiryScope::ZeroDte => "0dte",
            ExpiryScope::Opex => "opex",
        }
    }

    /// Parse a request parameter; unknown text yields `None`
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_ascii_lowercase().as_str() {
            "all" => Some(ExpiryScope::All),
            "monthly" => Some(ExpiryScope::Monthly),
            "0dte" => Some(ExpiryScope::ZeroDte),
            "opex" => Some(ExpiryScope::Opex),
            _ => None,
        }
    }
}
