//! # GexFlow - Dealer Greek-Exposure Engine
//!
//! A production-grade analytics library that turns delayed equity-index
//! option chains (SPX-style JSON and CSV exports) into dealer-positioning
//! metrics: net delta/gamma/vanna/charm exposure, flip points, and
//! implied-vol summaries.
//!
//! ## Overview
//!
//! The engine assumes the standard dealer book: long the calls customers
//! sold, short the puts customers bought. Under that convention:
//! - **Delta/gamma exposure** comes straight from the feed's own greeks
//! - **Vanna/charm exposure** is recomputed from Black-Scholes closed forms
//! - **Profiles** re-price the book across a hypothetical spot ladder
//! - **Flip points** mark where net dealer exposure changes sign
//!
//! ## Key Components
//!
//! - **Chain Normalization**: CBOE-style JSON and CSV exports into one canonical form
//! - **Calendar**: NYSE sessions, full closures, monthly OPEX resolution
//! - **Rates**: Risk-free rate lookup with bounded lookback and caching
//! - **Black-Scholes**: Vectorized sensitivity grids over (spot level, contract)
//! - **Exposure**: Aggregation, ladder profiles, flip search, IV summaries
//!
//! ## Usage
//!
//! ```rust,no_run
//! use gexflow::prelude::*;
//! use chrono_tz::America::New_York;
//!
//! // Normalize a delayed chain export
//! let raw = std::fs::read_to_string("spx_quotedata.json").unwrap();
//! let chain = parse_json_chain(&raw, New_York).unwrap();
//!
//! // Analyze the whole chain at a fixed risk-free rate
//! let engine = ExposureEngine::new(RateProvider::new(FixedRate::new(5.0)));
//! let snapshot = engine.analyze(&chain, ExpiryScope::All).unwrap();
//!
//! println!("net gamma: {:+.3}bn", snapshot.total_gamma());
//! println!("gamma flip: {:?}", snapshot.gamma_flip);
//! ```
//!
//! ## What This Engine Does
//!
//! - Normalizes delayed chain snapshots into sorted contract sets
//! - Aggregates dealer exposure per contract and across a spot ladder
//! - Locates zero crossings of the net delta and gamma profiles
//! - Resolves expiration scopes against the exchange calendar
//!
//! ## What This Engine Does NOT Do
//!
//! - Predict future volatility or prices
//! - Generate trading signals
//! - Model dealer hedging flow or inventory beyond the sign convention
//! - Handle American early exercise (index options are European)

pub mod calendar;
pub mod core;
pub mod data;
pub mod exposure;
pub mod models;

/// Prelude with commonly used types
pub mod prelude {
    // Core types
    pub use crate::core::{
        ContractExposure, ContractRecord, ContractSet, ExposureProfiles, ExposureSnapshot,
        GexError, GexResult, IvSummary, OptionSide, ProfileCurve,
    };

    // Chain normalization and rates
    pub use crate::data::{
        parse_csv_chain, parse_json_chain, ChainPayload, FixedRate, RateObservation, RateProvider,
        RateSource, TtlCache,
    };

    // Exchange calendar
    pub use crate::calendar::{
        monthly_opex_session, session_close, trading_sessions, CalendarContext, CalendarResolver,
    };

    // Exposure pipeline
    pub use crate::exposure::{
        contract_exposures,
        find_flip,
        iv_summary,
        ladder_profiles,
        ExpiryScope,
        // Engine
        ExposureConfig,
        ExposureEngine,
    };

    // Sensitivity model
    pub use crate::models::{norm_cdf, norm_pdf};
}

// Re-export main types at crate root
pub use crate::core::{GexError, GexResult};
pub use crate::exposure::{ExpiryScope, ExposureConfig, ExposureEngine};
