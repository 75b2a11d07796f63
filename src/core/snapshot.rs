//! Engine output model
//!
//! Everything one analysis run produces: the normalized chain, the
//! per-contract dollar exposures at spot, the ladder profiles, flip
//! levels, and the implied-vol summaries.

use chrono::DateTime;
use chrono_tz::Tz;
use ndarray::Array1;
use serde::Serialize;

use crate::core::contract::ContractSet;

/// One greek's exposure series over the level ladder, under the three
/// expiration filters
#[derive(Debug, Clone, Serialize)]
pub struct ProfileCurve {
    /// All expirations in scope
    pub all: Array1<f64>,
    /// Excluding the nearest expiration (None under a 0DTE scope,
    /// where nothing would remain)
    pub ex_next: Option<Array1<f64>>,
    /// Excluding the monthly OPEX expiration (only computed when the
    /// scope spans all expirations)
    pub ex_opex: Option<Array1<f64>>,
}

impl ProfileCurve {
    /// Curve with only the all-expirations series
    pub fn all_only(all: Array1<f64>) -> Self {
        Self {
            all,
            ex_next: None,
            ex_opex: None,
        }
    }
}

/// Ladder profiles for the four dealer greeks
#[derive(Debug, Clone, Serialize)]
pub struct ExposureProfiles {
    pub delta: ProfileCurve,
    pub gamma: ProfileCurve,
    pub vanna: ProfileCurve,
    pub charm: ProfileCurve,
}

/// Mean implied vols by strike (inside the band) and by expiration
/// (inside the horizon)
#[derive(Debug, Clone, Serialize)]
pub struct IvSummary {
    /// Strike buckets, ascending
    pub strikes: Vec<f64>,
    /// Mean call IV per strike bucket
    pub call_by_strike: Vec<f64>,
    /// Mean put IV per strike bucket
    pub put_by_strike: Vec<f64>,
    /// Expiration buckets, ascending
    pub expiries: Vec<DateTime<Tz>>,
    /// Mean call IV per expiration bucket
    pub call_by_expiry: Vec<f64>,
    /// Mean put IV per expiration bucket
    pub put_by_expiry: Vec<f64>,
}

/// Dollar exposures for one chain row, evaluated at the actual spot.
/// All fields are scaled to billions of dollars.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ContractExposure {
    pub strike: f64,
    pub expiry: DateTime<Tz>,
    /// Call delta exposure (feed delta x OI x S)
    pub call_delta_exposure: f64,
    /// Put delta exposure (feed delta x OI x S, delta already negative)
    pub put_delta_exposure: f64,
    /// Call gamma exposure (feed gamma x OI x S^2)
    pub call_gamma_exposure: f64,
    /// Put gamma exposure, sign-flipped to the dealer convention
    pub put_gamma_exposure: f64,
    pub call_vanna_exposure: f64,
    pub put_vanna_exposure: f64,
    pub call_charm_exposure: f64,
    pub put_charm_exposure: f64,
    /// Netted delta exposure (call + put)
    pub delta: f64,
    /// Netted gamma exposure (call + flipped put)
    pub gamma: f64,
    /// Netted vanna exposure (call - put)
    pub vanna: f64,
    /// Netted charm exposure (call - put)
    pub charm: f64,
}

/// Complete result of one exposure analysis
#[derive(Debug, Clone, Serialize)]
pub struct ExposureSnapshot {
    /// The normalized chain the analysis ran on (after scope filtering)
    pub contracts: ContractSet,
    /// Per-row exposures at spot, in chain order
    pub per_contract: Vec<ContractExposure>,
    /// Snapshot time in the exchange timezone (feed delay applied)
    pub as_of: DateTime<Tz>,
    /// Display label, e.g. "2024 Jun 21, 03:45 PM EDT (15min delay)"
    pub as_of_label: String,
    /// Nearest expiration after the stale-expiry rule
    pub first_expiry: DateTime<Tz>,
    /// Monthly OPEX session close, when one could be resolved
    pub monthly_opex: Option<DateTime<Tz>>,
    /// Underlying spot at snapshot time
    pub spot: f64,
    /// Strike band the ladder and IV summaries cover (lo, hi)
    pub band: (f64, f64),
    /// Spot levels the profiles are evaluated at
    pub ladder: Array1<f64>,
    /// Ladder profiles for delta, gamma, vanna, charm
    pub profiles: ExposureProfiles,
    /// Spot level where net delta exposure crosses zero
    pub delta_flip: Option<f64>,
    /// Spot level where net gamma exposure crosses zero
    pub gamma_flip: Option<f64>,
    /// Implied-vol means by strike and by expiration
    pub ivs: IvSummary,
}

impl ExposureSnapshot {
    /// Net delta exposure across all rows, in billions
    pub fn total_delta(&self) -> f64 {
        self.per_contract.iter().map(|c| c.delta).sum()
    }

    /// Net gamma exposure across all rows, in billions
    pub fn total_gamma(&self) -> f64 {
        self.per_contract.iter().map(|c| c.gamma).sum()
    }

    /// Net vanna exposure across all rows, in billions
    pub fn total_vanna(&self) -> f64 {
        self.per_contract.iter().map(|c| c.vanna).sum()
    }

    /// Net charm exposure across all rows, in billions
    pub fn total_charm(&self) -> f64 {
        self.per_contract.iter().map(|c| c.charm).sum()
    }
}
