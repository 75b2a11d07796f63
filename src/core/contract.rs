//! Canonical option-chain rows
//!
//! One record per (strike, expiration) carrying both legs of the pair:
//! implied vols, open interest, and the feed-reported delta and gamma.
//! Normalization produces a sorted [`ContractSet`] that the rest of the
//! pipeline reads but never mutates.

use chrono::DateTime;
use chrono_tz::Tz;
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Option side (Call or Put)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OptionSide {
    Call,
    Put,
}

impl OptionSide {
    /// Payoff direction: +1 for call, -1 for put
    pub fn sign(&self) -> f64 {
        match self {
            OptionSide::Call => 1.0,
            OptionSide::Put => -1.0,
        }
    }

    /// Lowercase label used in logs and column names
    pub fn label(&self) -> &'static str {
        match self {
            OptionSide::Call => "call",
            OptionSide::Put => "put",
        }
    }
}

/// One chain row: a call/put pair at a given strike and expiration
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ContractRecord {
    /// Strike price
    pub strike: f64,
    /// Expiration, normalized to the 16:00 exchange close
    pub expiry: DateTime<Tz>,
    /// Call implied volatility (decimal, e.g. 0.18)
    pub call_iv: f64,
    /// Put implied volatility
    pub put_iv: f64,
    /// Call open interest (contracts)
    pub call_open_interest: f64,
    /// Put open interest
    pub put_open_interest: f64,
    /// Feed-reported call delta
    pub call_delta: f64,
    /// Feed-reported put delta
    pub put_delta: f64,
    /// Feed-reported call gamma
    pub call_gamma: f64,
    /// Feed-reported put gamma
    pub put_gamma: f64,
    /// Trading-day fraction of a year until expiry (floor 1/252)
    pub years_to_expiry: f64,
}

impl ContractRecord {
    /// Implied vol for the given side
    pub fn iv(&self, side: OptionSide) -> f64 {
        match side {
            OptionSide::Call => self.call_iv,
            OptionSide::Put => self.put_iv,
        }
    }

    /// Open interest for the given side
    pub fn open_interest(&self, side: OptionSide) -> f64 {
        match side {
            OptionSide::Call => self.call_open_interest,
            OptionSide::Put => self.put_open_interest,
        }
    }

    /// Feed-reported delta for the given side
    pub fn delta(&self, side: OptionSide) -> f64 {
        match side {
            OptionSide::Call => self.call_delta,
            OptionSide::Put => self.put_delta,
        }
    }

    /// Feed-reported gamma for the given side
    pub fn gamma(&self, side: OptionSide) -> f64 {
        match side {
            OptionSide::Call => self.call_gamma,
            OptionSide::Put => self.put_gamma,
        }
    }
}

/// A normalized chain snapshot, sorted by (expiration, strike)
#[derive(Debug, Clone, Serialize)]
pub struct ContractSet {
    records: Vec<ContractRecord>,
}

impl ContractSet {
    /// Build a set from raw records, sorting by (expiration, strike)
    pub fn new(mut records: Vec<ContractRecord>) -> Self {
        records.sort_by(|a, b| {
            a.expiry
                .cmp(&b.expiry)
                .then_with(|| a.strike.total_cmp(&b.strike))
        });
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[ContractRecord] {
        &self.records
    }

    /// Unique expirations, ascending
    pub fn expiries(&self) -> Vec<DateTime<Tz>> {
        let mut out: Vec<DateTime<Tz>> = self.records.iter().map(|r| r.expiry).collect();
        out.dedup();
        out
    }

    /// Nearest expiration in the set
    pub fn first_expiry(&self) -> Option<DateTime<Tz>> {
        self.records.first().map(|r| r.expiry)
    }

    /// Rows whose expiration differs from the given one
    pub fn without_expiry(&self, expiry: DateTime<Tz>) -> ContractSet {
        self.filtered(|r| r.expiry != expiry)
    }

    /// Rows at exactly the given expiration
    pub fn only_expiry(&self, expiry: DateTime<Tz>) -> ContractSet {
        self.filtered(|r| r.expiry == expiry)
    }

    /// Rows expiring at or before the cutoff
    pub fn expiring_on_or_before(&self, cutoff: DateTime<Tz>) -> ContractSet {
        self.filtered(|r| r.expiry <= cutoff)
    }

    fn filtered(&self, keep: impl Fn(&ContractRecord) -> bool) -> ContractSet {
        // Records stay sorted, so no re-sort is needed.
        ContractSet {
            records: self.records.iter().copied().filter(|r| keep(r)).collect(),
        }
    }

    /// Strike column
    pub fn strikes(&self) -> Array1<f64> {
        Array1::from_iter(self.records.iter().map(|r| r.strike))
    }

    /// Year-fraction column
    pub fn years_to_expiry(&self) -> Array1<f64> {
        Array1::from_iter(self.records.iter().map(|r| r.years_to_expiry))
    }

    /// Implied-vol column for one side
    pub fn ivs(&self, side: OptionSide) -> Array1<f64> {
        Array1::from_iter(self.records.iter().map(|r| r.iv(side)))
    }

    /// Open-interest column for one side
    pub fn open_interest(&self, side: OptionSide) -> Array1<f64> {
        Array1::from_iter(self.records.iter().map(|r| r.open_interest(side)))
    }

    /// Feed-delta column for one side
    pub fn deltas(&self, side: OptionSide) -> Array1<f64> {
        Array1::from_iter(self.records.iter().map(|r| r.delta(side)))
    }

    /// Feed-gamma column for one side
    pub fn gammas(&self, side: OptionSide) -> Array1<f64> {
        Array1::from_iter(self.records.iter().map(|r| r.gamma(side)))
    }
}
