//! Configuration for exposure aggregation

use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Configuration for exposure aggregation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExposureConfig {
    /// Half-width of the strike band as a fraction of spot; the ladder
    /// and the IV-by-strike summary cover spot * (1 -/+ this)
    /// Default: 0.5
    pub band_fraction: f64,

    /// Number of evenly spaced ladder levels across the band
    /// Default: 300
    pub ladder_size: usize,

    /// Divisor applied to aggregate exposures
    /// Default: 1e9 (report in billions of dollars)
    pub scale: f64,

    /// Horizon for the IV-by-expiration summary, in weeks
    /// Default: 26
    pub iv_horizon_weeks: i64,

    /// Continuous dividend yield of the underlying
    /// Default: 0.0
    pub dividend_yield: f64,
}

impl Default for ExposureConfig {
    fn default() -> Self {
        Self {
            band_fraction: 0.5,
            ladder_size: 300,
            scale: 1e9,
            iv_horizon_weeks: 26,
            dividend_yield: 0.0,
        }
    }
}

impl ExposureConfig {
    /// Strike band around a spot price, as (lo, hi)
    pub fn band(&self, spot: f64) -> (f64, f64) {
        (
            spot * (1.0 - self.band_fraction),
            spot * (1.0 + self.band_fraction),
        )
    }

    /// Evenly spaced spot levels spanning the band
    pub fn ladder(&self, spot: f64) -> Array1<f64> {
        let (lo, hi) = self.band(spot);
        Array1::linspace(lo, hi, self.ladder_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_band() {
        let config = ExposureConfig::default();
        assert_eq!(config.band(5000.0), (2500.0, 7500.0));
    }

    #[test]
    fn test_ladder_spans_band() {
        let config = ExposureConfig::default();
        let ladder = config.ladder(100.0);
        assert_eq!(ladder.len(), 300);
        assert_eq!(ladder[0], 50.0);
        assert_eq!(ladder[299], 150.0);
    }
}
