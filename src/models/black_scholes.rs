//! Dealer exposure formulas
//!
//! Provides:
//! - The shared d+ decomposition (d+, CDF, PDF) all sensitivities reuse
//! - Dollar delta, gamma, vanna, and charm exposure grids
//! - Validity masking for expired or zero-vol rows
//!
//! Every grid function broadcasts a column of spot levels (levels x 1)
//! against per-contract row vectors (one entry per chain row), producing
//! a (levels x contracts) matrix. Summing a matrix row across contracts
//! gives the aggregate exposure at that spot level. A one-level column
//! holding the actual spot yields the per-contract exposures.
//!
//! Rows with non-positive time or vol must be sanitized before the grid
//! functions run and zeroed afterwards; masked rows contribute exactly
//! 0.0, never NaN.

use ndarray::{Array1, Array2};
use statrs::distribution::{ContinuousCDF, Normal};
use std::f64::consts::PI;

use crate::core::{GexError, GexResult, OptionSide};

/// Standard normal CDF
pub fn norm_cdf(x: f64) -> f64 {
    let normal = Normal::new(0.0, 1.0).unwrap();
    normal.cdf(x)
}

/// Standard normal PDF
pub fn norm_pdf(x: f64) -> f64 {
    (-0.5 * x * x).exp() / (2.0 * PI).sqrt()
}

/// Scalar d+ parameter: (ln(S/K) + (r - q + sigma^2/2) T) / (sigma sqrt(T))
pub fn d_plus(spot: f64, strike: f64, rate: f64, div: f64, vol: f64, time: f64) -> f64 {
    ((spot / strike).ln() + (rate - div + 0.5 * vol * vol) * time) / (vol * time.sqrt())
}

/// Scalar d- parameter: d+ - sigma sqrt(T)
pub fn d_minus(spot: f64, strike: f64, rate: f64, div: f64, vol: f64, time: f64) -> f64 {
    d_plus(spot, strike, rate, div, vol, time) - vol * time.sqrt()
}

/// d+ and its normal CDF/PDF over the (levels x contracts) grid
#[derive(Debug, Clone)]
pub struct DPlusParts {
    pub d_plus: Array2<f64>,
    pub cdf: Array2<f64>,
    pub pdf: Array2<f64>,
}

/// Compute d+ with its CDF and PDF for every (level, contract) pair.
///
/// # Arguments
/// * `levels` - Spot levels as a (levels x 1) column
/// * `strikes` - Strike per contract
/// * `vols` - Implied vol per contract (sanitized, strictly positive)
/// * `years` - Year fraction per contract (sanitized, strictly positive)
/// * `rate` - Risk-free rate (decimal)
/// * `div` - Dividend yield (decimal)
///
/// # Returns
/// The d+ decomposition, or an error when shapes disagree
pub fn d_plus_parts(
    levels: &Array2<f64>,
    strikes: &Array1<f64>,
    vols: &Array1<f64>,
    years: &Array1<f64>,
    rate: f64,
    div: f64,
) -> GexResult<DPlusParts> {
    let n_contracts = strikes.len();
    if vols.len() != n_contracts || years.len() != n_contracts {
        return Err(GexError::invalid_input(format!(
            "contract column lengths disagree: {} strikes, {} vols, {} years",
            n_contracts,
            vols.len(),
            years.len()
        )));
    }
    if levels.ncols() != 1 {
        return Err(GexError::invalid_input(format!(
            "levels must be a single column, got {} columns",
            levels.ncols()
        )));
    }

    let dim = (levels.nrows(), n_contracts);
    let s = levels
        .broadcast(dim)
        .ok_or_else(|| GexError::numerical("level column does not broadcast"))?;
    let k = strikes
        .broadcast(dim)
        .ok_or_else(|| GexError::numerical("strike row does not broadcast"))?;

    // ln(S/K) is the only term needing both axes at once; everything
    // after broadcasts a row or column against it.
    let log_moneyness = (&s / &k).mapv(f64::ln);

    let drift = years * &vols.mapv(|v| rate - div + 0.5 * v * v);
    let sig_sqrt = vols * &years.mapv(f64::sqrt);

    let d_plus = (log_moneyness + &drift) / &sig_sqrt;

    let normal = Normal::new(0.0, 1.0).unwrap();
    let cdf = d_plus.mapv(|x| normal.cdf(x));
    let pdf = d_plus.mapv(norm_pdf);

    Ok(DPlusParts { d_plus, cdf, pdf })
}

/// Dollar delta exposure grid: spot delta x open interest x spot level.
///
/// Calls use e^(-qT) CDF(d+), puts -e^(-qT) CDF(-d+).
pub fn delta_exposure(
    levels: &Array2<f64>,
    years: &Array1<f64>,
    div: f64,
    side: OptionSide,
    open_interest: &Array1<f64>,
    cdf: &Array2<f64>,
) -> Array2<f64> {
    let decay = years.mapv(|t| (-div * t).exp());
    let unit = match side {
        OptionSide::Call => cdf.clone() * &decay,
        OptionSide::Put => cdf.mapv(|c| c - 1.0) * &decay,
    };
    unit * open_interest * levels
}

/// Dollar gamma exposure grid: spot gamma x open interest x spot level
/// squared. The same for calls and puts.
pub fn gamma_exposure(
    levels: &Array2<f64>,
    vols: &Array1<f64>,
    years: &Array1<f64>,
    div: f64,
    open_interest: &Array1<f64>,
    pdf: &Array2<f64>,
) -> Array2<f64> {
    let decay = years.mapv(|t| (-div * t).exp());
    let sig_sqrt = vols * &years.mapv(f64::sqrt);
    let levels_sq = levels.mapv(|s| s * s);

    let unit = pdf.clone() * &decay / &sig_sqrt / levels;
    unit * open_interest * &levels_sq
}

/// Dollar vanna exposure grid: -e^(-qT) PDF(d+) (d-/sigma) x open
/// interest x spot level x vol. The same for calls and puts.
pub fn vanna_exposure(
    levels: &Array2<f64>,
    vols: &Array1<f64>,
    years: &Array1<f64>,
    div: f64,
    open_interest: &Array1<f64>,
    parts: &DPlusParts,
) -> Array2<f64> {
    let decay = years.mapv(|t| (-div * t).exp());
    let sig_sqrt = vols * &years.mapv(f64::sqrt);
    let d_minus = &parts.d_plus - &sig_sqrt;

    let unit = -(parts.pdf.clone() * &decay) * &(d_minus / vols);
    unit * open_interest * vols * levels
}

/// Dollar charm exposure grid, scaled by open interest x spot level x
/// year fraction.
///
/// Both sides share the drift correction
/// e^(-qT) PDF(d+) (2(r - q)T - d- sigma sqrt(T)) / (2T sigma sqrt(T));
/// the leading term is q e^(-qT) CDF(d+) for calls and
/// -q e^(-qT) CDF(-d+) for puts.
pub fn charm_exposure(
    levels: &Array2<f64>,
    vols: &Array1<f64>,
    years: &Array1<f64>,
    rate: f64,
    div: f64,
    side: OptionSide,
    open_interest: &Array1<f64>,
    parts: &DPlusParts,
) -> Array2<f64> {
    let decay = years.mapv(|t| (-div * t).exp());
    let sig_sqrt = vols * &years.mapv(f64::sqrt);
    let d_minus = &parts.d_plus - &sig_sqrt;

    let two_drift = years.mapv(|t| 2.0 * (rate - div) * t);
    let numer = (-(d_minus * &sig_sqrt) + &two_drift) * &parts.pdf * &decay;
    let denom = (years * &sig_sqrt).mapv(|x| 2.0 * x);
    let correction = numer / &denom;

    let lead = match side {
        OptionSide::Call => parts.cdf.clone() * &decay.mapv(|d| div * d),
        OptionSide::Put => parts.cdf.mapv(|c| c - 1.0) * &decay.mapv(|d| div * d),
    };

    (lead - correction) * open_interest * years * levels
}

/// Per-contract validity: a row contributes only with positive time to
/// expiry and positive vol.
pub fn valid_mask(years: &Array1<f64>, vols: &Array1<f64>) -> Vec<bool> {
    years
        .iter()
        .zip(vols.iter())
        .map(|(&t, &v)| t > 0.0 && v > 0.0)
        .collect()
}

/// Replace invalid vol/year entries with a harmless placeholder so the
/// grid formulas never divide by zero. The matching columns must be
/// zeroed with [`apply_mask`] afterwards.
pub fn sanitize_inputs(
    vols: &Array1<f64>,
    years: &Array1<f64>,
    mask: &[bool],
) -> (Array1<f64>, Array1<f64>) {
    let vols = Array1::from_iter(
        vols.iter()
            .zip(mask.iter())
            .map(|(&v, &ok)| if ok { v } else { 1.0 }),
    );
    let years = Array1::from_iter(
        years
            .iter()
            .zip(mask.iter())
            .map(|(&t, &ok)| if ok { t } else { 1.0 }),
    );
    (vols, years)
}

/// Zero every column whose contract failed the validity mask
pub fn apply_mask(matrix: &mut Array2<f64>, mask: &[bool]) {
    for (j, &ok) in mask.iter().enumerate() {
        if !ok {
            matrix.column_mut(j).fill(0.0);
        }
    }
}
