//! Exposure aggregation over a normalized chain
//!
//! Provides:
//! - Per-contract dollar exposures evaluated at the actual spot
//! - Ladder profiles for the four greeks under expiration filters
//! - Implied-vol means by strike and by expiration
//!
//! Per-contract delta and gamma come from the feed-reported greeks;
//! vanna and charm come from the formula grids evaluated at a single
//! spot level. The ladder profiles are fully formula-driven. The put
//! side's dealer-gamma sign flip happens here, at combination time,
//! never inside the side-agnostic gamma formula.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration};
use chrono_tz::Tz;
use ndarray::{Array1, Array2, Axis};

use crate::core::{
    ContractExposure, ContractSet, ExposureProfiles, GexResult, IvSummary, OptionSide,
    ProfileCurve,
};
use crate::models::black_scholes::{
    apply_mask, charm_exposure, d_plus_parts, delta_exposure, gamma_exposure, sanitize_inputs,
    valid_mask, vanna_exposure,
};

use super::{ExposureConfig, ExpiryScope};

/// Masked formula grids for one option side over a level column.
struct SideGrids {
    delta: Array2<f64>,
    gamma: Array2<f64>,
    vanna: Array2<f64>,
    charm: Array2<f64>,
}

fn side_grids(
    contracts: &ContractSet,
    levels: &Array2<f64>,
    side: OptionSide,
    rate: f64,
    div: f64,
) -> GexResult<SideGrids> {
    let strikes = contracts.strikes();
    let years = contracts.years_to_expiry();
    let vols = contracts.ivs(side);
    let open_interest = contracts.open_interest(side);

    let mask = valid_mask(&years, &vols);
    let (vols, years) = sanitize_inputs(&vols, &years, &mask);
    let parts = d_plus_parts(levels, &strikes, &vols, &years, rate, div)?;

    let mut delta = delta_exposure(levels, &years, div, side, &open_interest, &parts.cdf);
    let mut gamma = gamma_exposure(levels, &vols, &years, div, &open_interest, &parts.pdf);
    let mut vanna = vanna_exposure(levels, &vols, &years, div, &open_interest, &parts);
    let mut charm = charm_exposure(levels, &vols, &years, rate, div, side, &open_interest, &parts);
    apply_mask(&mut delta, &mask);
    apply_mask(&mut gamma, &mask);
    apply_mask(&mut vanna, &mask);
    apply_mask(&mut charm, &mask);

    Ok(SideGrids {
        delta,
        gamma,
        vanna,
        charm,
    })
}

/// Sum a grid across contracts, optionally keeping only some columns.
fn filtered_row_sums(grid: &Array2<f64>, keep: Option<&[bool]>) -> Array1<f64> {
    match keep {
        None => grid.sum_axis(Axis(1)),
        Some(keep) => {
            let mut sums = Array1::zeros(grid.nrows());
            for (j, &kept) in keep.iter().enumerate() {
                if kept {
                    sums += &grid.column(j);
                }
            }
            sums
        }
    }
}

/// Combine call and put row sums into one scaled series. `put_sign` is
/// +1 for delta (the put formula is already negative) and -1 for the
/// side-agnostic greeks.
fn series(
    call: &Array2<f64>,
    put: &Array2<f64>,
    put_sign: f64,
    keep: Option<&[bool]>,
    scale: f64,
) -> Array1<f64> {
    (filtered_row_sums(call, keep) + filtered_row_sums(put, keep) * put_sign) / scale
}

/// Per-contract dollar exposures at the actual spot, in chain order.
///
/// # Arguments
/// * `contracts` - Normalized chain after scope filtering
/// * `spot` - Underlying spot price
/// * `rate` - Risk-free rate (decimal)
/// * `config` - Scale divisor and dividend yield
///
/// # Returns
/// One [`ContractExposure`] per chain row, every column scaled by the
/// configured divisor
pub fn contract_exposures(
    contracts: &ContractSet,
    spot: f64,
    rate: f64,
    config: &ExposureConfig,
) -> GexResult<Vec<ContractExposure>> {
    if contracts.is_empty() {
        return Ok(Vec::new());
    }

    let spot_level = Array2::from_elem((1, 1), spot);
    let strikes = contracts.strikes();
    let years = contracts.years_to_expiry();

    let spot_rows = |side: OptionSide| -> GexResult<(Vec<f64>, Vec<f64>)> {
        let vols = contracts.ivs(side);
        let open_interest = contracts.open_interest(side);
        let mask = valid_mask(&years, &vols);
        let (vols, years) = sanitize_inputs(&vols, &years, &mask);
        let parts = d_plus_parts(
            &spot_level,
            &strikes,
            &vols,
            &years,
            rate,
            config.dividend_yield,
        )?;
        let mut vanna = vanna_exposure(
            &spot_level,
            &vols,
            &years,
            config.dividend_yield,
            &open_interest,
            &parts,
        );
        let mut charm = charm_exposure(
            &spot_level,
            &vols,
            &years,
            rate,
            config.dividend_yield,
            side,
            &open_interest,
            &parts,
        );
        apply_mask(&mut vanna, &mask);
        apply_mask(&mut charm, &mask);
        Ok((vanna.row(0).to_vec(), charm.row(0).to_vec()))
    };
    let (call_vanna, call_charm) = spot_rows(OptionSide::Call)?;
    let (put_vanna, put_charm) = spot_rows(OptionSide::Put)?;

    let scale = config.scale;
    let rows = contracts
        .records()
        .iter()
        .enumerate()
        .map(|(i, r)| {
            // Delta and gamma exposure use the feed's own greeks, so a
            // zero-IV row still reports them; only the computed vanna
            // and charm columns honor the validity mask.
            let call_delta_exposure = r.call_delta * r.call_open_interest * spot / scale;
            let put_delta_exposure = r.put_delta * r.put_open_interest * spot / scale;
            let call_gamma_exposure = r.call_gamma * r.call_open_interest * spot * spot / scale;
            let put_gamma_exposure = -(r.put_gamma * r.put_open_interest * spot * spot) / scale;
            let call_vanna_exposure = call_vanna[i] / scale;
            let put_vanna_exposure = put_vanna[i] / scale;
            let call_charm_exposure = call_charm[i] / scale;
            let put_charm_exposure = put_charm[i] / scale;

            ContractExposure {
                strike: r.strike,
                expiry: r.expiry,
                call_delta_exposure,
                put_delta_exposure,
                call_gamma_exposure,
                put_gamma_exposure,
                call_vanna_exposure,
                put_vanna_exposure,
                call_charm_exposure,
                put_charm_exposure,
                delta: call_delta_exposure + put_delta_exposure,
                gamma: call_gamma_exposure + put_gamma_exposure,
                vanna: call_vanna_exposure - put_vanna_exposure,
                charm: call_charm_exposure - put_charm_exposure,
            }
        })
        .collect();
    Ok(rows)
}

/// Ladder profiles for the four greeks.
///
/// # Arguments
/// * `contracts` - Normalized chain after scope filtering
/// * `ladder` - Spot levels to evaluate, ascending
/// * `first_expiry` - Nearest expiration, excluded from `ex_next`
/// * `monthly_opex` - OPEX expiration, excluded from `ex_opex`
/// * `scope` - Expiration scope of the request; 0DTE drops `ex_next`,
///   anything but the all-expirations scope drops `ex_opex`
/// * `rate` - Risk-free rate (decimal)
/// * `config` - Scale divisor and dividend yield
pub fn ladder_profiles(
    contracts: &ContractSet,
    ladder: &Array1<f64>,
    first_expiry: DateTime<Tz>,
    monthly_opex: Option<DateTime<Tz>>,
    scope: ExpiryScope,
    rate: f64,
    config: &ExposureConfig,
) -> GexResult<ExposureProfiles> {
    if contracts.is_empty() {
        let zero = || ProfileCurve::all_only(Array1::zeros(ladder.len()));
        return Ok(ExposureProfiles {
            delta: zero(),
            gamma: zero(),
            vanna: zero(),
            charm: zero(),
        });
    }

    let levels = ladder.clone().insert_axis(Axis(1));
    let call = side_grids(contracts, &levels, OptionSide::Call, rate, config.dividend_yield)?;
    let put = side_grids(contracts, &levels, OptionSide::Put, rate, config.dividend_yield)?;

    let keep_not_first: Vec<bool> = contracts
        .records()
        .iter()
        .map(|r| r.expiry != first_expiry)
        .collect();
    let keep_not_opex: Option<Vec<bool>> = monthly_opex.map(|opex| {
        contracts
            .records()
            .iter()
            .map(|r| r.expiry != opex)
            .collect()
    });

    let scale = config.scale;
    let curve = |call_grid: &Array2<f64>, put_grid: &Array2<f64>, put_sign: f64| {
        let ex_next = (scope != ExpiryScope::ZeroDte)
            .then(|| series(call_grid, put_grid, put_sign, Some(&keep_not_first), scale));
        let ex_opex = if scope == ExpiryScope::All {
            keep_not_opex
                .as_deref()
                .map(|keep| series(call_grid, put_grid, put_sign, Some(keep), scale))
        } else {
            None
        };
        ProfileCurve {
            all: series(call_grid, put_grid, put_sign, None, scale),
            ex_next,
            ex_opex,
        }
    };

    Ok(ExposureProfiles {
        delta: curve(&call.delta, &put.delta, 1.0),
        gamma: curve(&call.gamma, &put.gamma, -1.0),
        vanna: curve(&call.vanna, &put.vanna, -1.0),
        charm: curve(&call.charm, &put.charm, -1.0),
    })
}

/// Mean implied vols by strike within the band and by expiration within
/// the horizon. Out-of-band strikes stay in the chain; they are only
/// dropped from the summary.
pub fn iv_summary(
    contracts: &ContractSet,
    band: (f64, f64),
    as_of: DateTime<Tz>,
    horizon_weeks: i64,
) -> IvSummary {
    let records = contracts.records();

    let mut in_band: Vec<(f64, f64, f64)> = records
        .iter()
        .filter(|r| r.strike >= band.0 && r.strike <= band.1)
        .map(|r| (r.strike, r.call_iv, r.put_iv))
        .collect();
    in_band.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut strikes = Vec::new();
    let mut call_by_strike = Vec::new();
    let mut put_by_strike = Vec::new();
    let mut i = 0;
    while i < in_band.len() {
        let strike = in_band[i].0;
        let (mut call_sum, mut put_sum, mut count) = (0.0, 0.0, 0.0);
        while i < in_band.len() && in_band[i].0 == strike {
            call_sum += in_band[i].1;
            put_sum += in_band[i].2;
            count += 1.0;
            i += 1;
        }
        strikes.push(strike);
        call_by_strike.push(call_sum / count);
        put_by_strike.push(put_sum / count);
    }

    let cutoff = as_of + Duration::weeks(horizon_weeks);
    let mut by_expiry: BTreeMap<DateTime<Tz>, (f64, f64, f64)> = BTreeMap::new();
    for r in records.iter().filter(|r| r.expiry <= cutoff) {
        let entry = by_expiry.entry(r.expiry).or_insert((0.0, 0.0, 0.0));
        entry.0 += r.call_iv;
        entry.1 += r.put_iv;
        entry.2 += 1.0;
    }

    let mut expiries = Vec::with_capacity(by_expiry.len());
    let mut call_by_expiry = Vec::with_capacity(by_expiry.len());
    let mut put_by_expiry = Vec::with_capacity(by_expiry.len());
    for (expiry, (call_sum, put_sum, count)) in by_expiry {
        expiries.push(expiry);
        call_by_expiry.push(call_sum / count);
        put_by_expiry.push(put_sum / count);
    }

    IvSummary {
        strikes,
        call_by_strike,
        put_by_strike,
        expiries,
        call_by_expiry,
        put_by_expiry,
    }
}
