//! ExposureEngine - Main facade for the exposure pipeline
//!
//! Runs one analysis end to end: stale-expiry handling, calendar
//! context, scope filtering, rate lookup, aggregation, and flip search.

use chrono::Datelike;

use crate::calendar::CalendarResolver;
use crate::core::{ContractSet, ExposureSnapshot, GexError, GexResult};
use crate::data::chain::ChainPayload;
use crate::data::rates::{RateProvider, RateSource};

use super::{contract_exposures, find_flip, iv_summary, ladder_profiles, ExposureConfig, ExpiryScope};

/// Main engine that turns a chain payload into an exposure snapshot
pub struct ExposureEngine<S> {
    config: ExposureConfig,
    calendar: CalendarResolver,
    rates: RateProvider<S>,
}

impl<S: RateSource> ExposureEngine<S> {
    /// Create an engine with the default configuration
    pub fn new(rates: RateProvider<S>) -> Self {
        Self::with_config(ExposureConfig::default(), rates)
    }

    /// Create with custom configuration
    pub fn with_config(config: ExposureConfig, rates: RateProvider<S>) -> Self {
        Self {
            config,
            calendar: CalendarResolver::new(),
            rates,
        }
    }

    /// Get current configuration
    pub fn config(&self) -> &ExposureConfig {
        &self.config
    }

    /// Run the full pipeline on a normalized chain payload.
    ///
    /// # Arguments
    /// * `payload` - Parsed chain with spot and quote time
    /// * `scope` - Expiration scope to analyze
    ///
    /// # Returns
    /// The complete snapshot, or an error: recoverable `Data` when the
    /// chain is empty (before or after scope filtering), `Calendar`
    /// when the OPEX scope is requested but no OPEX session resolves,
    /// `Rate` when the rate lookup exhausts its retries
    pub fn analyze(&self, payload: &ChainPayload, scope: ExpiryScope) -> GexResult<ExposureSnapshot> {
        tracing::debug!(
            scope = scope.label(),
            rows = payload.contracts.len(),
            spot = payload.spot,
            "analyzing chain"
        );

        let (contracts, first_expiry) = self.resolve_first_expiry(payload)?;
        let context = self.calendar.context_for(first_expiry)?;

        let scoped = match scope {
            ExpiryScope::All => contracts,
            ExpiryScope::Monthly => {
                let tz = first_expiry.timezone();
                let cutoff = self
                    .calendar
                    .last_session_close(first_expiry.year(), first_expiry.month(), tz)?
                    .ok_or_else(|| GexError::calendar("expiry month has no sessions"))?;
                contracts.expiring_on_or_before(cutoff)
            }
            ExpiryScope::ZeroDte => contracts.only_expiry(first_expiry),
            ExpiryScope::Opex => {
                let opex = context
                    .monthly_opex
                    .ok_or_else(|| GexError::calendar("monthly OPEX could not be resolved"))?;
                contracts.expiring_on_or_before(opex)
            }
        };
        if scoped.is_empty() {
            return Err(GexError::data(format!(
                "no contracts remain under the {} scope",
                scope.label()
            )));
        }

        let rate = self.rates.rate_on(payload.as_of.date_naive())?;
        let band = self.config.band(payload.spot);
        let ladder = self.config.ladder(payload.spot);

        let per_contract = contract_exposures(&scoped, payload.spot, rate, &self.config)?;
        let profiles = ladder_profiles(
            &scoped,
            &ladder,
            first_expiry,
            context.monthly_opex,
            scope,
            rate,
            &self.config,
        )?;

        let delta_flip = find_flip(&ladder, &profiles.delta.all);
        if delta_flip.is_none() {
            tracing::warn!(scope = scope.label(), "delta flip not found");
        }
        let gamma_flip = find_flip(&ladder, &profiles.gamma.all);
        if gamma_flip.is_none() {
            tracing::warn!(scope = scope.label(), "gamma flip not found");
        }

        let ivs = iv_summary(&scoped, band, payload.as_of, self.config.iv_horizon_weeks);

        Ok(ExposureSnapshot {
            contracts: scoped,
            per_contract,
            as_of: payload.as_of,
            as_of_label: payload.as_of_label.clone(),
            first_expiry,
            monthly_opex: context.monthly_opex,
            spot: payload.spot,
            band,
            ladder,
            profiles,
            delta_flip,
            gamma_flip,
            ivs,
        })
    }

    /// Apply the stale-expiry rule: a nearest expiration already behind
    /// the quote time is dropped and the next one takes its place. With
    /// nothing after it, the stale expiration stays, with a warning.
    fn resolve_first_expiry(
        &self,
        payload: &ChainPayload,
    ) -> GexResult<(ContractSet, chrono::DateTime<chrono_tz::Tz>)> {
        let contracts = payload.contracts.clone();
        let first_expiry = contracts
            .first_expiry()
            .ok_or_else(|| GexError::data("chain has no contracts"))?;
        if payload.as_of <= first_expiry {
            return Ok((contracts, first_expiry));
        }

        let remaining = contracts.without_expiry(first_expiry);
        match remaining.first_expiry() {
            Some(next) => {
                tracing::debug!(stale = %first_expiry, next = %next, "dropped stale expiry");
                Ok((remaining, next))
            }
            None => {
                tracing::warn!(stale = %first_expiry, "no later expiration available, keeping stale expiry");
                Ok((contracts, first_expiry))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ContractRecord;
    use crate::data::rates::FixedRate;
    use chrono::{DateTime, TimeZone};
    use chrono_tz::America::New_York;
    use chrono_tz::Tz;

    fn ny_close(y: i32, m: u32, d: u32) -> DateTime<Tz> {
        New_York.with_ymd_and_hms(y, m, d, 16, 0, 0).unwrap()
    }

    fn record(strike: f64, expiry: DateTime<Tz>, years: f64) -> ContractRecord {
        ContractRecord {
            strike,
            expiry,
            call_iv: 0.15,
            put_iv: 0.17,
            call_open_interest: 1200.0,
            put_open_interest: 900.0,
            call_delta: 0.55,
            put_delta: -0.45,
            call_gamma: 0.002,
            put_gamma: 0.002,
            years_to_expiry: years,
        }
    }

    fn payload(contracts: Vec<ContractRecord>, as_of: DateTime<Tz>) -> ChainPayload {
        ChainPayload {
            spot: 5450.0,
            as_of,
            as_of_label: "2024 Jun 21, 03:30 PM EDT (15min delay)".to_string(),
            contracts: ContractSet::new(contracts),
        }
    }

    fn engine() -> ExposureEngine<FixedRate> {
        let config = ExposureConfig {
            ladder_size: 9,
            ..Default::default()
        };
        ExposureEngine::with_config(config, RateProvider::new(FixedRate::new(5.0)))
    }

    #[test]
    fn test_analyze_all_scope() {
        // June 21 2024 is both the nearest expiry and June's OPEX.
        let as_of = New_York.with_ymd_and_hms(2024, 6, 21, 15, 30, 0).unwrap();
        let chain = payload(
            vec![
                record(5400.0, ny_close(2024, 6, 21), 1.0 / 252.0),
                record(5500.0, ny_close(2024, 7, 19), 20.0 / 252.0),
            ],
            as_of,
        );

        let snapshot = engine().analyze(&chain, ExpiryScope::All).unwrap();

        assert_eq!(snapshot.first_expiry, ny_close(2024, 6, 21));
        assert_eq!(snapshot.monthly_opex, Some(ny_close(2024, 6, 21)));
        assert_eq!(snapshot.contracts.len(), 2);
        assert_eq!(snapshot.per_contract.len(), 2);
        assert_eq!(snapshot.band, (2725.0, 8175.0));
        assert_eq!(snapshot.ladder.len(), 9);
        assert!(snapshot.profiles.delta.ex_next.is_some());
        assert!(snapshot.profiles.gamma.ex_opex.is_some());
        assert!(snapshot.as_of_label.ends_with("(15min delay)"));
    }

    #[test]
    fn test_scope_filters_rows() {
        let as_of = New_York.with_ymd_and_hms(2024, 6, 21, 15, 30, 0).unwrap();
        let chain = payload(
            vec![
                record(5400.0, ny_close(2024, 6, 21), 1.0 / 252.0),
                record(5450.0, ny_close(2024, 6, 28), 5.0 / 252.0),
                record(5500.0, ny_close(2024, 7, 19), 20.0 / 252.0),
            ],
            as_of,
        );
        let engine = engine();

        let zero_dte = engine.analyze(&chain, ExpiryScope::ZeroDte).unwrap();
        assert_eq!(zero_dte.contracts.len(), 1);
        assert!(zero_dte.profiles.delta.ex_next.is_none());

        // June's last session is the 28th, so July drops out.
        let monthly = engine.analyze(&chain, ExpiryScope::Monthly).unwrap();
        assert_eq!(monthly.contracts.len(), 2);

        // OPEX cutoff is June 21 itself.
        let opex = engine.analyze(&chain, ExpiryScope::Opex).unwrap();
        assert_eq!(opex.contracts.len(), 1);
    }

    #[test]
    fn test_stale_expiry_dropped() {
        // Monday after the June 21 close.
        let as_of = New_York.with_ymd_and_hms(2024, 6, 24, 10, 0, 0).unwrap();
        let chain = payload(
            vec![
                record(5400.0, ny_close(2024, 6, 21), -(1.0 / 252.0)),
                record(5500.0, ny_close(2024, 7, 19), 18.0 / 252.0),
            ],
            as_of,
        );

        let snapshot = engine().analyze(&chain, ExpiryScope::All).unwrap();

        assert_eq!(snapshot.first_expiry, ny_close(2024, 7, 19));
        assert_eq!(snapshot.contracts.len(), 1);
        // The calendar context follows the new first expiry into July.
        assert_eq!(snapshot.monthly_opex, Some(ny_close(2024, 7, 19)));
    }

    #[test]
    fn test_stale_expiry_kept_when_alone() {
        let as_of = New_York.with_ymd_and_hms(2024, 6, 24, 10, 0, 0).unwrap();
        let chain = payload(
            vec![record(5400.0, ny_close(2024, 6, 21), -(1.0 / 252.0))],
            as_of,
        );

        let snapshot = engine().analyze(&chain, ExpiryScope::All).unwrap();
        assert_eq!(snapshot.first_expiry, ny_close(2024, 6, 21));
        assert_eq!(snapshot.contracts.len(), 1);
    }

    #[test]
    fn test_opex_scope_can_empty_the_chain() {
        // A chain whose only expiry lies after June's OPEX.
        let as_of = New_York.with_ymd_and_hms(2024, 6, 24, 10, 0, 0).unwrap();
        let chain = payload(
            vec![record(5400.0, ny_close(2024, 6, 28), 4.0 / 252.0)],
            as_of,
        );

        let err = engine().analyze(&chain, ExpiryScope::Opex).unwrap_err();
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_flips_present_for_straddling_profile() {
        // A heavy put book below spot and call book above it makes the
        // net delta and gamma cross zero inside the band.
        let as_of = New_York.with_ymd_and_hms(2024, 6, 21, 15, 30, 0).unwrap();
        let expiry = ny_close(2024, 7, 19);
        let mut put_heavy = record(4800.0, expiry, 20.0 / 252.0);
        put_heavy.call_open_interest = 0.0;
        put_heavy.put_open_interest = 60000.0;
        let mut call_heavy = record(6000.0, expiry, 20.0 / 252.0);
        call_heavy.call_open_interest = 60000.0;
        call_heavy.put_open_interest = 0.0;

        let chain = payload(vec![put_heavy, call_heavy], as_of);
        let snapshot = engine().analyze(&chain, ExpiryScope::All).unwrap();

        let gamma_flip = snapshot.gamma_flip.unwrap();
        assert!(gamma_flip > snapshot.band.0 && gamma_flip < snapshot.band.1);
    }
}
