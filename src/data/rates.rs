//! Risk-free rate lookup.
//!
//! Provides:
//! - [`RateSource`], the seam over daily rate-index closes
//! - [`RateProvider`], which resolves the rate effective on a date
//! - [`FixedRate`], a constant source for offline runs and tests
//!
//! Rate indices quote in percent (a 13-week bill index prints 5.28 for
//! 5.28%), so resolved rates are divided by 100 before use. Closes are
//! published on trading days only, so the lookup walks backwards over
//! weekends and holidays until it finds one, up to a bounded number of
//! attempts.

use std::time::Duration as StdDuration;

use chrono::{Duration, NaiveDate};

use crate::core::{GexError, GexResult};
use crate::data::cache::TtlCache;

/// Calendar span of a single observation request.
const LOOKBACK_WINDOW_DAYS: i64 = 5;
/// How far the anchor steps back when a window comes up empty.
const RETRY_STEP_DAYS: i64 = 2;
/// Empty windows tolerated before the lookup fails.
const MAX_LOOKBACKS: usize = 10;

/// One daily close of a rate index, quoted in percent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateObservation {
    pub date: NaiveDate,
    pub close: f64,
}

/// Source of daily rate-index closes over a calendar date range.
pub trait RateSource {
    /// Closes for dates in `[start, end]`, in any order. An empty
    /// vector means no sessions closed in the range.
    fn observations(&self, start: NaiveDate, end: NaiveDate) -> GexResult<Vec<RateObservation>>;
}

/// A constant percent-quoted rate, reported for any requested date.
#[derive(Debug, Clone, Copy)]
pub struct FixedRate {
    percent: f64,
}

impl FixedRate {
    pub fn new(percent: f64) -> Self {
        Self { percent }
    }
}

impl RateSource for FixedRate {
    fn observations(&self, _start: NaiveDate, end: NaiveDate) -> GexResult<Vec<RateObservation>> {
        Ok(vec![RateObservation {
            date: end,
            close: self.percent,
        }])
    }
}

/// Resolves the decimal risk-free rate effective on a date, caching
/// results so repeated snapshots within a session reuse one lookup.
pub struct RateProvider<S> {
    source: S,
    cache: TtlCache<NaiveDate, f64>,
    ttl: StdDuration,
}

impl<S: RateSource> RateProvider<S> {
    pub const DEFAULT_TTL: StdDuration = StdDuration::from_secs(15 * 60);

    pub fn new(source: S) -> Self {
        Self::with_ttl(source, Self::DEFAULT_TTL)
    }

    pub fn with_ttl(source: S, ttl: StdDuration) -> Self {
        Self {
            source,
            cache: TtlCache::new(),
            ttl,
        }
    }

    /// Decimal rate effective on `date`, from the most recent close at
    /// or before it.
    pub fn rate_on(&self, date: NaiveDate) -> GexResult<f64> {
        self.cache
            .get_or_insert_with(date, self.ttl, || self.fetch_rate(date))
    }

    fn fetch_rate(&self, date: NaiveDate) -> GexResult<f64> {
        let mut anchor = date;
        for attempt in 0..MAX_LOOKBACKS {
            let start = anchor - Duration::days(LOOKBACK_WINDOW_DAYS);
            let mut observations = self
                .source
                .observations(start, anchor)
                .map_err(|e| GexError::rate(format!("rate source failed: {e}")))?;
            observations.retain(|obs| obs.date <= date);
            if let Some(latest) = observations
                .iter()
                .max_by(|a, b| a.date.cmp(&b.date))
            {
                if attempt > 0 {
                    tracing::debug!(%date, close_date = %latest.date, attempt, "rate found after lookback");
                }
                return Ok(latest.close / 100.0);
            }
            anchor -= Duration::days(RETRY_STEP_DAYS);
        }
        Err(GexError::rate(format!(
            "no rate close within {MAX_LOOKBACKS} lookbacks of {date}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct ScriptedSource {
        // Ranges requested so far, and the closes handed back per call.
        calls: Mutex<Vec<(NaiveDate, NaiveDate)>>,
        responses: Mutex<Vec<Vec<RateObservation>>>,
    }

    impl ScriptedSource {
        fn new(responses: Vec<Vec<RateObservation>>) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                responses: Mutex::new(responses),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    impl RateSource for &ScriptedSource {
        fn observations(
            &self,
            start: NaiveDate,
            end: NaiveDate,
        ) -> GexResult<Vec<RateObservation>> {
            self.calls.lock().unwrap().push((start, end));
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                Ok(Vec::new())
            } else {
                Ok(responses.remove(0))
            }
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn obs(y: i32, m: u32, d: u32, close: f64) -> RateObservation {
        RateObservation {
            date: date(y, m, d),
            close,
        }
    }

    #[test]
    fn test_most_recent_close_wins() {
        let source = ScriptedSource::new(vec![vec![
            obs(2024, 6, 18, 5.31),
            obs(2024, 6, 20, 5.28),
            obs(2024, 6, 19, 5.30),
        ]]);
        let provider = RateProvider::new(&source);
        assert_eq!(provider.rate_on(date(2024, 6, 21)).unwrap(), 0.0528);
    }

    #[test]
    fn test_future_closes_ignored() {
        let source = ScriptedSource::new(vec![vec![
            obs(2024, 6, 20, 5.28),
            obs(2024, 6, 24, 5.40),
        ]]);
        let provider = RateProvider::new(&source);
        // The 24th postdates the request and must not win.
        assert_eq!(provider.rate_on(date(2024, 6, 21)).unwrap(), 0.0528);
    }

    #[test]
    fn test_lookback_steps_anchor() {
        let source = ScriptedSource::new(vec![
            Vec::new(),
            Vec::new(),
            vec![obs(2024, 6, 14, 5.25)],
        ]);
        let provider = RateProvider::new(&source);
        assert_eq!(provider.rate_on(date(2024, 6, 21)).unwrap(), 0.0525);

        let calls = source.calls.lock().unwrap().clone();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0], (date(2024, 6, 16), date(2024, 6, 21)));
        assert_eq!(calls[1], (date(2024, 6, 14), date(2024, 6, 19)));
        assert_eq!(calls[2], (date(2024, 6, 12), date(2024, 6, 17)));
    }

    #[test]
    fn test_lookback_gives_up() {
        let source = ScriptedSource::new(Vec::new());
        let provider = RateProvider::new(&source);
        let err = provider.rate_on(date(2024, 6, 21)).unwrap_err();
        assert!(matches!(err, GexError::Rate(_)));
        assert_eq!(source.call_count(), 10);
    }

    #[test]
    fn test_rates_are_cached_per_date() {
        let source = ScriptedSource::new(vec![
            vec![obs(2024, 6, 20, 5.28)],
            vec![obs(2024, 6, 21, 5.26)],
        ]);
        let provider = RateProvider::new(&source);
        assert_eq!(provider.rate_on(date(2024, 6, 21)).unwrap(), 0.0528);
        assert_eq!(provider.rate_on(date(2024, 6, 21)).unwrap(), 0.0528);
        assert_eq!(source.call_count(), 1);

        assert_eq!(provider.rate_on(date(2024, 6, 24)).unwrap(), 0.0526);
        assert_eq!(source.call_count(), 2);
    }

    #[test]
    fn test_fixed_rate() {
        let provider = RateProvider::new(FixedRate::new(5.0));
        assert_eq!(provider.rate_on(date(2024, 6, 21)).unwrap(), 0.05);
    }
}
