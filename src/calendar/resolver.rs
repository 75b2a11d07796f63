//! Trading sessions and expiration anchors
//!
//! Resolves the session list for a month, the monthly OPEX session, and
//! the calendar context one analysis run needs. Month lookups are
//! cached because the session list only changes when the calendar rules
//! do.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Weekday};
use chrono_tz::Tz;
use std::time::Duration as StdDuration;

use crate::calendar::holidays;
use crate::core::{GexError, GexResult};
use crate::data::cache::TtlCache;

/// Count weekdays in the half-open range [from, to). Holidays still
/// count; only Saturdays and Sundays are skipped. An inverted range
/// yields a negative count, so expired rows keep a negative year
/// fraction and fail the validity mask downstream.
pub fn weekdays_between(from: NaiveDate, to: NaiveDate) -> i64 {
    if to < from {
        return -weekdays_between(to, from);
    }
    let full_weeks = (to - from).num_days() / 7;
    let mut count = full_weeks * 5;
    let mut day = from + Duration::days(full_weeks * 7);
    while day < to {
        if day.weekday().num_days_from_monday() < 5 {
            count += 1;
        }
        day += Duration::days(1);
    }
    count
}

/// All trading sessions of a month: weekdays minus full closures
pub fn trading_sessions(year: i32, month: u32) -> GexResult<Vec<NaiveDate>> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| GexError::calendar(format!("invalid month {}-{:02}", year, month)))?;
    let closures = holidays::full_closures(year);

    let mut sessions = Vec::with_capacity(23);
    let mut day = first;
    while day.month() == month {
        if day.weekday().num_days_from_monday() < 5 && !closures.contains(&day) {
            sessions.push(day);
        }
        day += Duration::days(1);
    }
    Ok(sessions)
}

/// The monthly OPEX session: the Friday session with day-of-month in
/// 15..=21, or the Thursday session in the same window when that Friday
/// is a closure.
pub fn monthly_opex_session(sessions: &[NaiveDate]) -> Option<NaiveDate> {
    let in_window = |d: &&NaiveDate| (15..=21).contains(&d.day());

    sessions
        .iter()
        .filter(in_window)
        .find(|d| d.weekday() == Weekday::Fri)
        .or_else(|| {
            sessions
                .iter()
                .filter(in_window)
                .find(|d| d.weekday() == Weekday::Thu)
        })
        .copied()
}

/// A date at the 16:00 session close in the exchange timezone
pub fn session_close(date: NaiveDate, tz: Tz) -> GexResult<DateTime<Tz>> {
    let naive = date
        .and_hms_opt(16, 0, 0)
        .ok_or_else(|| GexError::calendar("16:00 is not representable"))?;
    tz.from_local_datetime(&naive)
        .single()
        .ok_or_else(|| GexError::calendar(format!("16:00 is not a valid local time on {}", date)))
}

/// Sessions and OPEX for one month
#[derive(Debug, Clone)]
pub struct MonthCalendar {
    pub sessions: Vec<NaiveDate>,
    pub opex: Option<NaiveDate>,
}

/// The calendar inputs one analysis run needs
#[derive(Debug, Clone)]
pub struct CalendarContext {
    /// Nearest expiration the run anchors on
    pub first_expiry: DateTime<Tz>,
    /// Trading sessions of the first expiry's month
    pub sessions: Vec<NaiveDate>,
    /// Monthly OPEX close, when one could be resolved
    pub monthly_opex: Option<DateTime<Tz>>,
}

/// Month-calendar resolver with a TTL cache keyed by (year, month)
pub struct CalendarResolver {
    cache: TtlCache<(i32, u32), MonthCalendar>,
    ttl: StdDuration,
}

impl CalendarResolver {
    /// Default 4 hour TTL
    pub fn new() -> Self {
        Self::with_ttl(StdDuration::from_secs(4 * 3600))
    }

    pub fn with_ttl(ttl: StdDuration) -> Self {
        Self {
            cache: TtlCache::new(),
            ttl,
        }
    }

    /// Sessions and OPEX for a month, from cache when fresh
    pub fn month_calendar(&self, year: i32, month: u32) -> GexResult<MonthCalendar> {
        self.cache.get_or_insert_with((year, month), self.ttl, || {
            let sessions = trading_sessions(year, month)?;
            let opex = monthly_opex_session(&sessions);
            tracing::debug!(year, month, n_sessions = sessions.len(), "resolved month calendar");
            Ok(MonthCalendar { sessions, opex })
        })
    }

    /// Build the context for a run anchored on the given first expiry.
    /// A month without a resolvable OPEX is logged and carried as None.
    pub fn context_for(&self, first_expiry: DateTime<Tz>) -> GexResult<CalendarContext> {
        let month = self.month_calendar(first_expiry.year(), first_expiry.month())?;

        let monthly_opex = match month.opex {
            Some(date) => Some(session_close(date, first_expiry.timezone())?),
            None => {
                tracing::warn!(
                    year = first_expiry.year(),
                    month = first_expiry.month(),
                    "no monthly OPEX session in window"
                );
                None
            }
        };

        Ok(CalendarContext {
            first_expiry,
            sessions: month.sessions,
            monthly_opex,
        })
    }

    /// Close of the month's final session, for the monthly scope cutoff
    pub fn last_session_close(&self, year: i32, month: u32, tz: Tz) -> GexResult<Option<DateTime<Tz>>> {
        let calendar = self.month_calendar(year, month)?;
        match calendar.sessions.last() {
            Some(&date) => Ok(Some(session_close(date, tz)?)),
            None => Ok(None),
        }
    }
}

impl Default for CalendarResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;
    use chrono_tz::America::New_York;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_weekdays_between() {
        // Monday through Friday of one week, half-open
        assert_eq!(weekdays_between(date(2024, 6, 17), date(2024, 6, 21)), 4);
        // Friday to Monday spans the weekend
        assert_eq!(weekdays_between(date(2024, 6, 21), date(2024, 6, 24)), 1);
        // Same day is zero, inverted ranges go negative
        assert_eq!(weekdays_between(date(2024, 6, 21), date(2024, 6, 21)), 0);
        assert_eq!(weekdays_between(date(2024, 6, 24), date(2024, 6, 21)), -1);
        assert_eq!(weekdays_between(date(2024, 6, 28), date(2024, 6, 21)), -5);
        // Two full weeks
        assert_eq!(weekdays_between(date(2024, 6, 10), date(2024, 6, 24)), 10);
    }

    #[test]
    fn test_june_2024_sessions() {
        let sessions = trading_sessions(2024, 6).unwrap();
        // 20 weekdays minus Juneteenth
        assert_eq!(sessions.len(), 19);
        assert!(!sessions.contains(&date(2024, 6, 19)));
        assert_eq!(sessions.first(), Some(&date(2024, 6, 3)));
        assert_eq!(sessions.last(), Some(&date(2024, 6, 28)));
    }

    #[test]
    fn test_opex_regular_friday() {
        let sessions = trading_sessions(2024, 6).unwrap();
        assert_eq!(monthly_opex_session(&sessions), Some(date(2024, 6, 21)));
    }

    #[test]
    fn test_opex_good_friday_falls_back_to_thursday() {
        // April 2025: the third Friday (the 18th) is Good Friday
        let sessions = trading_sessions(2025, 4).unwrap();
        assert!(!sessions.contains(&date(2025, 4, 18)));
        assert_eq!(monthly_opex_session(&sessions), Some(date(2025, 4, 17)));
    }

    #[test]
    fn test_context_localizes_opex() {
        let resolver = CalendarResolver::new();
        let first_expiry = New_York.with_ymd_and_hms(2024, 6, 7, 16, 0, 0).unwrap();

        let ctx = resolver.context_for(first_expiry).unwrap();
        let opex = ctx.monthly_opex.unwrap();
        assert_eq!(opex.date_naive(), date(2024, 6, 21));
        assert_eq!(opex.hour(), 16);
        assert_eq!(ctx.sessions.len(), 19);
    }

    #[test]
    fn test_last_session_close() {
        let resolver = CalendarResolver::new();
        let close = resolver
            .last_session_close(2024, 6, New_York)
            .unwrap()
            .unwrap();
        assert_eq!(close.date_naive(), date(2024, 6, 28));
    }
}
