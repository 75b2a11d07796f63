//! NYSE full-closure holidays
//!
//! Only full-day closures matter here; early closes still count as
//! trading sessions for expiration purposes.

use chrono::{Datelike, Duration, NaiveDate, Weekday};

/// All full-closure dates for a year, ascending
pub fn full_closures(year: i32) -> Vec<NaiveDate> {
    let mut days = Vec::with_capacity(10);

    if let Some(d) = new_years_day(year) {
        days.push(d);
    }
    if let Some(d) = nth_weekday(year, 1, Weekday::Mon, 3) {
        days.push(d); // Martin Luther King Jr. Day
    }
    if let Some(d) = nth_weekday(year, 2, Weekday::Mon, 3) {
        days.push(d); // Washington's Birthday
    }
    if let Some(d) = good_friday(year) {
        days.push(d);
    }
    if let Some(d) = last_weekday(year, 5, Weekday::Mon) {
        days.push(d); // Memorial Day
    }
    // Juneteenth became an exchange holiday in 2022
    if year >= 2022 {
        if let Some(d) = NaiveDate::from_ymd_opt(year, 6, 19).and_then(observed) {
            days.push(d);
        }
    }
    if let Some(d) = NaiveDate::from_ymd_opt(year, 7, 4).and_then(observed) {
        days.push(d); // Independence Day
    }
    if let Some(d) = nth_weekday(year, 9, Weekday::Mon, 1) {
        days.push(d); // Labor Day
    }
    if let Some(d) = nth_weekday(year, 11, Weekday::Thu, 4) {
        days.push(d); // Thanksgiving
    }
    if let Some(d) = NaiveDate::from_ymd_opt(year, 12, 25).and_then(observed) {
        days.push(d); // Christmas
    }

    days.sort();
    days
}

/// Is the exchange fully closed on this date?
pub fn is_full_closure(date: NaiveDate) -> bool {
    full_closures(date.year()).contains(&date)
}

/// Weekend observance shift: Saturday holidays are observed the Friday
/// before, Sunday holidays the Monday after.
fn observed(date: NaiveDate) -> Option<NaiveDate> {
    match date.weekday() {
        Weekday::Sat => Some(date - Duration::days(1)),
        Weekday::Sun => Some(date + Duration::days(1)),
        _ => Some(date),
    }
}

/// New Year's Day. A Saturday January 1st is not observed at all; the
/// exchange does not close the prior year's final session.
fn new_years_day(year: i32) -> Option<NaiveDate> {
    let jan1 = NaiveDate::from_ymd_opt(year, 1, 1)?;
    match jan1.weekday() {
        Weekday::Sat => None,
        Weekday::Sun => Some(jan1 + Duration::days(1)),
        _ => Some(jan1),
    }
}

/// Nth occurrence of a weekday in a month (1-based)
fn nth_weekday(year: i32, month: u32, weekday: Weekday, n: u32) -> Option<NaiveDate> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let offset = (weekday.num_days_from_monday() + 7 - first.weekday().num_days_from_monday()) % 7;
    let date = first + Duration::days(offset as i64 + 7 * (n as i64 - 1));
    (date.month() == month).then_some(date)
}

/// Last occurrence of a weekday in a month
fn last_weekday(year: i32, month: u32, weekday: Weekday) -> Option<NaiveDate> {
    let mut n = 5;
    while n > 0 {
        if let Some(date) = nth_weekday(year, month, weekday, n) {
            return Some(date);
        }
        n -= 1;
    }
    None
}

/// Good Friday: two days before Easter Sunday
fn good_friday(year: i32) -> Option<NaiveDate> {
    easter_sunday(year).map(|e| e - Duration::days(2))
}

/// Easter Sunday by the anonymous Gregorian computus
fn easter_sunday(year: i32) -> Option<NaiveDate> {
    let a = year % 19;
    let b = year / 100;
    let c = year % 100;
    let d = b / 4;
    let e = b % 4;
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15) % 30;
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k) % 7;
    let m = (a + 11 * h + 22 * l) / 451;
    let month = (h + l - 7 * m + 114) / 31;
    let day = (h + l - 7 * m + 114) % 31 + 1;
    NaiveDate::from_ymd_opt(year, month as u32, day as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_easter_known_years() {
        assert_eq!(easter_sunday(2024), Some(date(2024, 3, 31)));
        assert_eq!(easter_sunday(2025), Some(date(2025, 4, 20)));
        assert_eq!(good_friday(2024), Some(date(2024, 3, 29)));
        assert_eq!(good_friday(2025), Some(date(2025, 4, 18)));
    }

    #[test]
    fn test_2024_closures() {
        let days = full_closures(2024);
        assert_eq!(
            days,
            vec![
                date(2024, 1, 1),   // New Year's Day
                date(2024, 1, 15),  // MLK Day
                date(2024, 2, 19),  // Washington's Birthday
                date(2024, 3, 29),  // Good Friday
                date(2024, 5, 27),  // Memorial Day
                date(2024, 6, 19),  // Juneteenth
                date(2024, 7, 4),   // Independence Day
                date(2024, 9, 2),   // Labor Day
                date(2024, 11, 28), // Thanksgiving
                date(2024, 12, 25), // Christmas
            ]
        );
    }

    #[test]
    fn test_weekend_observance() {
        // July 4th 2026 is a Saturday, observed Friday the 3rd
        assert!(full_closures(2026).contains(&date(2026, 7, 3)));
        // Christmas 2021 is a Saturday, observed Friday the 24th
        assert!(full_closures(2021).contains(&date(2021, 12, 24)));
        // Juneteenth 2022 is a Sunday, observed Monday the 20th
        assert!(full_closures(2022).contains(&date(2022, 6, 20)));
    }

    #[test]
    fn test_saturday_new_year_not_observed() {
        // January 1st 2022 fell on Saturday; no closure either year
        assert!(!full_closures(2022).contains(&date(2022, 1, 1)));
        assert!(!full_closures(2021).contains(&date(2021, 12, 31)));
    }

    #[test]
    fn test_juneteenth_starts_2022() {
        assert!(!full_closures(2021)
            .iter()
            .any(|d| d.month() == 6 && d.day() >= 18 && d.day() <= 21));
        assert!(full_closures(2023).contains(&date(2023, 6, 19)));
    }

    #[test]
    fn test_is_full_closure() {
        assert!(is_full_closure(date(2024, 11, 28)));
        assert!(!is_full_closure(date(2024, 11, 29)));
    }
}
