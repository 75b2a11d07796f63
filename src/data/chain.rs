//! CBOE delayed-quote chain parser.
//!
//! Provides:
//! - Deserialization of the quotedata JSON payload
//! - Symbol decoding into expiry, side, and strike
//! - Conversion into a [`ChainPayload`] ready for exposure work
//!
//! The feed interleaves legs strictly as call, put, call, put per
//! strike, and its timestamp is a naive UTC wall clock lagging the
//! exchange by fifteen minutes.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::calendar::{session_close, weekdays_between};
use crate::core::{ContractRecord, ContractSet, GexError, GexResult, OptionSide};

/// Sessions per year used to annualize weekday counts.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Lag applied to feed timestamps before display or math.
pub const FEED_DELAY_MINUTES: i64 = 15;

/// A normalized options chain plus the quote context it arrived with.
#[derive(Debug, Clone, Serialize)]
pub struct ChainPayload {
    /// Underlying spot at quote time.
    pub spot: f64,
    /// Quote timestamp in exchange time, already shifted back by the
    /// feed delay.
    pub as_of: DateTime<Tz>,
    /// Human-readable quote time, e.g. "2024 Jun 21, 03:30 PM EDT (15min delay)".
    pub as_of_label: String,
    /// Paired call/put rows keyed by expiry and strike.
    pub contracts: ContractSet,
}

#[derive(Debug, Deserialize)]
struct QuoteResponse {
    timestamp: String,
    data: QuoteData,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    current_price: f64,
    options: Vec<QuoteLeg>,
}

#[derive(Debug, Deserialize)]
struct QuoteLeg {
    option: String,
    iv: Option<f64>,
    open_interest: Option<f64>,
    delta: Option<f64>,
    gamma: Option<f64>,
}

/// Fields decoded from an OCC-style option symbol such as
/// `SPXW240621C05300000`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SymbolFields {
    pub expiry: NaiveDate,
    pub side: OptionSide,
    pub strike: f64,
}

/// Decode an option symbol into expiry date, side, and strike.
///
/// The scan starts at the first letter followed by a digit, reads a
/// six-digit `%y%m%d` date, a `C` or `P` side marker, and a strike
/// field whose trailing three digits are the decimal part and are
/// dropped. Returns `None` when any piece is missing or malformed.
pub fn parse_symbol(symbol: &str) -> Option<SymbolFields> {
    let bytes = symbol.as_bytes();
    let mut start = None;
    for i in 0..bytes.len().saturating_sub(1) {
        if bytes[i].is_ascii_uppercase() && bytes[i + 1].is_ascii_digit() {
            start = Some(i + 1);
            break;
        }
    }
    let start = start?;

    let date_digits: &str = {
        let run_len = bytes[start..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count();
        if run_len != 6 {
            return None;
        }
        &symbol[start..start + 6]
    };
    let expiry = NaiveDate::parse_from_str(date_digits, "%y%m%d").ok()?;

    let side_at = start + 6;
    let side = match bytes.get(side_at) {
        Some(b'C') => OptionSide::Call,
        Some(b'P') => OptionSide::Put,
        _ => return None,
    };

    let strike_start = side_at + 1;
    let strike_len = bytes[strike_start..]
        .iter()
        .take_while(|b| b.is_ascii_digit())
        .count();
    if strike_len <= 3 {
        return None;
    }
    let whole = &symbol[strike_start..strike_start + strike_len - 3];
    let strike: f64 = whole.parse().ok()?;

    Some(SymbolFields {
        expiry,
        side,
        strike,
    })
}

/// Parse the feed timestamp, which arrives as a naive UTC wall clock,
/// and re-express it in exchange time.
fn parse_feed_timestamp(raw: &str, tz: Tz) -> GexResult<DateTime<Tz>> {
    let formats = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];
    for fmt in formats {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Ok(Utc.from_utc_datetime(&naive).with_timezone(&tz));
        }
    }
    if let Ok(fixed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(fixed.with_timezone(&tz));
    }
    Err(GexError::data(format!("unparseable quote timestamp {raw:?}")))
}

/// Format a quote time for display, flagging the feed delay.
pub fn format_quote_label(as_of: &DateTime<Tz>) -> String {
    format!("{} (15min delay)", as_of.format("%Y %b %d, %I:%M %p %Z"))
}

/// Year fraction between the quote date and an expiry date, counting
/// weekdays only. Zero rounds up to one session so same-day expiries
/// keep a usable time value; inverted dates stay negative.
pub fn year_fraction(as_of: NaiveDate, expiry: NaiveDate) -> f64 {
    let sessions = weekdays_between(as_of, expiry);
    if sessions == 0 {
        1.0 / TRADING_DAYS_PER_YEAR
    } else {
        sessions as f64 / TRADING_DAYS_PER_YEAR
    }
}

/// Parse a raw CBOE quotedata JSON document into a [`ChainPayload`].
///
/// # Arguments
/// * `raw` - JSON text as served by the delayed-quote endpoint
/// * `tz` - Exchange time zone used for expiries and the quote stamp
///
/// # Returns
/// The normalized chain, or a recoverable data error when the payload
/// is undecodable or contains no parsable contract pairs.
pub fn parse_json_chain(raw: &str, tz: Tz) -> GexResult<ChainPayload> {
    let response: QuoteResponse = serde_json::from_str(raw)
        .map_err(|e| GexError::data(format!("chain payload undecodable: {e}")))?;

    let as_of =
        parse_feed_timestamp(&response.timestamp, tz)? - Duration::minutes(FEED_DELAY_MINUTES);
    let as_of_label = format_quote_label(&as_of);
    let spot = response.data.current_price;
    let quote_date = as_of.date_naive();

    let mut records = Vec::with_capacity(response.data.options.len() / 2);
    for pair in response.data.options.chunks_exact(2) {
        let (call, put) = (&pair[0], &pair[1]);
        let fields = match parse_symbol(&call.option) {
            Some(fields) if fields.side == OptionSide::Call => fields,
            _ => {
                tracing::debug!(symbol = %call.option, "skipping unparseable call leg");
                continue;
            }
        };
        records.push(ContractRecord {
            strike: fields.strike,
            expiry: session_close(fields.expiry, tz)?,
            call_iv: call.iv.unwrap_or(0.0),
            put_iv: put.iv.unwrap_or(0.0),
            call_open_interest: call.open_interest.unwrap_or(0.0),
            put_open_interest: put.open_interest.unwrap_or(0.0),
            call_delta: call.delta.unwrap_or(0.0),
            put_delta: put.delta.unwrap_or(0.0),
            call_gamma: call.gamma.unwrap_or(0.0),
            put_gamma: put.gamma.unwrap_or(0.0),
            years_to_expiry: year_fraction(quote_date, fields.expiry),
        });
    }

    if records.is_empty() {
        return Err(GexError::data("chain contains no parsable contracts"));
    }

    Ok(ChainPayload {
        spot,
        as_of,
        as_of_label,
        contracts: ContractSet::new(records),
    })
}
