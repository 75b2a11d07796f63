//! CBOE quotedata CSV export parser.
//!
//! Provides:
//! - Preamble handling for the disclaimer, spot, and quote-time lines
//! - Row conversion from the 22-column export into [`ContractRecord`]s
//! - The same [`ChainPayload`] handoff as the JSON feed
//!
//! The export carries one row per strike and expiry with call fields on
//! the left of the strike column and put fields on the right. Quote
//! times are exchange-local wall clocks, unlike the JSON feed's UTC.

use chrono::{Duration, NaiveDate, NaiveDateTime, TimeZone};
use chrono_tz::Tz;

use crate::calendar::session_close;
use crate::core::{ContractRecord, ContractSet, GexError, GexResult};
use crate::data::chain::{format_quote_label, year_fraction, ChainPayload, FEED_DELAY_MINUTES};

// Column layout of the export body. Last-sale, net, bid, ask, and
// volume columns are present but unused.
const COL_EXPIRY: usize = 0;
const COL_CALL_IV: usize = 7;
const COL_CALL_DELTA: usize = 8;
const COL_CALL_GAMMA: usize = 9;
const COL_CALL_OPEN_INT: usize = 10;
const COL_STRIKE: usize = 11;
const COL_PUT_IV: usize = 18;
const COL_PUT_DELTA: usize = 19;
const COL_PUT_GAMMA: usize = 20;
const COL_PUT_OPEN_INT: usize = 21;

const STAMP_FORMATS: &[&str] = &[
    "%B %d, %Y at %I:%M %p",
    "%B %d, %Y at %H:%M",
    "%B %d, %Y %I:%M %p",
    "%B %d, %Y %H:%M",
];

/// Extract the spot price from the preamble line, e.g.
/// `SPX,Last:5450.25,Change:-8.55`.
fn spot_from_preamble(line: &str) -> GexResult<f64> {
    let after = line
        .split_once("Last:")
        .map(|(_, rest)| rest)
        .ok_or_else(|| GexError::data("spot line missing Last: field"))?;
    let text = after.split(',').next().unwrap_or(after).trim();
    text.parse()
        .map_err(|_| GexError::data(format!("unparseable spot {text:?}")))
}

/// Extract the quote-time text from the preamble line, e.g.
/// `Date: June 21, 2024 at 3:45 PM EDT,Bid,Ask,...`.
fn stamp_from_preamble(line: &str) -> GexResult<&str> {
    let after = line
        .split_once("Date: ")
        .map(|(_, rest)| rest)
        .ok_or_else(|| GexError::data("date line missing Date: field"))?;
    Ok(after.split(",Bid").next().unwrap_or(after).trim())
}

fn stamp_from_tokens(tokens: &[&str]) -> Option<NaiveDateTime> {
    let mut tokens = tokens.to_vec();
    if let Some(last) = tokens.last() {
        let zoneish = last.chars().all(|c| c.is_ascii_alphabetic())
            && !matches!(last.to_ascii_uppercase().as_str(), "AM" | "PM");
        if zoneish {
            tokens.pop();
        }
    }
    let text = tokens.join(" ");
    STAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(&text, fmt).ok())
}

/// Parse the exchange-local quote stamp. Some exports flip the final
/// two fields of the line, so a swapped retry follows the direct one.
fn parse_quote_stamp(raw: &str, tz: Tz) -> GexResult<chrono::DateTime<Tz>> {
    let tokens: Vec<&str> = raw.split_whitespace().collect();
    let naive = stamp_from_tokens(&tokens)
        .or_else(|| {
            let mut swapped = tokens.clone();
            let n = swapped.len();
            if n < 2 {
                return None;
            }
            swapped.swap(n - 1, n - 2);
            stamp_from_tokens(&swapped)
        })
        .ok_or_else(|| GexError::data(format!("unparseable quote stamp {raw:?}")))?;
    tz.from_local_datetime(&naive)
        .single()
        .ok_or_else(|| GexError::data(format!("ambiguous local quote time {naive}")))
}

fn text_field<'a>(record: &'a csv::StringRecord, idx: usize) -> GexResult<&'a str> {
    record
        .get(idx)
        .ok_or_else(|| GexError::data(format!("row is missing column {idx}")))
}

fn numeric_field(record: &csv::StringRecord, idx: usize) -> GexResult<f64> {
    let text = text_field(record, idx)?.trim();
    text.parse()
        .map_err(|_| GexError::data(format!("bad numeric value {text:?} in column {idx}")))
}

fn parse_contract_row(
    record: &csv::StringRecord,
    quote_date: NaiveDate,
    tz: Tz,
) -> GexResult<ContractRecord> {
    let expiry_text = text_field(record, COL_EXPIRY)?.trim();
    let expiry_date = NaiveDate::parse_from_str(expiry_text, "%a %b %d %Y")
        .map_err(|_| GexError::data(format!("unparseable expiry {expiry_text:?}")))?;

    Ok(ContractRecord {
        strike: numeric_field(record, COL_STRIKE)?,
        expiry: session_close(expiry_date, tz)?,
        call_iv: numeric_field(record, COL_CALL_IV)?,
        put_iv: numeric_field(record, COL_PUT_IV)?,
        call_open_interest: numeric_field(record, COL_CALL_OPEN_INT)?,
        put_open_interest: numeric_field(record, COL_PUT_OPEN_INT)?,
        call_delta: numeric_field(record, COL_CALL_DELTA)?,
        put_delta: numeric_field(record, COL_PUT_DELTA)?,
        call_gamma: numeric_field(record, COL_CALL_GAMMA)?,
        put_gamma: numeric_field(record, COL_PUT_GAMMA)?,
        years_to_expiry: year_fraction(quote_date, expiry_date),
    })
}

/// Parse a raw CBOE quotedata CSV export into a [`ChainPayload`].
///
/// # Arguments
/// * `raw` - Full file contents, disclaimer line included
/// * `tz` - Exchange time zone; the quote stamp is local to it
///
/// # Returns
/// The normalized chain, or a recoverable data error when the preamble
/// or any row is malformed.
pub fn parse_csv_chain(raw: &str, tz: Tz) -> GexResult<ChainPayload> {
    let mut sections = raw.splitn(4, '\n');
    sections.next();
    let spot_line = sections
        .next()
        .ok_or_else(|| GexError::data("quote file missing spot line"))?;
    let date_line = sections
        .next()
        .ok_or_else(|| GexError::data("quote file missing date line"))?;
    let body = sections
        .next()
        .ok_or_else(|| GexError::data("quote file missing option rows"))?;

    let spot = spot_from_preamble(spot_line)?;
    let as_of =
        parse_quote_stamp(stamp_from_preamble(date_line)?, tz)? - Duration::minutes(FEED_DELAY_MINUTES);
    let as_of_label = format_quote_label(&as_of);
    let quote_date = as_of.date_naive();

    let mut records = Vec::new();
    for (row, result) in csv::Reader::from_reader(body.as_bytes()).records().enumerate() {
        let record = result.map_err(|e| GexError::data(format!("row {}: {e}", row + 1)))?;
        records.push(parse_contract_row(&record, quote_date, tz)?);
    }
    if records.is_empty() {
        return Err(GexError::data("quote file contains no option rows"));
    }

    Ok(ChainPayload {
        spot,
        as_of,
        as_of_label,
        contracts: ContractSet::new(records),
    })
}
