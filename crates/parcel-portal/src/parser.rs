//! Status text parsing.
//!
//! The status cell is free text along the lines of
//! `Collected by Jane Doe on 3rd January 2024`.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::error::ParseError;
use crate::parcel::Parcel;

const COLLECTED_PREFIX: &str = "Collected";
const ORDINAL_SUFFIXES: [&str; 4] = ["st", "nd", "rd", "th"];

static ACTOR_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"by (.+) on").unwrap());

/// Day with a two-letter suffix, month text, four digit year.
static DATE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,2})([a-z][a-z]) (.+ \d\d\d\d)").unwrap());

/// A parsed row plus any non-fatal date problem found on the way.
#[derive(Debug)]
pub struct ParsedRow {
    pub parcel: Parcel,
    pub date_error: Option<ParseError>,
}

/// Parse one row's code and status text into a [`Parcel`].
///
/// A status without a `by <name> on` actor is an error. A missing or
/// unreadable date is not: the parcel is still returned with both dates
/// unset and the problem reported in [`ParsedRow::date_error`].
pub fn parse_row(code: &str, status: &str) -> Result<ParsedRow, ParseError> {
    let collected = status.starts_with(COLLECTED_PREFIX);

    let collected_by = ACTOR_REGEX
        .captures(status)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| ParseError::UnparseableStatus(status.to_string()))?;

    let mut parcel = Parcel {
        code: code.to_string(),
        collected,
        collected_by,
        collected_date: None,
        delivered_date: None,
    };

    let date_error = match parse_status_date(status) {
        Ok(date) => {
            if collected {
                parcel.collected_date = Some(date);
            } else {
                parcel.delivered_date = Some(date);
            }
            None
        }
        Err(e) => Some(e),
    };

    Ok(ParsedRow { parcel, date_error })
}

/// Find and parse the first `3rd January 2024` style date in `status`.
pub fn parse_status_date(status: &str) -> Result<NaiveDate, ParseError> {
    let date = strip_ordinal(status).ok_or_else(|| ParseError::MissingDate(status.to_string()))?;
    let parsed = NaiveDate::parse_from_str(&date, "%d %B %Y").map_err(|source| {
        ParseError::InvalidDate {
            input: date.clone(),
            source,
        }
    })?;

    // `%B` also accepts "Jan"; the portal always writes the month in full.
    let month = date.split_whitespace().nth(1).unwrap_or_default();
    if !month.eq_ignore_ascii_case(&parsed.format("%B").to_string()) {
        return Err(ParseError::AbbreviatedMonth(date));
    }
    Ok(parsed)
}

/// The date substring with its ordinal suffix removed.
///
/// Only the two letters directly after the day digits are considered, so
/// month text that happens to contain `st`/`nd`/`rd`/`th` is left alone.
/// Two letters that are not an ordinal suffix are kept, which makes the
/// later date parse fail.
fn strip_ordinal(status: &str) -> Option<String> {
    let caps = DATE_REGEX.captures(status)?;
    let day = caps.get(1)?.as_str();
    let suffix = caps.get(2)?.as_str();
    let rest = caps.get(3)?.as_str();

    if ORDINAL_SUFFIXES.contains(&suffix) {
        Some(format!("{day} {rest}"))
    } else {
        Some(format!("{day}{suffix} {rest}"))
    }
}
