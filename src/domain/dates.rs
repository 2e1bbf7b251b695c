//! Date normalisation and day-count arithmetic.
//!
//! Every date that enters the ledger passes through [`normalize`] or
//! [`parse_date`], so storage only ever sees the canonical `YYYY-MM-DD` form.

use crate::domain::error::LedgerError;
use chrono::NaiveDate;

pub const CANONICAL_FORMAT: &str = "%Y-%m-%d";

const ACCEPTED_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d"];

/// Parse any accepted date spelling into a [`NaiveDate`].
///
/// Accepts `YYYY-MM-DD`, `YYYY/MM/DD`, `YYYY.MM.DD` and the localized
/// `YYYY年M月D日` form. Surrounding whitespace is ignored.
pub fn parse_date(input: &str) -> Result<NaiveDate, LedgerError> {
    let trimmed = input.trim();
    let invalid = || LedgerError::InvalidDateFormat {
        input: input.to_string(),
    };
    if trimmed.is_empty() {
        return Err(invalid());
    }

    for fmt in ACCEPTED_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, fmt) {
            return Ok(date);
        }
    }

    // Localized and mixed separators collapse to dashes.
    let unified = trimmed
        .replace('年', "-")
        .replace('月', "-")
        .replace('日', "")
        .replace(['.', '/'], "-");
    NaiveDate::parse_from_str(&unified, CANONICAL_FORMAT).map_err(|_| invalid())
}

/// Normalise a date string to canonical `YYYY-MM-DD`.
pub fn normalize(input: &str) -> Result<String, LedgerError> {
    parse_date(input).map(format_date)
}

/// Parse an optional cell: blank and null-like literals yield `None`.
pub fn parse_optional_date(input: &str) -> Result<Option<NaiveDate>, LedgerError> {
    if crate::domain::amount::is_absent(input) {
        return Ok(None);
    }
    parse_date(input).map(Some)
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(CANONICAL_FORMAT).to_string()
}

/// `end - start` in whole calendar days; negative when `end` precedes `start`.
pub fn days_between(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days()
}

/// Days left until `end` as seen from `reference`, floored at zero.
pub fn days_remaining(end: NaiveDate, reference: NaiveDate) -> i64 {
    days_between(reference, end).max(0)
}

/// Total tenor of a product; zero when either bound is unknown.
pub fn tenor_days(start: Option<NaiveDate>, end: Option<NaiveDate>) -> i64 {
    match (start, end) {
        (Some(start), Some(end)) => days_between(start, end),
        _ => 0,
    }
}
