//! Lenient numeric parsing for tabular cells.

use crate::domain::error::LedgerError;

const NULL_LITERALS: [&str; 3] = ["null", "none", "nan"];

/// True for blank cells and the literals `null`, `none`, `nan` (any case).
pub fn is_absent(raw: &str) -> bool {
    let trimmed = raw.trim();
    trimmed.is_empty()
        || NULL_LITERALS
            .iter()
            .any(|lit| trimmed.eq_ignore_ascii_case(lit))
}

/// Parse an amount such as `1,000,000` or `5.5%`.
///
/// A trailing `%` divides by 100, thousands separators are dropped, and
/// null-like cells yield `None`.
pub fn parse_amount(raw: &str) -> Result<Option<f64>, LedgerError> {
    if is_absent(raw) {
        return Ok(None);
    }
    let trimmed = raw.trim();
    let invalid = || LedgerError::InvalidNumber {
        input: raw.to_string(),
    };

    let (body, percent) = match trimmed.strip_suffix('%') {
        Some(body) => (body, true),
        None => (trimmed, false),
    };
    let value: f64 = body.trim().replace(',', "").parse().map_err(|_| invalid())?;
    if !value.is_finite() {
        return Err(invalid());
    }

    Ok(Some(if percent { value / 100.0 } else { value }))
}

/// Parse an optional whole number of days.
pub fn parse_days(raw: &str) -> Result<Option<i64>, LedgerError> {
    if is_absent(raw) {
        return Ok(None);
    }
    raw.trim()
        .replace(',', "")
        .parse()
        .map(Some)
        .map_err(|_| LedgerError::InvalidNumber {
            input: raw.to_string(),
        })
}

/// Trimmed text, or `None` for blank cells. Null-like literals stay text.
pub fn parse_text(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
