//! Helpers for reading browser form submissions.
//!
//! Every form field arrives as an optional string. A required field that is
//! absent or blank, or a value that does not parse, re-renders the
//! originating form with the resulting message.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormError {
    #[error("Missing field: '{0}'")]
    Missing(&'static str),
    #[error("Invalid value for field: '{0}'")]
    Invalid(&'static str),
}

/// Fetch a required field, trimmed. Absent and blank are both missing.
pub fn require(value: &Option<String>, name: &'static str) -> Result<String, FormError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(FormError::Missing(name)),
    }
}

/// Fetch an optional field; blank submissions collapse to `None`.
pub fn optional(value: &Option<String>) -> Option<String> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Some(v.to_string()),
        _ => None,
    }
}

/// Parse a non-negative age.
pub fn parse_age(value: &str, name: &'static str) -> Result<i32, FormError> {
    value
        .parse::<u32>()
        .ok()
        .and_then(|age| i32::try_from(age).ok())
        .ok_or(FormError::Invalid(name))
}

/// Parse a date in the HTML date-input format (YYYY-MM-DD).
pub fn parse_date(value: &str, name: &'static str) -> Result<NaiveDate, FormError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| FormError::Invalid(name))
}

/// Parse an optional date; absent or blank means no date.
pub fn parse_optional_date(
    value: &Option<String>,
    name: &'static str,
) -> Result<Option<NaiveDate>, FormError> {
    match optional(value) {
        Some(v) => parse_date(&v, name).map(Some),
        None => Ok(None),
    }
}

/// Parse a decimal amount.
pub fn parse_amount(value: &str, name: &'static str) -> Result<Decimal, FormError> {
    value.parse::<Decimal>().map_err(|_| FormError::Invalid(name))
}
