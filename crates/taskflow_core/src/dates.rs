//! Date and timestamp helpers shared by the board, views and gantt layout.
//!
//! Calendar dates are stored as `YYYY-MM-DD`, timestamps as RFC 3339.

use crate::error::AppError;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, Duration, OffsetDateTime, UtcOffset};

pub fn parse_date(raw: &str) -> Result<Date, AppError> {
    let trimmed = raw.trim();
    Date::parse(trimmed, format_description!("[year]-[month]-[day]"))
        .map_err(|_| AppError::invalid_input(format!("date must be YYYY-MM-DD, got '{trimmed}'")))
}

pub fn format_date(date: Date) -> Result<String, AppError> {
    date.format(format_description!("[year]-[month]-[day]"))
        .map_err(|err| AppError::invalid_data(err.to_string()))
}

/// Validates and normalizes user-supplied date input.
pub fn normalize_date(raw: &str) -> Result<String, AppError> {
    format_date(parse_date(raw)?)
}

pub fn timestamp(now: OffsetDateTime) -> Result<String, AppError> {
    now.format(&Rfc3339)
        .map_err(|err| AppError::invalid_data(err.to_string()))
}

pub fn parse_timestamp(raw: &str) -> Result<OffsetDateTime, AppError> {
    OffsetDateTime::parse(raw.trim(), &Rfc3339)
        .map_err(|_| AppError::invalid_data(format!("timestamp must be RFC3339, got '{raw}'")))
}

/// Calendar date of an RFC 3339 timestamp as seen from `offset`.
pub fn date_of_timestamp(raw: &str, offset: UtcOffset) -> Result<Date, AppError> {
    Ok(parse_timestamp(raw)?.to_offset(offset).date())
}

/// `date` moved by `days`; results outside the supported calendar are
/// `invalid_input`.
pub fn add_days(date: Date, days: i64) -> Result<Date, AppError> {
    days.checked_mul(86_400)
        .map(Duration::seconds)
        .and_then(|delta| date.checked_add(delta))
        .ok_or_else(|| {
            AppError::invalid_input(format!("{date} moved by {days} days is out of range"))
        })
}

pub fn days_between(from: Date, to: Date) -> i64 {
    (to - from).whole_days()
}

pub fn local_offset() -> UtcOffset {
    UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC)
}

pub fn local_today() -> Date {
    OffsetDateTime::now_utc().to_offset(local_offset()).date()
}
