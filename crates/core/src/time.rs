//! Local wall-clock timestamps and their on-disk text forms.
//!
//! All schedule math runs on naive local time: a dose at 08:00 stays at
//! 08:00 on the clock regardless of UTC offset changes.

use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use crate::error::PawError;

/// A local wall-clock instant.
pub type Timestamp = NaiveDateTime;

/// Canonical persisted timestamp format.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Canonical persisted time-of-day format.
pub const TIME_OF_DAY_FORMAT: &str = "%H:%M";

const ACCEPTED_TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// Current local time, truncated to whole seconds.
pub fn now() -> Timestamp {
    let now = Local::now().naive_local();
    now.with_nanosecond(0).unwrap_or(now)
}

/// Parse a stored timestamp.
///
/// Accepts `YYYY-MM-DD HH:MM` (optionally with seconds), the ISO-8601 `T`
/// form, and a bare date. A bare date takes `implied_time`, or midnight
/// when none is given.
pub fn parse_timestamp(
    value: &str,
    implied_time: Option<NaiveTime>,
) -> Result<Timestamp, PawError> {
    let trimmed = value.trim();
    for format in ACCEPTED_TIMESTAMP_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(ts);
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(date.and_time(implied_time.unwrap_or(NaiveTime::MIN)));
    }
    Err(PawError::MalformedTimestamp(value.to_string()))
}

/// Parse an `HH:MM` time of day. A single-digit hour is accepted.
pub fn parse_time_of_day(value: &str) -> Result<NaiveTime, PawError> {
    let trimmed = value.trim();
    NaiveTime::parse_from_str(trimmed, TIME_OF_DAY_FORMAT)
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M:%S"))
        .map_err(|_| PawError::MalformedTimeOfDay(value.to_string()))
}

pub fn format_timestamp(ts: &Timestamp) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

pub fn format_time_of_day(t: &NaiveTime) -> String {
    t.format(TIME_OF_DAY_FORMAT).to_string()
}
