// brutility/src/report/format.rs
use chrono::{Local, NaiveDateTime};

/// Layout of ledger timestamps and backup file names, e.g. `07_Mar_2025_14-05-09`.
pub const TIMESTAMP_FORMAT: &str = "%d_%b_%Y_%H-%M-%S";

const MINUTE: i64 = 60;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;
const MONTH: i64 = 30 * DAY;
const YEAR: i64 = 365 * DAY;

const KIB: f64 = 1024.0;
const MIB: f64 = 1024.0 * 1024.0;

pub fn now_local() -> NaiveDateTime {
    Local::now().naive_local()
}

pub fn format_timestamp(at: NaiveDateTime) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

pub fn parse_timestamp(value: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
}

/// Renders the time elapsed between `timestamp` and `now`, e.g. `5 minutes ago`.
///
/// Counts are truncated and the unit label is always plural, so exactly one
/// minute reads `1 minutes ago`. Timestamps in the future read `0 seconds ago`.
pub fn relative_age(timestamp: NaiveDateTime, now: NaiveDateTime) -> String {
    let secs = (now - timestamp).num_seconds().max(0);
    let (count, unit) = if secs < MINUTE {
        (secs, "seconds")
    } else if secs < HOUR {
        (secs / MINUTE, "minutes")
    } else if secs < DAY {
        (secs / HOUR, "hours")
    } else if secs < MONTH {
        (secs / DAY, "days")
    } else if secs < YEAR {
        (secs / MONTH, "months")
    } else {
        (secs / YEAR, "years")
    };
    format!("{} {} ago", count, unit)
}

/// Per-record size display: `n / 1024` with two decimals.
pub fn kilobytes(bytes: u64) -> String {
    format!("{:.2} KB", bytes as f64 / KIB)
}

pub fn megabytes_value(bytes: u64) -> f64 {
    bytes as f64 / MIB
}

/// Summary size display. Binary megabytes everywhere: tables, totals and email.
pub fn megabytes(bytes: u64) -> String {
    format!("{:.2} MB", megabytes_value(bytes))
}
