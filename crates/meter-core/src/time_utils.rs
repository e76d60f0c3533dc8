use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::error::{MeterError, Result};
use crate::models::Granularity;

/// Date format accepted on the command line and shown in the UI.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

// ── Epoch conversion ──────────────────────────────────────────────────────────

/// Convert integer epoch seconds to naive UTC calendar time.
///
/// Returns `None` for values outside chrono's representable range.
pub fn epoch_to_datetime(secs: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp(secs, 0).map(|dt| dt.naive_utc())
}

/// Inverse of [`epoch_to_datetime`].
pub fn datetime_to_epoch(ts: NaiveDateTime) -> i64 {
    ts.and_utc().timestamp()
}

// ── Bucketing ─────────────────────────────────────────────────────────────────

/// Truncate `ts` to the start of its hour or day.
///
/// Buckets are aligned to the UTC calendar grid, which coincides with whole
/// multiples of the bucket width since the epoch.
pub fn floor_to_bucket(ts: NaiveDateTime, granularity: Granularity) -> NaiveDateTime {
    let width = granularity.width().num_seconds();
    let secs = datetime_to_epoch(ts);
    let floored = secs - secs.rem_euclid(width);
    epoch_to_datetime(floored).unwrap_or(ts)
}

// ── Dates ─────────────────────────────────────────────────────────────────────

/// Parse a `YYYY-MM-DD` date.
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
        .map_err(|e| MeterError::Config(format!("invalid date {:?}: {}", s, e)))
}

/// Format a bucket start the way tables and reports show it.
pub fn format_bucket(ts: NaiveDateTime, granularity: Granularity) -> String {
    match granularity {
        Granularity::Hourly => ts.format("%Y-%m-%d %H:%M").to_string(),
        Granularity::Daily => ts.format(DATE_FORMAT).to_string(),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
