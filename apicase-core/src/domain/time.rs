//! Timestamp helpers
//!
//! All timestamps are computed here rather than by engine functions and are
//! stored as naive UTC `TIMESTAMP` values with microsecond precision.

use chrono::{DateTime, Duration, NaiveDateTime, SubsecRound, TimeZone, Utc};

/// Format used when binding timestamps as statement parameters
const SQL_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Format accepted when reading `TIMESTAMP::VARCHAR` back (fraction optional)
const SQL_PARSE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Current time truncated to the precision the database keeps
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Next `updated_at` value after `previous`
///
/// Always strictly later than `previous`, even when the clock has not moved
/// past it at microsecond resolution.
pub fn advance(previous: &DateTime<Utc>) -> DateTime<Utc> {
    let now = now();
    if now > *previous {
        now
    } else {
        *previous + Duration::microseconds(1)
    }
}

pub fn to_sql(dt: &DateTime<Utc>) -> String {
    dt.naive_utc().format(SQL_FORMAT).to_string()
}

pub fn from_sql(s: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s.trim(), SQL_PARSE_FORMAT)
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}
