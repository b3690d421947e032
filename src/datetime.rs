//! Date/time utilities for Nimbus.
//!
//! Timestamps are stored as fixed-width UTC text so that SQL string
//! comparison orders them chronologically.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};

use crate::{NimbusError, Result};

/// Storage format: `YYYY-MM-DD HH:MM:SS.ffffff`, always 26 characters.
const DB_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Encode a timestamp for the database.
pub fn to_db(dt: &DateTime<Utc>) -> String {
    dt.format(DB_FORMAT).to_string()
}

/// Decode a timestamp read from the database.
///
/// Accepts the fixed-width format as well as SQLite's `datetime('now')`
/// output (no fractional seconds).
pub fn from_db(s: &str) -> Result<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| NimbusError::CorruptRecord(format!("bad timestamp {s:?}: {e}")))
}

/// Decode an optional timestamp column.
pub fn from_db_opt(s: Option<&str>) -> Result<Option<DateTime<Utc>>> {
    s.map(from_db).transpose()
}

/// Render a timestamp as RFC3339 for API responses (e.g. `2024-01-15T10:30:00Z`).
pub fn to_rfc3339(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}
