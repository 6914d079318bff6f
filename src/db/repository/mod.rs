//! Repository layer: free functions over a `rusqlite::Connection`.
//!
//! Functions here do storage only. Lifecycle rules, ownership checks
//! and fee math live in the service modules above this layer.

pub mod claim;
pub mod claim_event;
pub mod signoff;
pub mod visit;

use chrono::{NaiveDate, NaiveDateTime};

use crate::db::DatabaseError;

const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub(crate) fn ts_string(ts: &NaiveDateTime) -> String {
    ts.format(TS_FORMAT).to_string()
}

/// Parse a stored timestamp, tolerating the ISO 'T' separator from
/// rows written by older importers. Anything else is treated as
/// corruption, not coerced to a default.
pub(crate) fn parse_ts(s: &str) -> Result<NaiveDateTime, DatabaseError> {
    NaiveDateTime::parse_from_str(s, TS_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
        .map_err(|_| DatabaseError::ConstraintViolation(format!("Invalid stored timestamp: {s}")))
}

pub(crate) fn parse_date(s: &str) -> Result<NaiveDate, DatabaseError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| DatabaseError::ConstraintViolation(
        format!("Invalid stored date: {s}"),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_ts_accepts_both_separators() {
        assert!(parse_ts("2026-03-07 10:00:00").is_ok());
        assert!(parse_ts("2026-03-07T10:00:00").is_ok());
    }

    #[test]
    fn parse_ts_rejects_garbage() {
        let err = parse_ts("not-a-timestamp").unwrap_err();
        assert!(matches!(err, DatabaseError::ConstraintViolation(_)));
    }
}
