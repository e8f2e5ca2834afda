// SPDX-FileCopyrightText: 2026 Kvitto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query modules plus the row-mapping helpers they share.
//!
//! SQLite stores timestamps as RFC 3339 text, list columns as JSON arrays of
//! strings, and enums by their canonical lowercase names. Conversion
//! failures surface as `FromSqlConversionFailure` so they carry the column
//! index.

pub mod receipts;
pub mod users;

use chrono::{DateTime, Utc};
use kvitto_core::{OutputFormat, SubscriptionPlan};
use rusqlite::types::Type;
use std::str::FromStr;

pub(crate) fn parse_ts(idx: usize, raw: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn parse_opt_ts(
    idx: usize,
    raw: Option<String>,
) -> rusqlite::Result<Option<DateTime<Utc>>> {
    raw.map(|s| parse_ts(idx, s)).transpose()
}

pub(crate) fn parse_string_list(idx: usize, raw: String) -> rusqlite::Result<Vec<String>> {
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn parse_format(idx: usize, raw: String) -> rusqlite::Result<OutputFormat> {
    OutputFormat::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn parse_plan(idx: usize, raw: String) -> rusqlite::Result<SubscriptionPlan> {
    SubscriptionPlan::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_round_trip() {
        let now = Utc::now();
        let parsed = parse_ts(0, now.to_rfc3339()).expect("parse");
        assert_eq!(parsed, now);
    }

    #[test]
    fn sqlite_strftime_format_parses() {
        // The shape emitted by strftime('%Y-%m-%dT%H:%M:%fZ','now').
        let parsed = parse_ts(0, "2026-08-25T03:20:00.123Z".to_string()).expect("parse");
        assert_eq!(parsed.timestamp_subsec_millis(), 123);
    }

    #[test]
    fn bad_timestamp_reports_column() {
        let err = parse_ts(4, "yesterday".to_string()).expect_err("should fail");
        assert!(matches!(
            err,
            rusqlite::Error::FromSqlConversionFailure(4, Type::Text, _)
        ));
    }

    #[test]
    fn string_lists_round_trip() {
        let json = serde_json::to_string(&["Cake", "Drink"]).unwrap();
        let parsed = parse_string_list(0, json).expect("parse");
        assert_eq!(parsed, vec!["Cake".to_string(), "Drink".to_string()]);
    }
}
