// src/table/cast.rs

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};

use super::types::{LogicalType, Value};

/// `NaiveDate::num_days_from_ce()` of 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

const TIMESTAMP_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
];

/// Parse a single text cell into `target`. `None` means the text is not a
/// valid spelling of that type.
pub fn parse_value(raw: &str, target: LogicalType) -> Option<Value> {
    match target {
        LogicalType::String => Some(Value::String(raw.to_string())),
        LogicalType::Int64 => raw.trim().parse::<i64>().ok().map(Value::Int64),
        LogicalType::Float64 => raw.trim().parse::<f64>().ok().map(Value::Float64),
        LogicalType::Boolean => parse_boolean(raw).map(Value::Boolean),
        LogicalType::Timestamp => parse_timestamp_micros(raw).map(Value::Timestamp),
        LogicalType::Date => parse_date_days(raw).map(Value::Date),
    }
}

pub fn parse_boolean(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "1" | "yes" => Some(true),
        "false" | "f" | "0" | "no" => Some(false),
        _ => None,
    }
}

/// `YYYY-MM-DD[ T]HH:MM:SS[.f][Z]` or a bare `YYYY-MM-DD` → micros since epoch.
pub fn parse_timestamp_micros(raw: &str) -> Option<i64> {
    let s = raw.trim();
    let s = s.strip_suffix('Z').unwrap_or(s);

    for fmt in TIMESTAMP_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.and_utc().timestamp_micros());
        }
    }

    // a bare date means midnight
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()?;
    Some(date.and_hms_opt(0, 0, 0)?.and_utc().timestamp_micros())
}

/// `YYYY-MM-DD` → days since 1970-01-01.
pub fn parse_date_days(raw: &str) -> Option<i32> {
    let date = NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()?;
    Some(date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE)
}

/// `YYYY-MM-DD HH:MM:SS.ffffff`. Out-of-range values fall back to the raw number.
pub fn format_timestamp(micros: i64) -> String {
    match DateTime::from_timestamp_micros(micros) {
        Some(dt) => dt.naive_utc().format("%Y-%m-%d %H:%M:%S%.6f").to_string(),
        None => micros.to_string(),
    }
}

/// `YYYY-MM-DD`. Out-of-range values fall back to the raw number.
pub fn format_date(days: i32) -> String {
    days.checked_add(UNIX_EPOCH_DAYS_FROM_CE)
        .and_then(NaiveDate::from_num_days_from_ce_opt)
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| days.to_string())
}
