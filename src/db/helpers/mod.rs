use std::convert::TryFrom;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};

pub fn to_i64(value: u64) -> Result<i64> {
    i64::try_from(value).map_err(|_| anyhow!("value {value} exceeds SQLite INTEGER range"))
}

pub fn to_u64(value: i64, field: &str) -> Result<u64> {
    u64::try_from(value).map_err(|_| anyhow!("{field} contains negative value {value}"))
}

pub fn parse_datetime(value: &str, field: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("failed to parse {field}"))
}

pub fn parse_optional_datetime(
    value: Option<String>,
    field: &str,
) -> Result<Option<DateTime<Utc>>> {
    match value {
        Some(raw) => parse_datetime(&raw, field).map(Some),
        None => Ok(None),
    }
}

/// Recurrence intervals must be a positive whole number of days.
pub fn parse_recurring_days(value: Option<i64>) -> Result<Option<u32>> {
    match value {
        None => Ok(None),
        Some(days) if days >= 1 => u32::try_from(days)
            .map(Some)
            .map_err(|_| anyhow!("recurring_days {days} out of range")),
        Some(days) => Err(anyhow!("recurring_days must be at least 1, got {days}")),
    }
}
