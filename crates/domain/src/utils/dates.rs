//! Lenient date decoding for CRM payloads
//!
//! The CRM is not consistent about how it serializes calendar dates: the
//! predicted close date arrives as `2024-03-15`, as a full RFC 3339 timestamp
//! or as `null` depending on how the deal was created. Timestamps always carry
//! an offset.

use chrono::{DateTime, Datelike, FixedOffset, Months, NaiveDate, Utc};
use serde::{Deserialize, Deserializer};

/// Parse a calendar date from either `YYYY-MM-DD` or an RFC 3339 timestamp.
///
/// Timestamps keep the date as written in their own offset.
pub fn parse_lenient_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(trimmed).ok().map(|ts| ts.date_naive()))
}

/// Serde adapter for optional lenient dates.
///
/// Unparseable strings are rejected so bad payloads surface as decode errors
/// instead of silently becoming `None`.
pub fn deserialize_optional_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw {
        None => Ok(None),
        Some(value) if value.trim().is_empty() => Ok(None),
        Some(value) => parse_lenient_date(&value)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid date: {value}"))),
    }
}

/// Serde adapter for RFC 3339 timestamps normalized to UTC.
pub fn deserialize_utc<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let ts = DateTime::<FixedOffset>::deserialize(deserializer)?;
    Ok(ts.with_timezone(&Utc))
}

/// Serde adapter for optional RFC 3339 timestamps normalized to UTC.
pub fn deserialize_optional_utc<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let ts: Option<DateTime<FixedOffset>> = Option::deserialize(deserializer)?;
    Ok(ts.map(|value| value.with_timezone(&Utc)))
}

/// First day of the month `months` months before `today`.
///
/// Returns `None` only when the arithmetic leaves chrono's supported range.
pub fn first_of_month_months_ago(today: NaiveDate, months: u32) -> Option<NaiveDate> {
    today.checked_sub_months(Months::new(months)).and_then(|date| date.with_day0(0))
}
