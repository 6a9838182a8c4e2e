use anyhow::Result;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use chrono_english::{parse_date_string, Dialect};

/// Parses absolute dates ('2024-01-31', '2024-01-31 09:30', RFC 3339) and
/// relative English ones ('tomorrow', 'next friday'). Everything is UTC.
pub fn parse_date(date_str: &str) -> Result<DateTime<Utc>> {
    parse_date_relative_to(date_str, Utc::now())
}

pub fn parse_date_relative_to(date_str: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let input = date_str.trim();

    if let Ok(date) = DateTime::parse_from_rfc3339(input) {
        return Ok(date.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDateTime::parse_from_str(input, "%Y-%m-%d %H:%M") {
        return Ok(date.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }

    parse_date_string(input, now, Dialect::Us)
        .map_err(|e| anyhow::anyhow!("Failed to parse date '{}': {}", date_str, e))
}
