//! Date recognition for `date` parameters.
//!
//! Two input shapes are understood:
//!
//! - unix timestamps written with exactly 10 (seconds) or 13 (milliseconds)
//!   digits; any other digit count is not a date
//! - calendar strings `YYYY/MM/DD`, `YYYY-MM-DD`, `MM-DD-YYYY` with an
//!   optional `HH:mm[:ss]` time and an optional timezone token, missing parts
//!   defaulting to `00:00:00 +0000`, then RFC 3339 / RFC 2822 / ISO forms

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::types::{format_number, Value};

static CALENDAR_RX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"([0-9]{2,4})[/-]([0-9]{2})[/-]([0-9]{2,4})",
        r"(?:\s?([0-9]{2}):([0-9]{2})(?::([0-9]{2}))?)?",
        r"(?:\s?([+-]?[a-zA-Z0-9]{3,4}))?",
    ))
    .expect("calendar date pattern is valid")
});

/// Interprets a digit string or integral number as a unix timestamp.
pub fn from_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    let digits = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) if *n >= 0.0 && n.fract() == 0.0 => format_number(*n),
        _ => return None,
    };
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let raw: i64 = digits.parse().ok()?;
    let millis = match digits.len() {
        10 => raw.checked_mul(1000)?,
        13 => raw,
        _ => return None,
    };
    Utc.timestamp_millis_opt(millis).single()
}

/// Parses a calendar string, falling back to the standard formats.
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    parse_calendar(raw).or_else(|| parse_standard(raw))
}

fn parse_calendar(raw: &str) -> Option<DateTime<Utc>> {
    let caps = CALENDAR_RX.captures(raw)?;
    let first = caps.get(1)?.as_str();
    let middle = caps.get(2)?.as_str();
    let last = caps.get(3)?.as_str();

    // YYYY-MM-DD or MM-DD-YYYY
    let (year, month, day) = match (first.len(), last.len()) {
        (4, 2) => (first, middle, last),
        (2, 4) => (last, first, middle),
        _ => return None,
    };

    let date = NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, day.parse().ok()?)?;
    let time = date.and_hms_opt(group(&caps, 4)?, group(&caps, 5)?, group(&caps, 6)?)?;
    let offset = match caps.get(7) {
        Some(token) => timezone_offset(token.as_str())?,
        None => FixedOffset::east_opt(0)?,
    };

    offset
        .from_local_datetime(&time)
        .single()
        .map(|local| local.with_timezone(&Utc))
}

/// Numeric capture group, `0` when the component was omitted.
fn group(caps: &Captures<'_>, index: usize) -> Option<u32> {
    match caps.get(index) {
        Some(m) => m.as_str().parse().ok(),
        None => Some(0),
    }
}

fn timezone_offset(token: &str) -> Option<FixedOffset> {
    let hours = match token.to_uppercase().as_str() {
        "UTC" | "GMT" => 0,
        "EDT" => -4,
        "EST" | "CDT" => -5,
        "CST" | "MDT" => -6,
        "MST" | "PDT" => -7,
        "PST" => -8,
        _ => return numeric_offset(token),
    };
    FixedOffset::east_opt(hours * 3600)
}

/// `+0200`, `-0530` or `0100`.
fn numeric_offset(token: &str) -> Option<FixedOffset> {
    let (sign, digits) = match token.as_bytes().first()? {
        b'+' => (1, &token[1..]),
        b'-' => (-1, &token[1..]),
        _ => (1, token),
    };
    if digits.len() != 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let hours: i32 = digits[..2].parse().ok()?;
    let minutes: i32 = digits[2..].parse().ok()?;
    if minutes >= 60 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

fn parse_standard(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(date) = DateTime::parse_from_rfc3339(raw) {
        return Some(date.with_timezone(&Utc));
    }
    if let Ok(date) = DateTime::parse_from_rfc2822(raw) {
        return Some(date.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(Utc.from_utc_datetime(&naive));
    }
    None
}
