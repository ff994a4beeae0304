use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeZone, Utc, Weekday};
use tracing::debug;

use crate::models::RawValue;

// ── Timestamp parsing ─────────────────────────────────────────────────────────

/// Naive date-time layouts tried after RFC 3339 / RFC 2822, in order.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%d-%m-%Y %H:%M:%S",
    "%d-%m-%Y %H:%M",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
    "%d/%m/%Y %H:%M:%S",
];

/// Date-only layouts; the instant is midnight UTC.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y%m%d",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%d/%m/%Y",
];

/// Unix seconds are only accepted as ten-digit values in 2000..2100, so
/// compact dates and plain counters are never read as instants.
const EPOCH_SECONDS_RANGE: std::ops::Range<i64> = 946_684_800..4_102_444_800;

/// Parse a raw cell into a UTC instant.
///
/// Numeric-looking cells are parsed from their source text like any other,
/// so `20240101` is a compact date rather than a count of seconds.
pub fn parse_timestamp(value: &RawValue) -> Option<DateTime<Utc>> {
    match value {
        RawValue::Null => None,
        RawValue::Integer(i) => parse_timestamp_str(&i.to_string()),
        RawValue::Float { raw, .. } => parse_timestamp_str(raw),
        RawValue::Text(s) => parse_timestamp_str(s),
    }
}

/// Parse a timestamp string.
///
/// Tries RFC 3339 (including `Z`-suffix), RFC 2822, the naive layouts above
/// interpreted as UTC, then ten-digit Unix seconds within
/// [`EPOCH_SECONDS_RANGE`].
pub fn parse_timestamp_str(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    // Replace trailing 'Z' with '+00:00' for RFC 3339 compatibility.
    let normalised = match s.strip_suffix('Z') {
        Some(stripped) => format!("{}+00:00", stripped),
        None => s.to_string(),
    };

    if let Ok(dt) = DateTime::parse_from_rfc3339(&normalised) {
        return Some(dt.with_timezone(&Utc));
    }
    // Space-separated offsets, e.g. "2024-01-01 08:00:00+01:00".
    if let Ok(dt) = DateTime::parse_from_str(&normalised, "%Y-%m-%d %H:%M:%S%:z") {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Some(start_of_day(date));
        }
    }

    if s.len() == 10 && s.bytes().all(|b| b.is_ascii_digit()) {
        if let Some(dt) = s
            .parse::<i64>()
            .ok()
            .filter(|secs| EPOCH_SECONDS_RANGE.contains(secs))
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
        {
            return Some(dt);
        }
    }

    debug!("could not parse timestamp \"{}\"", s);
    None
}

/// Midnight UTC of `date`.
pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(chrono::NaiveTime::MIN))
}

/// Truncate an instant to its UTC calendar day.
pub fn truncate_to_day(ts: DateTime<Utc>) -> NaiveDate {
    ts.date_naive()
}

/// Parse the `day` column of an aggregate table: either an ISO date or any
/// timestamp accepted by [`parse_timestamp_str`].
pub fn parse_day(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| parse_timestamp_str(s).map(truncate_to_day))
}

// ── Calendar labels ───────────────────────────────────────────────────────────

/// Meteorological season of a month (1-12).
pub fn season_for_month(month: u32) -> &'static str {
    match month {
        3..=5 => "spring",
        6..=8 => "summer",
        9..=11 => "autumn",
        _ => "winter",
    }
}

/// English month name for a month (1-12); `"Unknown"` otherwise.
pub fn month_name(month: u32) -> &'static str {
    const NAMES: [&str; 12] = [
        "January",
        "February",
        "March",
        "April",
        "May",
        "June",
        "July",
        "August",
        "September",
        "October",
        "November",
        "December",
    ];
    month
        .checked_sub(1)
        .and_then(|i| NAMES.get(i as usize))
        .copied()
        .unwrap_or("Unknown")
}

/// English weekday name of `date`.
pub fn weekday_name(date: NaiveDate) -> &'static str {
    match date.weekday() {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
