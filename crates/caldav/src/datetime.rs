//! Conversion between canonical `YYYY-MM-DDTHH:MM:SS` timestamps and the
//! compact iCalendar `YYYYMMDDTHHMMSSZ` token.
//!
//! Decoding is positional and never fails: a token with fewer than eight
//! digits comes back unchanged. Encoding always normalises to UTC.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Compact iCalendar UTC date-time layout.
const ICAL_UTC_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// Turn `YYYYMMDD[THHMMSS][Z]` into `YYYY-MM-DDTHH:MM:SS`.
///
/// Every `T` and `Z` is stripped before the fields are read by position;
/// missing time fields default to `00`. No timezone suffix is emitted.
#[must_use]
pub fn decode(token: &str) -> String {
    let digits: Vec<char> = token.chars().filter(|c| !matches!(c, 'T' | 'Z')).collect();
    if digits.len() < 8 {
        return token.to_string();
    }

    let field = |from: usize, to: usize| -> String {
        let to = to.min(digits.len());
        if from >= to {
            "00".to_string()
        } else {
            digits[from..to].iter().collect()
        }
    };

    format!(
        "{}-{}-{}T{}:{}:{}",
        field(0, 4),
        field(4, 6),
        field(6, 8),
        field(8, 10),
        field(10, 12),
        field(12, 14)
    )
}

/// Turn a canonical timestamp into `YYYYMMDDTHHMMSSZ`.
///
/// Returns `None` when the input is not a recognisable timestamp.
#[must_use]
pub fn encode(timestamp: &str) -> Option<String> {
    parse_timestamp(timestamp).map(format_utc)
}

/// Format an instant as a compact iCalendar UTC token.
#[must_use]
pub fn format_utc(instant: DateTime<Utc>) -> String {
    instant.format(ICAL_UTC_FORMAT).to_string()
}

/// Parse a caller-supplied timestamp as an absolute instant.
///
/// Accepts RFC 3339 (`Z` or a numeric offset), an offset-less
/// `YYYY-MM-DDTHH:MM[:SS[.fff]]` which is read as UTC, and a bare
/// `YYYY-MM-DD` which means midnight UTC.
#[must_use]
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    for layout in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, layout) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
