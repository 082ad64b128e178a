//! Single-event iCalendar encode/decode.
//!
//! Decoding is a tolerant line scan over six property prefixes: unknown
//! lines are skipped, nothing is unescaped, and malformed input yields a
//! partial [`ParsedEvent`] instead of an error. Encoding writes a fixed
//! property order joined with CRLF, without escaping or line folding.

use chrono::{DateTime, Utc};

use crate::{datetime, types::EventDraft};

/// `PRODID` written into every generated document.
pub const PRODUCT_ID: &str = "-//nextcal//CalDAV Tools//EN";

/// Fields recovered from a raw VEVENT document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedEvent {
    pub summary: Option<String>,
    pub description: Option<String>,
    /// Canonical timestamp; set only together with `end`.
    pub start: Option<String>,
    pub end: Option<String>,
    pub location: Option<String>,
    pub status: Option<String>,
}

/// Extract the recognised properties from a raw document.
///
/// Property names match case-sensitively. `DTSTART`/`DTEND` may carry
/// parameters (`DTSTART;TZID=...:`); their value starts after the first
/// colon. When a later line repeats a property, it wins.
#[must_use]
pub fn decode(raw: &str) -> ParsedEvent {
    let mut event = ParsedEvent::default();

    for line in raw.split('\n') {
        let line = line.trim();

        if let Some(value) = line.strip_prefix("SUMMARY:") {
            event.summary = Some(value.to_string());
        } else if let Some(value) = line.strip_prefix("DESCRIPTION:") {
            event.description = Some(value.to_string());
        } else if let Some(rest) = line.strip_prefix("DTSTART") {
            if let Some(value) = parameterised_value(rest) {
                event.start = Some(datetime::decode(value));
            }
        } else if let Some(rest) = line.strip_prefix("DTEND") {
            if let Some(value) = parameterised_value(rest) {
                event.end = Some(datetime::decode(value));
            }
        } else if let Some(value) = line.strip_prefix("LOCATION:") {
            event.location = Some(value.to_string());
        } else if let Some(value) = line.strip_prefix("STATUS:") {
            event.status = Some(value.to_string());
        }
    }

    // start and end are reported as a pair or not at all
    if event.start.is_some() != event.end.is_some() {
        event.start = None;
        event.end = None;
    }

    event
}

/// The `UID` stored in a raw document, if any.
#[must_use]
pub fn stored_uid(raw: &str) -> Option<&str> {
    raw.split('\n')
        .filter_map(|line| line.trim().strip_prefix("UID:"))
        .find(|uid| !uid.is_empty())
}

/// Value after the first colon of a `NAME[;PARAMS]:value` remainder.
fn parameterised_value(rest: &str) -> Option<&str> {
    let (_, value) = rest.split_once(':')?;
    (!value.is_empty()).then_some(value)
}

/// Render a complete VCALENDAR document holding one VEVENT.
///
/// `stamp` becomes `DTSTAMP`. Empty optional fields are omitted.
#[must_use]
pub fn encode(event: &EventDraft, uid: &str, stamp: DateTime<Utc>) -> String {
    let mut lines = vec![
        "BEGIN:VCALENDAR".to_string(),
        "VERSION:2.0".to_string(),
        format!("PRODID:{PRODUCT_ID}"),
        "BEGIN:VEVENT".to_string(),
        format!("UID:{uid}"),
        format!("DTSTAMP:{}", datetime::format_utc(stamp)),
        format!("DTSTART:{}", datetime::format_utc(event.start)),
        format!("DTEND:{}", datetime::format_utc(event.end)),
        format!("SUMMARY:{}", event.summary),
    ];

    let optional = [
        ("DESCRIPTION", &event.description),
        ("LOCATION", &event.location),
        ("STATUS", &event.status),
    ];
    for (name, value) in optional {
        if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
            lines.push(format!("{name}:{value}"));
        }
    }

    lines.push("END:VEVENT".to_string());
    lines.push("END:VCALENDAR".to_string());
    lines.join("\r\n")
}
