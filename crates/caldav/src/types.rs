//! Typed structs for calendar operations.

use {
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
};

use crate::{
    datetime,
    error::{Error, Result},
};

/// Summary used when a decoded event carries no `SUMMARY`.
pub const UNTITLED_EVENT: &str = "Untitled Event";

/// Display name used when the server reports none.
pub const UNNAMED_CALENDAR: &str = "Unnamed Calendar";

/// A discovered calendar collection, as returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarRecord {
    pub display_name: String,
    /// Collection locator, passed back as `calendarUrl`.
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Opaque collection-level change token (ctag or sync-token).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_token: Option<String>,
}

/// One calendar event reconstructed from a fetched resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    /// Resource-local identifier; empty when the locator had no path.
    pub id: String,
    /// Server-assigned resource locator, passed back as `eventUrl`.
    #[serde(rename = "url")]
    pub location_url: String,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// ETag guarding later updates and deletes.
    #[serde(
        default,
        rename = "etag",
        skip_serializing_if = "Option::is_none"
    )]
    pub version_token: Option<String>,
}

/// Caller-supplied event fields for create and update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventFields {
    pub summary: String,
    /// Start in `YYYY-MM-DDTHH:MM:SS` form (an offset or `Z` is honoured).
    pub start: String,
    pub end: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    /// `CONFIRMED`, `TENTATIVE` or `CANCELLED` by convention.
    #[serde(default)]
    pub status: Option<String>,
}

impl EventFields {
    /// Check required fields and resolve both timestamps to UTC instants.
    pub fn validate(self) -> Result<EventDraft> {
        if self.summary.trim().is_empty() {
            return Err(Error::malformed("summary is required"));
        }
        let start = parse_required("start", &self.start)?;
        let end = parse_required("end", &self.end)?;

        Ok(EventDraft {
            summary: self.summary,
            description: self.description,
            start,
            end,
            location: self.location,
            status: self.status,
        })
    }
}

fn parse_required(name: &str, value: &str) -> Result<DateTime<Utc>> {
    if value.trim().is_empty() {
        return Err(Error::malformed(format!("{name} is required")));
    }
    datetime::parse_timestamp(value)
        .ok_or_else(|| Error::malformed(format!("{name} is not a valid timestamp: {value}")))
}

/// Validated event fields, ready for encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventDraft {
    pub summary: String,
    pub description: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub location: Option<String>,
    pub status: Option<String>,
}

/// Time range filter for listing events, in canonical timestamp form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: String,
    pub end: String,
}

/// A calendar collection as the transport discovered it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteCalendar {
    pub href: String,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub sync_token: Option<String>,
}

/// A fetched calendar object resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarResource {
    pub href: String,
    pub etag: Option<String>,
    /// Raw iCalendar document.
    pub data: String,
}

/// What the transport reports after creating a resource.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreatedResource {
    pub href: Option<String>,
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn fields() -> EventFields {
        EventFields {
            summary: "Standup".into(),
            start: "2025-06-15T10:00:00".into(),
            end: "2025-06-15T10:15:00".into(),
            ..Default::default()
        }
    }

    #[test]
    fn event_record_uses_wire_names() {
        let record = EventRecord {
            id: "evt-1".into(),
            location_url: "/cal/evt-1.ics".into(),
            summary: "Lunch".into(),
            description: None,
            start: Some("2025-06-15T12:00:00".into()),
            end: Some("2025-06-15T13:00:00".into()),
            location: None,
            status: Some("CONFIRMED".into()),
            version_token: Some("\"abc123\"".into()),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["url"], "/cal/evt-1.ics");
        assert_eq!(json["etag"], "\"abc123\"");
        assert!(json.get("description").is_none());
    }

    #[test]
    fn calendar_record_is_camel_case() {
        let record = CalendarRecord {
            display_name: "Work".into(),
            url: "/dav/calendars/work/".into(),
            description: None,
            sync_token: Some("ctag-7".into()),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["displayName"], "Work");
        assert_eq!(json["syncToken"], "ctag-7");
    }

    #[test]
    fn validate_accepts_complete_fields() {
        let draft = fields().validate().unwrap();
        assert_eq!(draft.summary, "Standup");
        assert!(draft.end > draft.start);
    }

    #[test]
    fn validate_rejects_blank_summary() {
        let err = EventFields {
            summary: "   ".into(),
            ..fields()
        }
        .validate()
        .unwrap_err();
        assert!(err.to_string().contains("summary"));
    }

    #[test]
    fn validate_rejects_missing_end() {
        let err = EventFields {
            end: String::new(),
            ..fields()
        }
        .validate()
        .unwrap_err();
        assert!(err.to_string().contains("end is required"));
    }

    #[test]
    fn validate_rejects_unparseable_start() {
        let err = EventFields {
            start: "next tuesday".into(),
            ..fields()
        }
        .validate()
        .unwrap_err();
        assert!(err.to_string().contains("start is not a valid timestamp"));
    }
}
