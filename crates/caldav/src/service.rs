//! Event listing and etag-guarded mutations on top of a [`CalendarTransport`].
//!
//! Nothing here is cached or locked. The only concurrency control is the
//! etag a caller read from [`CalendarService::get_events`] and hands back to
//! [`CalendarService::update_event`] or [`CalendarService::delete_event`].

use {
    chrono::Utc,
    tracing::{debug, info, warn},
};

use crate::{
    datetime,
    error::{Error, ErrorKind, Result},
    ical,
    transport::SharedTransport,
    types::{
        CalendarRecord, CalendarResource, EventFields, EventRecord, TimeRange, UNNAMED_CALENDAR,
        UNTITLED_EVENT,
    },
    uid,
};

/// Calendar operations exposed to the tool surface.
#[derive(Clone)]
pub struct CalendarService {
    transport: SharedTransport,
}

impl CalendarService {
    pub fn new(transport: SharedTransport) -> Self {
        Self { transport }
    }

    /// List calendars, filling in a display name where the server has none.
    pub async fn list_calendars(&self) -> Result<Vec<CalendarRecord>> {
        let calendars = self.transport.list_calendars().await?;
        debug!(count = calendars.len(), "listed calendars");

        Ok(calendars
            .into_iter()
            .map(|cal| CalendarRecord {
                display_name: cal
                    .display_name
                    .unwrap_or_else(|| UNNAMED_CALENDAR.to_string()),
                url: cal.href,
                description: cal.description,
                sync_token: cal.sync_token,
            })
            .collect())
    }

    /// Fetch and decode the events of a calendar.
    ///
    /// A range filter is sent only when both bounds are given; the bounds
    /// are passed to the transport unmodified. Order is the server's.
    pub async fn get_events(
        &self,
        calendar_url: &str,
        start_date: Option<&str>,
        end_date: Option<&str>,
    ) -> Result<Vec<EventRecord>> {
        require("calendarUrl", calendar_url)?;

        let range = match (non_empty(start_date), non_empty(end_date)) {
            (Some(start), Some(end)) => {
                for (name, value) in [("startDate", start), ("endDate", end)] {
                    if datetime::parse_timestamp(value).is_none() {
                        return Err(Error::malformed(format!(
                            "{name} is not a valid timestamp: {value}"
                        )));
                    }
                }
                Some(TimeRange {
                    start: start.to_string(),
                    end: end.to_string(),
                })
            },
            _ => None,
        };

        let resources = self
            .transport
            .fetch_calendar_resources(calendar_url, range.as_ref())
            .await?;
        debug!(calendar = %calendar_url, count = resources.len(), "fetched calendar resources");

        Ok(resources.into_iter().map(event_record).collect())
    }

    /// Create an event and return its locator.
    ///
    /// Falls back to the generated filename when the transport reports no
    /// locator. No etag is returned; list the calendar to learn it.
    pub async fn create_event(&self, calendar_url: &str, fields: EventFields) -> Result<String> {
        require("calendarUrl", calendar_url)?;
        let draft = fields.validate()?;

        let uid = uid::generate_uid();
        let filename = uid::filename_for(&uid);
        let document = ical::encode(&draft, &uid, Utc::now());

        let created = self
            .transport
            .create_resource(calendar_url, &filename, document)
            .await?;
        let href = created.href.unwrap_or(filename);

        info!(calendar = %calendar_url, href = %href, "created event");
        Ok(href)
    }

    /// Replace an event, conditional on `etag` still being current.
    ///
    /// The stored event is read first so the replacement keeps its `UID`.
    /// When the server returns no document, the `UID` falls back to the
    /// locator's file stem, then to a fresh one.
    pub async fn update_event(
        &self,
        event_url: &str,
        etag: &str,
        fields: EventFields,
    ) -> Result<()> {
        require("eventUrl", event_url)?;
        require("etag", etag)?;
        let draft = fields.validate()?;

        let stored = self
            .transport
            .fetch_resource(event_url)
            .await
            .inspect_err(|e| log_rejection("update", event_url, e))?;
        let uid = stored
            .as_ref()
            .and_then(|resource| ical::stored_uid(&resource.data))
            .map(str::to_string)
            .unwrap_or_else(|| match uid::id_from_location(event_url) {
                id if id.is_empty() => uid::generate_uid(),
                id => id,
            });
        let document = ical::encode(&draft, &uid, Utc::now());

        self.transport
            .update_resource(event_url, document, etag)
            .await
            .inspect_err(|e| log_rejection("update", event_url, e))?;

        info!(href = %event_url, "updated event");
        Ok(())
    }

    /// Delete an event, conditional on `etag` still being current.
    pub async fn delete_event(&self, event_url: &str, etag: &str) -> Result<()> {
        require("eventUrl", event_url)?;
        require("etag", etag)?;

        self.transport
            .delete_resource(event_url, etag)
            .await
            .inspect_err(|e| log_rejection("delete", event_url, e))?;

        info!(href = %event_url, "deleted event");
        Ok(())
    }
}

fn event_record(resource: CalendarResource) -> EventRecord {
    let parsed = ical::decode(&resource.data);
    EventRecord {
        id: uid::id_from_location(&resource.href),
        location_url: resource.href,
        summary: parsed
            .summary
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| UNTITLED_EVENT.to_string()),
        description: parsed.description,
        start: parsed.start,
        end: parsed.end,
        location: parsed.location,
        status: parsed.status,
        version_token: resource.etag,
    }
}

fn require(name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::malformed(format!("{name} is required")));
    }
    Ok(())
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

fn log_rejection(operation: &str, href: &str, error: &Error) {
    match error.kind() {
        ErrorKind::Conflict => warn!(operation, href = %href, "etag is stale, server rejected write"),
        ErrorKind::NotFound => warn!(operation, href = %href, "event no longer exists"),
        _ => {},
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        transport::mock::{Call, MockTransport},
        types::RemoteCalendar,
    };

    const EVENT_HREF: &str = "/dav/calendars/me/work/evt-1.ics";

    fn stored_event() -> CalendarResource {
        CalendarResource {
            href: EVENT_HREF.into(),
            etag: Some("\"v1\"".into()),
            data: "BEGIN:VCALENDAR\r\nBEGIN:VEVENT\r\nUID:evt-1\r\nSUMMARY:Planning\r\n\
                   DTSTART:20250615T100000Z\r\nDTEND:20250615T110000Z\r\n\
                   LOCATION:Room 4\r\nEND:VEVENT\r\nEND:VCALENDAR"
                .into(),
        }
    }

    fn fields(summary: &str) -> EventFields {
        EventFields {
            summary: summary.into(),
            start: "2025-06-15T10:00:00".into(),
            end: "2025-06-15T11:00:00".into(),
            ..Default::default()
        }
    }

    fn service(mock: &Arc<MockTransport>) -> CalendarService {
        CalendarService::new(Arc::clone(mock) as SharedTransport)
    }

    #[tokio::test]
    async fn list_calendars_fills_missing_names() {
        let mock = Arc::new(MockTransport {
            calendars: vec![
                RemoteCalendar {
                    href: "/cal/a/".into(),
                    display_name: Some("Calendar A".into()),
                    ..Default::default()
                },
                RemoteCalendar {
                    href: "/cal/b/".into(),
                    display_name: None,
                    sync_token: Some("ctag-2".into()),
                    ..Default::default()
                },
            ],
            ..Default::default()
        });

        let calendars = service(&mock).list_calendars().await.unwrap();
        assert_eq!(calendars.len(), 2);
        assert_eq!(calendars[0].display_name, "Calendar A");
        assert_eq!(calendars[0].url, "/cal/a/");
        assert_eq!(calendars[1].display_name, "Unnamed Calendar");
        assert_eq!(calendars[1].sync_token.as_deref(), Some("ctag-2"));
    }

    #[tokio::test]
    async fn get_events_decodes_and_attaches_identity() {
        let mock = Arc::new(MockTransport::with_resources(vec![stored_event()]));
        let events = service(&mock)
            .get_events("/dav/calendars/me/work/", None, None)
            .await
            .unwrap();

        assert_eq!(events.len(), 1);
        let event = &events[0];
        assert_eq!(event.id, "evt-1");
        assert_eq!(event.location_url, EVENT_HREF);
        assert_eq!(event.summary, "Planning");
        assert_eq!(event.start.as_deref(), Some("2025-06-15T10:00:00"));
        assert_eq!(event.end.as_deref(), Some("2025-06-15T11:00:00"));
        assert_eq!(event.location.as_deref(), Some("Room 4"));
        assert_eq!(event.version_token.as_deref(), Some("\"v1\""));
    }

    #[tokio::test]
    async fn get_events_defaults_summary_and_tolerates_garbage() {
        let mock = Arc::new(MockTransport::with_resources(vec![CalendarResource {
            href: "https://dav.example.com/cal/x.ics".into(),
            etag: None,
            data: "not an icalendar document".into(),
        }]));
        let events = service(&mock).get_events("/cal/", None, None).await.unwrap();
        assert_eq!(events[0].summary, "Untitled Event");
        assert_eq!(events[0].id, "x");
        assert!(events[0].start.is_none() && events[0].end.is_none());
    }

    #[tokio::test]
    async fn get_events_sends_range_only_with_both_bounds() {
        let mock = Arc::new(MockTransport::default());
        let svc = service(&mock);
        svc.get_events("/cal/", Some("2025-01-01T00:00:00"), None)
            .await
            .unwrap();
        svc.get_events("/cal/", Some("2025-01-01T00:00:00"), Some(""))
            .await
            .unwrap();
        svc.get_events(
            "/cal/",
            Some("2025-01-01T00:00:00"),
            Some("2025-12-31T23:59:59"),
        )
        .await
        .unwrap();

        let ranges: Vec<Option<TimeRange>> = mock
            .calls()
            .into_iter()
            .map(|call| match call {
                Call::Fetch { range, .. } => range,
                other => panic!("unexpected call {other:?}"),
            })
            .collect();
        assert_eq!(ranges, vec![None, None, Some(TimeRange {
            start: "2025-01-01T00:00:00".into(),
            end: "2025-12-31T23:59:59".into(),
        })]);
    }

    #[tokio::test]
    async fn get_events_rejects_unparseable_range() {
        let mock = Arc::new(MockTransport::default());
        let err = service(&mock)
            .get_events("/cal/", Some("yesterday"), Some("2025-12-31T23:59:59"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedInput);
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn create_rejects_empty_summary_before_transport() {
        let mock = Arc::new(MockTransport::default());
        let err = service(&mock)
            .create_event("/cal/", fields(""))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedInput);
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn create_rejects_missing_calendar() {
        let mock = Arc::new(MockTransport::default());
        let err = service(&mock)
            .create_event("", fields("Lunch"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedInput);
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn create_embeds_uid_matching_filename() {
        let mock = Arc::new(MockTransport::default());
        let href = service(&mock)
            .create_event("/cal/", fields("Lunch"))
            .await
            .unwrap();

        let calls = mock.calls();
        let Call::Create {
            calendar_url,
            filename,
            document,
        } = &calls[0]
        else {
            panic!("expected a create call, got {calls:?}");
        };
        assert_eq!(calendar_url, "/cal/");
        assert_eq!(&href, filename);
        let uid = filename.strip_suffix(".ics").unwrap();
        assert!(document.contains(&format!("\r\nUID:{uid}\r\n")));
        assert!(document.contains("SUMMARY:Lunch"));
    }

    #[tokio::test]
    async fn create_prefers_reported_locator() {
        let mock = Arc::new(MockTransport {
            created_href: Some("/cal/server-named.ics".into()),
            ..Default::default()
        });
        let href = service(&mock)
            .create_event("/cal/", fields("Lunch"))
            .await
            .unwrap();
        assert_eq!(href, "/cal/server-named.ics");
    }

    #[tokio::test]
    async fn update_with_current_etag_replaces_document() {
        let mock = Arc::new(MockTransport::with_resources(vec![stored_event()]));
        let svc = service(&mock);
        svc.update_event(EVENT_HREF, "\"v1\"", fields("Planning (moved)"))
            .await
            .unwrap();

        let events = svc.get_events("/cal/", None, None).await.unwrap();
        assert_eq!(events[0].summary, "Planning (moved)");
        assert_eq!(events[0].version_token.as_deref(), Some("\"v1\"-next"));

        let calls = mock.calls();
        let Some(Call::Update { document, .. }) = calls.get(1) else {
            panic!("expected an update call after the lookup");
        };
        assert!(document.contains("\r\nUID:evt-1\r\n"));
    }

    #[tokio::test]
    async fn update_keeps_uid_that_differs_from_filename() {
        let href = "/dav/calendars/me/work/Meeting%20notes.ics";
        let mock = Arc::new(MockTransport::with_resources(vec![CalendarResource {
            href: href.into(),
            etag: Some("\"v1\"".into()),
            data: "BEGIN:VEVENT\r\nUID:0A1B2C@other-client\r\nSUMMARY:Notes\r\n\
                   DTSTART:20250615T100000Z\r\nDTEND:20250615T110000Z\r\nEND:VEVENT"
                .into(),
        }]));
        service(&mock)
            .update_event(href, "\"v1\"", fields("Notes (edited)"))
            .await
            .unwrap();

        let calls = mock.calls();
        let Some(Call::Update { document, .. }) = calls.last() else {
            panic!("expected an update call");
        };
        assert!(document.contains("\r\nUID:0A1B2C@other-client\r\n"));
        assert!(!document.contains("Meeting%20notes"));
    }

    #[tokio::test]
    async fn update_without_stored_document_uses_file_stem() {
        let mock = Arc::new(MockTransport::default());
        let err = service(&mock)
            .update_event(EVENT_HREF, "\"v1\"", fields("Gone"))
            .await
            .unwrap_err();
        // the mock has no such resource, so the conditional write reports it
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let Some(Call::Update { document, .. }) = mock.calls().last().cloned() else {
            panic!("expected an update call");
        };
        assert!(document.contains("\r\nUID:evt-1\r\n"));
    }

    #[tokio::test]
    async fn update_with_stale_etag_is_a_conflict() {
        let mock = Arc::new(MockTransport::with_resources(vec![stored_event()]));
        let err = service(&mock)
            .update_event(EVENT_HREF, "\"v0\"", fields("Lost update"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        // exactly one write attempt, no silent retry
        let writes = mock
            .calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Update { .. }))
            .count();
        assert_eq!(writes, 1);
        let events = service(&mock).get_events("/cal/", None, None).await.unwrap();
        assert_eq!(events[0].summary, "Planning");
    }

    #[tokio::test]
    async fn update_requires_etag() {
        let mock = Arc::new(MockTransport::with_resources(vec![stored_event()]));
        let err = service(&mock)
            .update_event(EVENT_HREF, "", fields("No token"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedInput);
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn delete_with_stale_etag_is_a_conflict() {
        let mock = Arc::new(MockTransport::with_resources(vec![stored_event()]));
        let err = service(&mock)
            .delete_event(EVENT_HREF, "\"v0\"")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(mock.calls().len(), 1);
    }

    #[tokio::test]
    async fn delete_twice_reports_not_found() {
        let mock = Arc::new(MockTransport::with_resources(vec![stored_event()]));
        let svc = service(&mock);
        svc.delete_event(EVENT_HREF, "\"v1\"").await.unwrap();
        let err = svc.delete_event(EVENT_HREF, "\"v1\"").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn delete_requires_event_url() {
        let mock = Arc::new(MockTransport::default());
        let err = service(&mock).delete_event(" ", "\"v1\"").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedInput);
        assert!(mock.calls().is_empty());
    }
}
