//! The remote side of every calendar operation.

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    error::Result,
    types::{CalendarResource, CreatedResource, RemoteCalendar, TimeRange},
};

/// Calendar server interactions.
///
/// Implementations own discovery, fetching and conditional writes. Update
/// and delete must be conditional on `expected_etag` and fail with
/// [`Error::Conflict`](crate::error::Error::Conflict) when it is stale,
/// or [`Error::NotFound`](crate::error::Error::NotFound) when the
/// resource is gone.
#[async_trait]
pub trait CalendarTransport: Send + Sync {
    /// Discover calendars available on this account.
    async fn list_calendars(&self) -> Result<Vec<RemoteCalendar>>;

    /// Fetch calendar object resources, optionally limited to a time range.
    async fn fetch_calendar_resources(
        &self,
        calendar_url: &str,
        range: Option<&TimeRange>,
    ) -> Result<Vec<CalendarResource>>;

    /// Fetch one resource by its locator; `None` when the server has no data
    /// for it.
    async fn fetch_resource(&self, event_url: &str) -> Result<Option<CalendarResource>>;

    /// Store a new resource named `filename` inside the calendar.
    async fn create_resource(
        &self,
        calendar_url: &str,
        filename: &str,
        document: String,
    ) -> Result<CreatedResource>;

    /// Replace a resource if its current etag still equals `expected_etag`.
    async fn update_resource(
        &self,
        event_url: &str,
        document: String,
        expected_etag: &str,
    ) -> Result<()>;

    /// Delete a resource if its current etag still equals `expected_etag`.
    async fn delete_resource(&self, event_url: &str, expected_etag: &str) -> Result<()>;
}

/// Thread-safe shared transport.
pub type SharedTransport = Arc<dyn CalendarTransport>;

// ── Mock transport for testing ──────────────────────────────────────────────
