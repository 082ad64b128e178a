//! MCP tool surface for calendar operations.

use {
    async_trait::async_trait,
    nextcal_mcp::{McpToolDef, ToolHandler, ToolsCallResult},
    serde_json::{Value, json},
    tracing::warn,
};

use crate::{
    error::{Context, Result},
    request::{
        CREATE_EVENT, CalendarRequest, DELETE_EVENT, GET_EVENTS, LIST_CALENDARS, UPDATE_EVENT,
    },
    service::CalendarService,
};

/// Serves the five calendar tools on top of a [`CalendarService`].
pub struct CalendarToolHandler {
    service: CalendarService,
}

impl CalendarToolHandler {
    #[must_use]
    pub fn new(service: CalendarService) -> Self {
        Self { service }
    }

    /// Run a decoded request and render its reply text.
    pub async fn execute(&self, request: CalendarRequest) -> Result<String> {
        match request {
            CalendarRequest::ListCalendars => {
                let calendars = self.service.list_calendars().await?;
                serde_json::to_string_pretty(&calendars).context("failed to render calendars")
            },
            CalendarRequest::GetEvents {
                calendar_url,
                start_date,
                end_date,
            } => {
                let events = self
                    .service
                    .get_events(&calendar_url, start_date.as_deref(), end_date.as_deref())
                    .await?;
                serde_json::to_string_pretty(&events).context("failed to render events")
            },
            CalendarRequest::CreateEvent {
                calendar_url,
                fields,
            } => {
                let url = self.service.create_event(&calendar_url, fields).await?;
                Ok(format!("Event created successfully. URL: {url}"))
            },
            CalendarRequest::UpdateEvent {
                event_url,
                etag,
                fields,
            } => {
                self.service.update_event(&event_url, &etag, fields).await?;
                Ok("Event updated successfully.".to_string())
            },
            CalendarRequest::DeleteEvent { event_url, etag } => {
                self.service.delete_event(&event_url, &etag).await?;
                Ok("Event deleted successfully.".to_string())
            },
        }
    }
}

#[async_trait]
impl ToolHandler for CalendarToolHandler {
    fn tools(&self) -> Vec<McpToolDef> {
        tool_definitions()
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> ToolsCallResult {
        let outcome = match CalendarRequest::from_call(name, arguments) {
            Ok(request) => self.execute(request).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(text) => ToolsCallResult::text(text),
            Err(e) => {
                warn!(tool = name, kind = ?e.kind(), error = %e, "tool call failed");
                ToolsCallResult::error(format!("Error: {e}"))
            },
        }
    }
}

fn tool(name: &str, description: &str, input_schema: Value) -> McpToolDef {
    McpToolDef {
        name: name.into(),
        description: Some(description.into()),
        input_schema,
    }
}

const ISO_START: &str = "Start date and time in ISO 8601 format (e.g., 2025-11-15T14:00:00)";
const ISO_END: &str = "End date and time in ISO 8601 format (e.g., 2025-11-15T15:00:00)";
const ETAG_HINT: &str = "The etag of the event (from get_events) for conflict detection";
const STATUS_HINT: &str = "Optional: Event status (CONFIRMED, TENTATIVE, CANCELLED)";

/// Definitions returned from `tools/list`.
#[must_use]
pub fn tool_definitions() -> Vec<McpToolDef> {
    vec![
        tool(
            LIST_CALENDARS,
            "List all available calendars in your CalDAV account. Returns calendar names, URLs, \
             descriptions and change tokens.",
            json!({ "type": "object", "properties": {} }),
        ),
        tool(
            GET_EVENTS,
            "Get events from a specific calendar. Optionally filter by date range using ISO 8601 \
             format (YYYY-MM-DDTHH:mm:ss). Each event carries the url and etag needed to update \
             or delete it.",
            json!({
                "type": "object",
                "properties": {
                    "calendarUrl": {
                        "type": "string",
                        "description": "The URL of the calendar (from list_calendars)"
                    },
                    "startDate": {
                        "type": "string",
                        "description": "Optional: Start date in ISO 8601 format (e.g., 2025-01-01T00:00:00)"
                    },
                    "endDate": {
                        "type": "string",
                        "description": "Optional: End date in ISO 8601 format (e.g., 2025-12-31T23:59:59)"
                    }
                },
                "required": ["calendarUrl"]
            }),
        ),
        tool(
            CREATE_EVENT,
            "Create a new calendar event. All dates should be in ISO 8601 format \
             (YYYY-MM-DDTHH:mm:ss); times without an offset are read as UTC.",
            json!({
                "type": "object",
                "properties": {
                    "calendarUrl": {
                        "type": "string",
                        "description": "The URL of the calendar where the event will be created"
                    },
                    "summary": { "type": "string", "description": "The title/summary of the event" },
                    "start": { "type": "string", "description": ISO_START },
                    "end": { "type": "string", "description": ISO_END },
                    "description": {
                        "type": "string",
                        "description": "Optional: Detailed description of the event"
                    },
                    "location": { "type": "string", "description": "Optional: Location of the event" },
                    "status": { "type": "string", "description": STATUS_HINT }
                },
                "required": ["calendarUrl", "summary", "start", "end"]
            }),
        ),
        tool(
            UPDATE_EVENT,
            "Replace an existing calendar event. The etag must be the one returned by get_events; \
             if the event changed since, the update is rejected and the event must be fetched \
             again.",
            json!({
                "type": "object",
                "properties": {
                    "eventUrl": {
                        "type": "string",
                        "description": "The URL of the event to update (from get_events)"
                    },
                    "etag": { "type": "string", "description": ETAG_HINT },
                    "summary": { "type": "string", "description": "The title/summary of the event" },
                    "start": { "type": "string", "description": ISO_START },
                    "end": { "type": "string", "description": ISO_END },
                    "description": {
                        "type": "string",
                        "description": "Optional: Detailed description of the event"
                    },
                    "location": { "type": "string", "description": "Optional: Location of the event" },
                    "status": { "type": "string", "description": STATUS_HINT }
                },
                "required": ["eventUrl", "etag", "summary", "start", "end"]
            }),
        ),
        tool(
            DELETE_EVENT,
            "Delete a calendar event. Rejected if the event changed since its etag was read.",
            json!({
                "type": "object",
                "properties": {
                    "eventUrl": {
                        "type": "string",
                        "description": "The URL of the event to delete (from get_events)"
                    },
                    "etag": { "type": "string", "description": ETAG_HINT }
                },
                "required": ["eventUrl", "etag"]
            }),
        ),
    ]
}
