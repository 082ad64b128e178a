//! Typed tool invocations decoded from a tool name and JSON arguments.

use {
    serde::{Deserialize, de::DeserializeOwned},
    serde_json::Value,
};

use crate::{
    error::{Error, Result},
    types::EventFields,
};

pub const LIST_CALENDARS: &str = "list_calendars";
pub const GET_EVENTS: &str = "get_events";
pub const CREATE_EVENT: &str = "create_event";
pub const UPDATE_EVENT: &str = "update_event";
pub const DELETE_EVENT: &str = "delete_event";

/// One calendar operation with its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalendarRequest {
    ListCalendars,
    GetEvents {
        calendar_url: String,
        start_date: Option<String>,
        end_date: Option<String>,
    },
    CreateEvent {
        calendar_url: String,
        fields: EventFields,
    },
    UpdateEvent {
        event_url: String,
        etag: String,
        fields: EventFields,
    },
    DeleteEvent {
        event_url: String,
        etag: String,
    },
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GetEventsArgs {
    calendar_url: String,
    #[serde(default)]
    start_date: Option<String>,
    #[serde(default)]
    end_date: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateEventArgs {
    calendar_url: String,
    #[serde(flatten)]
    fields: EventFields,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateEventArgs {
    event_url: String,
    etag: String,
    #[serde(flatten)]
    fields: EventFields,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeleteEventArgs {
    event_url: String,
    etag: String,
}

impl CalendarRequest {
    /// Decode a tool call. Unknown tools and ill-typed or missing
    /// arguments are [`Error::MalformedInput`]; field contents are checked
    /// later by the service.
    pub fn from_call(name: &str, arguments: Value) -> Result<Self> {
        let arguments = match arguments {
            Value::Null => Value::Object(Default::default()),
            other => other,
        };

        match name {
            LIST_CALENDARS => Ok(Self::ListCalendars),
            GET_EVENTS => {
                let args: GetEventsArgs = parse_args(name, arguments)?;
                Ok(Self::GetEvents {
                    calendar_url: args.calendar_url,
                    start_date: args.start_date,
                    end_date: args.end_date,
                })
            },
            CREATE_EVENT => {
                let args: CreateEventArgs = parse_args(name, arguments)?;
                Ok(Self::CreateEvent {
                    calendar_url: args.calendar_url,
                    fields: args.fields,
                })
            },
            UPDATE_EVENT => {
                let args: UpdateEventArgs = parse_args(name, arguments)?;
                Ok(Self::UpdateEvent {
                    event_url: args.event_url,
                    etag: args.etag,
                    fields: args.fields,
                })
            },
            DELETE_EVENT => {
                let args: DeleteEventArgs = parse_args(name, arguments)?;
                Ok(Self::DeleteEvent {
                    event_url: args.event_url,
                    etag: args.etag,
                })
            },
            other => Err(Error::malformed(format!("Unknown tool: {other}"))),
        }
    }

    /// Tool name this request was decoded from.
    #[must_use]
    pub fn tool_name(&self) -> &'static str {
        match self {
            Self::ListCalendars => LIST_CALENDARS,
            Self::GetEvents { .. } => GET_EVENTS,
            Self::CreateEvent { .. } => CREATE_EVENT,
            Self::UpdateEvent { .. } => UPDATE_EVENT,
            Self::DeleteEvent { .. } => DELETE_EVENT,
        }
    }
}

fn parse_args<T: DeserializeOwned>(tool: &str, arguments: Value) -> Result<T> {
    serde_json::from_value(arguments)
        .map_err(|e| Error::malformed(format!("invalid arguments for {tool}: {e}")))
}
