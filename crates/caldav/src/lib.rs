//! CalDAV calendar tools for nextcal.
//!
//! Lists calendars, reads events, and creates, replaces or deletes single
//! events on a CalDAV server. Updates and deletes are conditional on the
//! etag the caller read; a stale etag is reported as a conflict and never
//! retried. Supports Nextcloud, Fastmail, iCloud, and generic servers.

pub mod client;
pub mod datetime;
pub mod discovery;
pub mod error;
pub mod ical;
pub mod request;
pub mod requests;
pub mod service;
pub mod session;
pub mod tool;
pub mod transport;
pub mod types;
pub mod uid;

pub use {
    client::LibDavTransport,
    error::{Error, ErrorKind, Result},
    request::CalendarRequest,
    service::CalendarService,
    session::LazySession,
    tool::CalendarToolHandler,
    transport::{CalendarTransport, SharedTransport},
};
