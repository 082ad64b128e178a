//! Event UIDs and the resource names derived from them.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;

/// Highest millisecond stamp handed out so far; keeps the time part
/// non-decreasing even if the wall clock steps backwards.
static LAST_MILLIS: AtomicI64 = AtomicI64::new(0);

/// Length of the random suffix taken from a v4 UUID.
const RANDOM_LEN: usize = 13;

/// Generate a `<millis>-<random>` UID.
///
/// Collisions are possible in principle and never checked against the
/// server.
#[must_use]
pub fn generate_uid() -> String {
    let now = Utc::now().timestamp_millis();
    let millis = LAST_MILLIS.fetch_max(now, Ordering::Relaxed).max(now);
    let random = uuid::Uuid::new_v4().simple().to_string();
    format!("{millis}-{}", &random[..RANDOM_LEN])
}

/// Resource filename for a UID.
#[must_use]
pub fn filename_for(uid: &str) -> String {
    format!("{uid}.ics")
}

/// Last path segment of a resource locator without its `.ics` suffix.
///
/// Returns an empty string when the locator is empty or has no path; treat
/// that as "identifier unavailable".
#[must_use]
pub fn id_from_location(url: &str) -> String {
    let path = match url.split_once("://") {
        Some((_, rest)) => rest.split_once('/').map_or("", |(_, path)| path),
        None => url,
    };
    let segment = path.rsplit('/').next().unwrap_or_default();
    segment.strip_suffix(".ics").unwrap_or(segment).to_string()
}
