//! Provider-specific CalDAV endpoint resolution.

use tracing::warn;

/// Well-known CalDAV base URL for Fastmail.
pub const FASTMAIL_CALDAV_URL: &str = "https://caldav.fastmail.com";

/// Well-known CalDAV base URL for iCloud.
/// Requires an app-specific password.
pub const ICLOUD_CALDAV_URL: &str = "https://caldav.icloud.com";

/// DAV root below a Nextcloud server URL.
pub const NEXTCLOUD_DAV_PATH: &str = "/remote.php/dav";

/// Resolve the CalDAV base URL for a provider.
///
/// `nextcloud` takes the server URL and appends the DAV root unless it is
/// already there. `generic` (or no provider) uses `url` as given. Fastmail
/// and iCloud fall back to their well-known endpoints when `url` is unset.
#[must_use]
pub fn resolve_base_url(provider: Option<&str>, url: Option<&str>) -> Option<String> {
    let url = url.map(str::trim).filter(|u| !u.is_empty());

    match provider {
        Some("fastmail") => Some(url.map_or_else(|| FASTMAIL_CALDAV_URL.to_string(), String::from)),
        Some("icloud") => Some(url.map_or_else(|| ICLOUD_CALDAV_URL.to_string(), String::from)),
        Some("nextcloud") => url.map(nextcloud_dav_root),
        Some("generic") | None => url.map(String::from),
        Some(other) => {
            warn!(provider = other, "unknown CalDAV provider, using URL as-is");
            url.map(String::from)
        },
    }
}

fn nextcloud_dav_root(server_url: &str) -> String {
    let base = server_url.trim_end_matches('/');
    if base.ends_with(NEXTCLOUD_DAV_PATH) {
        base.to_string()
    } else {
        format!("{base}{NEXTCLOUD_DAV_PATH}")
    }
}
