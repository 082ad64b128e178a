//! `libdav`-backed [`CalendarTransport`].
//!
//! Every request goes through `libdav`. Updates and deletes carry the
//! caller's etag as `If-Match`; the status of a rejected write is mapped
//! onto [`Error::Conflict`] or [`Error::NotFound`].

use {
    async_trait::async_trait,
    http::{StatusCode, Uri},
    hyper_rustls::HttpsConnector,
    hyper_util::client::legacy::{Client, connect::HttpConnector},
    libdav::dav::WebDavError,
    nextcal_config::CalDavConfig,
    secrecy::{ExposeSecret, Secret},
    tower_http::auth::AddAuthorization,
    tracing::{debug, info},
};

use crate::{
    datetime, discovery,
    error::{Context, Error, Result},
    requests::{self, CalendarProperties, EventQuery},
    transport::CalendarTransport,
    types::{CalendarResource, CreatedResource, RemoteCalendar, TimeRange},
};

/// Content type sent with every iCalendar body.
const ICALENDAR_CONTENT_TYPE: &str = "text/calendar; charset=utf-8";

type HttpsClient = Client<HttpsConnector<HttpConnector>, String>;
type AuthedClient = AddAuthorization<HttpsClient>;

/// CalDAV transport over HTTPS with basic authentication.
pub struct LibDavTransport {
    inner: libdav::CalDavClient<AuthedClient>,
    /// Configured calendar home; skips principal discovery when set.
    calendar_home: Option<Uri>,
}

impl LibDavTransport {
    /// Connect using the account settings from config.
    pub async fn from_config(config: &CalDavConfig) -> Result<Self> {
        if let Some(key) = config.missing_keys().first() {
            return Err(Error::message(format!("CalDAV {key} is not configured")));
        }

        let base_url =
            discovery::resolve_base_url(config.provider.as_deref(), config.url.as_deref())
                .context("CalDAV url is not configured")?;
        let username = config
            .username
            .as_deref()
            .context("CalDAV username is not configured")?;
        let password = config
            .password
            .as_ref()
            .context("CalDAV password is not configured")?;

        Self::connect(&base_url, username, password, config.calendar_path.as_deref()).await
    }

    /// Connect to a CalDAV server.
    ///
    /// Uses service discovery to locate the CalDAV context path.
    pub async fn connect(
        base_url: &str,
        username: &str,
        password: &Secret<String>,
        calendar_home: Option<&str>,
    ) -> Result<Self> {
        let uri: Uri = base_url
            .parse()
            .with_context(|| format!("invalid CalDAV URL '{base_url}'"))?;

        let https_connector = hyper_rustls::HttpsConnectorBuilder::new()
            .with_native_roots()
            .context("failed to load native TLS roots")?
            .https_or_http()
            .enable_http1()
            .build();

        let https_client: HttpsClient =
            Client::builder(hyper_util::rt::TokioExecutor::new()).build(https_connector);
        let http = AddAuthorization::basic(https_client, username, password.expose_secret());

        let webdav = libdav::dav::WebDavClient::new(uri, http);
        let inner = libdav::CalDavClient::bootstrap_via_service_discovery(webdav)
            .await
            .context("CalDAV service discovery failed")?;

        let calendar_home = calendar_home
            .map(|path| {
                resolve_href(inner.base_url(), path)
                    .with_context(|| format!("invalid calendar path '{path}'"))
            })
            .transpose()?;

        info!(url = %inner.base_url(), "connected to CalDAV server");
        Ok(Self {
            inner,
            calendar_home,
        })
    }

    /// Find calendar home set URLs for the current user.
    async fn find_calendar_homes(&self) -> Result<Vec<Uri>> {
        if let Some(home) = &self.calendar_home {
            return Ok(vec![home.clone()]);
        }

        let principal = self
            .inner
            .find_current_user_principal()
            .await
            .context("failed to find user principal")?;

        let Some(principal_uri) = principal else {
            return Ok(vec![self.inner.base_url().clone()]);
        };

        let response = self
            .inner
            .request(libdav::caldav::FindCalendarHomeSet::new(principal_uri.path()))
            .await
            .context("failed to find calendar home set")?;
        if response.home_sets.is_empty() {
            Ok(vec![self.inner.base_url().clone()])
        } else {
            Ok(response.home_sets)
        }
    }
}

#[async_trait]
impl CalendarTransport for LibDavTransport {
    async fn list_calendars(&self) -> Result<Vec<RemoteCalendar>> {
        let homes = self.find_calendar_homes().await?;
        let mut calendars = Vec::new();

        for home_url in &homes {
            let found = self
                .inner
                .request(libdav::caldav::FindCalendars::new(home_url.path()))
                .await
                .context("failed to find calendars")?;

            for cal in found.calendars {
                let props: CalendarProperties = self
                    .inner
                    .request(requests::calendar_properties(&cal.href))
                    .await
                    .with_context(|| format!("failed to read properties of {}", cal.href))?
                    .into();

                calendars.push(RemoteCalendar {
                    sync_token: props.change_token(),
                    display_name: props.display_name,
                    description: props.description,
                    href: cal.href,
                });
            }
        }

        Ok(calendars)
    }

    async fn fetch_calendar_resources(
        &self,
        calendar_url: &str,
        range: Option<&TimeRange>,
    ) -> Result<Vec<CalendarResource>> {
        let href = url_to_href(calendar_url);

        if let Some(range) = range {
            let start = datetime::encode(&range.start).ok_or_else(|| {
                Error::malformed(format!("startDate is not a valid timestamp: {}", range.start))
            })?;
            let end = datetime::encode(&range.end).ok_or_else(|| {
                Error::malformed(format!("endDate is not a valid timestamp: {}", range.end))
            })?;

            return self
                .inner
                .request(EventQuery::in_range(&href, &start, &end))
                .await
                .with_context(|| format!("failed to query {href}"));
        }

        let response = self
            .inner
            .request(libdav::caldav::GetCalendarResources::new(&href))
            .await
            .with_context(|| format!("failed to fetch calendar resources from {href}"))?;

        Ok(response
            .resources
            .into_iter()
            .filter_map(|resource| {
                let content = match resource.content {
                    Ok(content) => content,
                    Err(status) => {
                        debug!(href = %resource.href, %status, "skipping resource without data");
                        return None;
                    },
                };
                Some(CalendarResource {
                    href: resource.href,
                    etag: Some(content.etag),
                    data: content.data,
                })
            })
            .collect())
    }

    async fn fetch_resource(&self, event_url: &str) -> Result<Option<CalendarResource>> {
        let href = url_to_href(event_url);
        let collection = collection_of(&href);

        let response = self
            .inner
            .request(libdav::caldav::GetCalendarResources::new(collection).with_hrefs([&href]))
            .await
            .with_context(|| format!("failed to fetch {href}"))?;

        // one href was asked for; servers may echo it with different encoding
        let Some(resource) = response.resources.into_iter().next() else {
            return Ok(None);
        };
        match resource.content {
            Ok(content) => Ok(Some(CalendarResource {
                href: resource.href,
                etag: Some(content.etag),
                data: content.data,
            })),
            Err(StatusCode::NOT_FOUND | StatusCode::GONE) => Err(Error::NotFound { href }),
            Err(status) => {
                debug!(%href, %status, "resource returned without data");
                Ok(None)
            },
        }
    }

    async fn create_resource(
        &self,
        calendar_url: &str,
        filename: &str,
        document: String,
    ) -> Result<CreatedResource> {
        let href = format!("{}/{filename}", url_to_href(calendar_url).trim_end_matches('/'));

        self.inner
            .request(libdav::dav::PutResource::new(&href).create(document, ICALENDAR_CONTENT_TYPE))
            .await
            .with_context(|| format!("failed to create {href}"))?;

        Ok(CreatedResource { href: Some(href) })
    }

    async fn update_resource(
        &self,
        event_url: &str,
        document: String,
        expected_etag: &str,
    ) -> Result<()> {
        let href = url_to_href(event_url);
        let response = self
            .inner
            .request(libdav::dav::PutResource::new(&href).update(
                document,
                ICALENDAR_CONTENT_TYPE,
                expected_etag,
            ))
            .await
            .map_err(|e| classify_write_error(e, &href))?;

        debug!(%href, etag = ?response.etag, "event replaced");
        Ok(())
    }

    async fn delete_resource(&self, event_url: &str, expected_etag: &str) -> Result<()> {
        let href = url_to_href(event_url);
        self.inner
            .request(libdav::dav::Delete::new(&href).with_etag(expected_etag))
            .await
            .map_err(|e| classify_write_error(e, &href))?;

        debug!(%href, "event deleted");
        Ok(())
    }
}

/// Path part of an absolute URL; anything else is returned as-is.
pub(crate) fn url_to_href(url: &str) -> String {
    match url.parse::<Uri>() {
        Ok(uri) if uri.scheme().is_some() => uri.path().to_string(),
        _ => url.to_string(),
    }
}

/// Collection path holding `href`, with its trailing slash.
pub(crate) fn collection_of(href: &str) -> &str {
    match href.trim_end_matches('/').rfind('/') {
        Some(index) => &href[..=index],
        None => "/",
    }
}

/// Absolute URI for a locator: absolute URLs pass through, paths are
/// placed on the scheme and authority of `base`.
pub(crate) fn resolve_href(base: &Uri, href: &str) -> Result<Uri> {
    let parsed: Uri = href
        .parse()
        .with_context(|| format!("unparseable locator '{href}'"))?;
    if parsed.scheme().is_some() {
        return Ok(parsed);
    }

    let mut builder = Uri::builder();
    if let Some(scheme) = base.scheme() {
        builder = builder.scheme(scheme.clone());
    }
    if let Some(authority) = base.authority() {
        builder = builder.authority(authority.clone());
    }
    let path = parsed
        .path_and_query()
        .map_or("/", |pq| pq.as_str());
    builder
        .path_and_query(path)
        .build()
        .with_context(|| format!("cannot resolve '{href}' against {base}"))
}

/// Map a failed conditional write onto the error classes.
pub(crate) fn classify_write_error<E>(error: WebDavError<E>, href: &str) -> Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    match error {
        WebDavError::BadStatusCode(StatusCode::PRECONDITION_FAILED) => Error::Conflict {
            href: href.into(),
        },
        WebDavError::BadStatusCode(StatusCode::NOT_FOUND | StatusCode::GONE) => Error::NotFound {
            href: href.into(),
        },
        other => Error::transport(format!("write to {href} failed"), other),
    }
}
