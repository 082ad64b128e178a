//! Calendar-specific WebDAV requests layered on `libdav`.
//!
//! [`EventQuery`] is a `calendar-query` REPORT restricted to VEVENTs that
//! overlap a time range; `libdav` only offers the unfiltered query.
//! Calendar listing properties are read with `libdav`'s `GetProperties`
//! and folded into [`CalendarProperties`].

use {
    http::{Method, Request, Uri},
    libdav::{
        PropertyName,
        dav::{GetProperties, GetPropertiesResponse, WebDavError, make_relative_url},
        names,
        requests::{DavRequest, ParseResponseError, xml_content_type_header},
        xmlutils::XmlNode,
    },
    roxmltree::Node,
};

use crate::types::CalendarResource;

/// CalendarServer collection tag, changed on every write to the collection.
static GETCTAG: PropertyName<'static, 'static> =
    PropertyName::new(names::CALENDAR_SERVER, "getctag");

/// Properties read for every calendar in a listing, in response order.
static LISTING_PROPERTIES: [&PropertyName<'static, 'static>; 4] = [
    &names::DISPLAY_NAME,
    &names::CALENDAR_DESCRIPTION,
    &GETCTAG,
    &names::SYNC_TOKEN,
];

/// Depth-0 PROPFIND for the properties shown in a calendar listing.
#[must_use]
pub fn calendar_properties(collection_href: &str) -> GetProperties<'_> {
    GetProperties::new(collection_href, &LISTING_PROPERTIES)
}

/// Collection properties; any of them may be absent.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct CalendarProperties {
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub ctag: Option<String>,
    pub sync_token: Option<String>,
}

impl CalendarProperties {
    /// Collection change token, preferring the ctag.
    pub fn change_token(&self) -> Option<String> {
        self.ctag.clone().or_else(|| self.sync_token.clone())
    }
}

impl From<GetPropertiesResponse<'_>> for CalendarProperties {
    fn from(response: GetPropertiesResponse<'_>) -> Self {
        let mut props = Self::default();
        for (name, value) in response.values {
            let value = value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty());
            match name.name() {
                "displayname" => props.display_name = value,
                "calendar-description" => props.description = value,
                "getctag" => props.ctag = value,
                "sync-token" => props.sync_token = value,
                _ => {},
            }
        }
        props
    }
}

/// VEVENTs in a collection overlapping `[start, end)`.
pub struct EventQuery<'a> {
    collection_href: &'a str,
    start: &'a str,
    end: &'a str,
}

impl<'a> EventQuery<'a> {
    /// `start` and `end` are compact UTC tokens (`YYYYMMDDTHHMMSSZ`).
    pub fn in_range(collection_href: &'a str, start: &'a str, end: &'a str) -> Self {
        Self {
            collection_href,
            start,
            end,
        }
    }

    fn body(&self) -> String {
        let range = XmlNode::new(&names::TIME_RANGE)
            .with_attributes(vec![("start", self.start), ("end", self.end)]);
        let events = XmlNode::new(&names::COMP_FILTER)
            .with_attributes(vec![("name", "VEVENT")])
            .with_children(vec![range]);
        let calendar = XmlNode::new(&names::COMP_FILTER)
            .with_attributes(vec![("name", "VCALENDAR")])
            .with_children(vec![events]);

        XmlNode::new(&names::CALENDAR_QUERY)
            .with_children(vec![
                XmlNode::new(&names::PROP).with_children(vec![
                    XmlNode::new(&names::GETETAG),
                    XmlNode::new(&names::CALENDAR_DATA),
                ]),
                XmlNode::new(&names::FILTER).with_children(vec![calendar]),
            ])
            .render_node()
    }
}

impl DavRequest for EventQuery<'_> {
    type Error<E> = WebDavError<E>;
    type ParseError = ParseResponseError;
    type Response = Vec<CalendarResource>;

    fn prepare_request(&self, base_url: Uri) -> Result<Request<String>, http::Error> {
        let (ct_name, ct_value) = xml_content_type_header();
        Request::builder()
            .method(Method::from_bytes(b"REPORT")?)
            .uri(make_relative_url(base_url, self.collection_href)?)
            .header("Depth", "1")
            .header(ct_name, ct_value)
            .body(self.body())
    }

    fn parse_response(
        &self,
        parts: &http::response::Parts,
        body: &[u8],
    ) -> Result<Self::Response, ParseResponseError> {
        if !parts.status.is_success() {
            return Err(ParseResponseError::BadStatusCode(parts.status));
        }
        parse_calendar_resources(body)
    }
}

/// Resources with calendar data from a multistatus body. Entries without
/// data (the collection itself, deleted or forbidden members) are skipped.
pub(crate) fn parse_calendar_resources(
    body: &[u8],
) -> Result<Vec<CalendarResource>, ParseResponseError> {
    let text = std::str::from_utf8(body)?;
    let doc = roxmltree::Document::parse(text)?;

    Ok(doc
        .root_element()
        .children()
        .filter(|n| n.tag_name() == names::RESPONSE)
        .filter_map(|response| {
            Some(CalendarResource {
                href: element_text(response, "href")?,
                etag: element_text(response, "getetag"),
                data: element_text(response, "calendar-data")?,
            })
        })
        .collect())
}

/// Trimmed text of the first non-empty descendant with this local name.
fn element_text(node: Node<'_, '_>, local_name: &str) -> Option<String> {
    node.descendants()
        .filter(|n| n.tag_name().name() == local_name)
        .filter_map(|n| n.text())
        .map(str::trim)
        .find(|t| !t.is_empty())
        .map(String::from)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, http::StatusCode};

    const REPORT_BODY: &str = r#"<?xml version="1.0"?>
<d:multistatus xmlns:d="DAV:" xmlns:cal="urn:ietf:params:xml:ns:caldav">
  <d:response>
    <d:href>/remote.php/dav/calendars/me/personal/a.ics</d:href>
    <d:propstat>
      <d:prop>
        <d:getetag>"etag-a"</d:getetag>
        <cal:calendar-data><![CDATA[BEGIN:VCALENDAR
BEGIN:VEVENT
SUMMARY:A
END:VEVENT
END:VCALENDAR]]></cal:calendar-data>
      </d:prop>
      <d:status>HTTP/1.1 200 OK</d:status>
    </d:propstat>
  </d:response>
  <d:response>
    <d:href>/remote.php/dav/calendars/me/personal/</d:href>
    <d:propstat>
      <d:prop><d:getetag>"collection"</d:getetag></d:prop>
      <d:status>HTTP/1.1 200 OK</d:status>
    </d:propstat>
  </d:response>
</d:multistatus>"#;

    fn base_url() -> Uri {
        Uri::from_static("https://cloud.example.com")
    }

    fn parts(status: StatusCode) -> http::response::Parts {
        http::Response::builder()
            .status(status)
            .body(())
            .unwrap()
            .into_parts()
            .0
    }

    #[test]
    fn range_query_is_a_depth_one_report() {
        let request =
            EventQuery::in_range("/cal/personal/", "20250101T000000Z", "20250201T000000Z")
                .prepare_request(base_url())
                .unwrap();
        assert_eq!(request.method().as_str(), "REPORT");
        assert_eq!(request.uri().path(), "/cal/personal/");
        assert_eq!(request.headers()["Depth"], "1");

        let body = request.body();
        assert!(body.contains(r#"start="20250101T000000Z""#));
        assert!(body.contains(r#"end="20250201T000000Z""#));
        assert!(body.contains(r#"name="VEVENT""#));
        assert!(body.contains("calendar-data"));
    }

    #[test]
    fn range_query_body_is_well_formed() {
        let body = EventQuery::in_range("/cal/", "20250101T000000Z", "20250102T000000Z").body();
        let doc = roxmltree::Document::parse(&body).unwrap();
        let range = doc
            .descendants()
            .find(|n| n.tag_name() == names::TIME_RANGE)
            .unwrap();
        assert_eq!(range.attribute("start"), Some("20250101T000000Z"));
        assert_eq!(
            range.parent().unwrap().attribute("name"),
            Some("VEVENT")
        );
    }

    #[test]
    fn parses_resources_and_skips_entries_without_data() {
        let resources = EventQuery::in_range("/cal/", "a", "b")
            .parse_response(&parts(StatusCode::MULTI_STATUS), REPORT_BODY.as_bytes())
            .unwrap();
        assert_eq!(resources.len(), 1);
        assert_eq!(
            resources[0].href,
            "/remote.php/dav/calendars/me/personal/a.ics"
        );
        assert_eq!(resources[0].etag.as_deref(), Some("\"etag-a\""));
        assert!(resources[0].data.contains("SUMMARY:A"));
    }

    #[test]
    fn failed_query_reports_status() {
        let err = EventQuery::in_range("/cal/", "a", "b")
            .parse_response(&parts(StatusCode::FORBIDDEN), b"")
            .unwrap_err();
        assert!(matches!(
            err,
            ParseResponseError::BadStatusCode(StatusCode::FORBIDDEN)
        ));
    }

    #[test]
    fn malformed_xml_is_an_error() {
        assert!(parse_calendar_resources(b"<multistatus><response>").is_err());
    }

    #[test]
    fn listing_properties_are_one_depth_zero_propfind() {
        let request = calendar_properties("/cal/work/")
            .prepare_request(base_url())
            .unwrap();
        assert_eq!(request.method().as_str(), "PROPFIND");
        assert_eq!(request.headers()["Depth"], "0");
        for name in ["displayname", "calendar-description", "getctag", "sync-token"] {
            assert!(request.body().contains(name), "missing {name}");
        }
    }

    #[test]
    fn folds_properties_and_ignores_missing_ones() {
        let body = r#"<?xml version="1.0"?>
<d:multistatus xmlns:d="DAV:" xmlns:cal="urn:ietf:params:xml:ns:caldav" xmlns:cs="http://calendarserver.org/ns/">
  <d:response>
    <d:href>/cal/work/</d:href>
    <d:propstat>
      <d:prop>
        <d:displayname> Work </d:displayname>
        <cs:getctag>"ctag-9"</cs:getctag>
        <d:sync-token>http://sabre.io/ns/sync/9</d:sync-token>
      </d:prop>
      <d:status>HTTP/1.1 200 OK</d:status>
    </d:propstat>
    <d:propstat>
      <d:prop><cal:calendar-description/></d:prop>
      <d:status>HTTP/1.1 404 Not Found</d:status>
    </d:propstat>
  </d:response>
</d:multistatus>"#;
        let response = calendar_properties("/cal/work/")
            .parse_response(&parts(StatusCode::MULTI_STATUS), body.as_bytes())
            .unwrap();
        let props = CalendarProperties::from(response);
        assert_eq!(props.display_name.as_deref(), Some("Work"));
        assert!(props.description.is_none());
        assert_eq!(props.change_token().as_deref(), Some("\"ctag-9\""));
    }

    #[test]
    fn change_token_falls_back_to_sync_token() {
        let props = CalendarProperties {
            sync_token: Some("sync-1".into()),
            ..Default::default()
        };
        assert_eq!(props.change_token().as_deref(), Some("sync-1"));
    }
}
