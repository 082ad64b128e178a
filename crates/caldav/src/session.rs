//! A transport that connects on first use.
//!
//! Concurrent first calls share one connection attempt. A failed attempt
//! is not cached, so the next call tries again.

use std::sync::Arc;

use {
    async_trait::async_trait,
    futures::future::BoxFuture,
    nextcal_config::CalDavConfig,
    tokio::sync::OnceCell,
    tracing::{info, warn},
};

use crate::{
    client::LibDavTransport,
    error::Result,
    transport::{CalendarTransport, SharedTransport},
    types::{CalendarResource, CreatedResource, RemoteCalendar, TimeRange},
};

type Connector = Box<dyn Fn() -> BoxFuture<'static, Result<SharedTransport>> + Send + Sync>;

/// Lazily-connected calendar session.
pub struct LazySession {
    connect: Connector,
    transport: OnceCell<SharedTransport>,
}

impl LazySession {
    /// Session that opens a [`LibDavTransport`] from `config` when first used.
    #[must_use]
    pub fn from_config(config: CalDavConfig) -> Self {
        let config = Arc::new(config);
        Self::with_connector(move || {
            let config = Arc::clone(&config);
            Box::pin(async move {
                let transport = LibDavTransport::from_config(&config).await?;
                Ok(Arc::new(transport) as SharedTransport)
            })
        })
    }

    /// Session that calls `connect` to open the underlying transport.
    pub fn with_connector<F>(connect: F) -> Self
    where
        F: Fn() -> BoxFuture<'static, Result<SharedTransport>> + Send + Sync + 'static,
    {
        Self {
            connect: Box::new(connect),
            transport: OnceCell::new(),
        }
    }

    /// Whether a connection has been established.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.transport.initialized()
    }

    async fn transport(&self) -> Result<&SharedTransport> {
        self.transport
            .get_or_try_init(|| async {
                info!("opening CalDAV session");
                (self.connect)()
                    .await
                    .inspect_err(|e| warn!(error = %e, "CalDAV session could not be opened"))
            })
            .await
    }
}

#[async_trait]
impl CalendarTransport for LazySession {
    async fn list_calendars(&self) -> Result<Vec<RemoteCalendar>> {
        self.transport().await?.list_calendars().await
    }

    async fn fetch_calendar_resources(
        &self,
        calendar_url: &str,
        range: Option<&TimeRange>,
    ) -> Result<Vec<CalendarResource>> {
        self.transport()
            .await?
            .fetch_calendar_resources(calendar_url, range)
            .await
    }

    async fn create_resource(
        &self,
        calendar_url: &str,
        filename: &str,
        document: String,
    ) -> Result<CreatedResource> {
        self.transport()
            .await?
            .create_resource(calendar_url, filename, document)
            .await
    }

    async fn update_resource(
        &self,
        event_url: &str,
        document: String,
        expected_etag: &str,
    ) -> Result<()> {
        self.transport()
            .await?
            .update_resource(event_url, document, expected_etag)
            .await
    }

    async fn fetch_resource(&self, event_url: &str) -> Result<Option<CalendarResource>> {
        self.transport().await?.fetch_resource(event_url).await
    }

    async fn delete_resource(&self, event_url: &str, expected_etag: &str) -> Result<()> {
        self.transport()
            .await?
            .delete_resource(event_url, expected_etag)
            .await
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::{
        error::{Error, ErrorKind},
        transport::mock::MockTransport,
    };

    fn counting_session(attempts: Arc<AtomicUsize>, fail_first: bool) -> LazySession {
        LazySession::with_connector(move || {
            let attempts = Arc::clone(&attempts);
            Box::pin(async move {
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                if fail_first && n == 0 {
                    return Err(Error::message("connection refused"));
                }
                Ok(Arc::new(MockTransport {
                    calendars: vec![RemoteCalendar {
                        href: "/cal/a/".into(),
                        ..Default::default()
                    }],
                    ..Default::default()
                }) as SharedTransport)
            })
        })
    }

    #[tokio::test]
    async fn concurrent_first_calls_connect_once() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let session = Arc::new(counting_session(Arc::clone(&attempts), false));
        assert!(!session.is_connected());

        let calls = (0..8).map(|_| {
            let session = Arc::clone(&session);
            tokio::spawn(async move { session.list_calendars().await })
        });
        for result in futures::future::join_all(calls).await {
            assert_eq!(result.unwrap().unwrap().len(), 1);
        }

        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert!(session.is_connected());
    }

    #[tokio::test]
    async fn failed_connect_is_retried() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let session = counting_session(Arc::clone(&attempts), true);

        let err = session.list_calendars().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TransportFailure);
        assert!(!session.is_connected());

        assert_eq!(session.list_calendars().await.unwrap().len(), 1);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn missing_credentials_surface_on_first_use() {
        let session = LazySession::from_config(CalDavConfig::default());
        let err = session.list_calendars().await.unwrap_err();
        assert_eq!(err.to_string(), "CalDAV url is not configured");
    }
}
