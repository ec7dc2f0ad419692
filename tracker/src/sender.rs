//! Delivery of telemetry to the ingestion service.
//!
//! This module provides:
//!
//! - [`Endpoint`]: the four ingestion routes, relative to a base URL
//! - [`Transport`]: the seam between the tracker and the network
//! - [`HttpTransport`]: pooled `reqwest` client sending JSON bodies
//! - [`MemoryTransport`]: records requests in memory, for offline use and tests
//! - [`Dispatcher`]: issues sends whose outcome is discarded
//!
//! Delivery is best-effort. A failed send is logged at debug level and the
//! payload is dropped: nothing is retried or re-queued.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use pulsetrail_tracker::sender::{Dispatcher, Endpoint, HttpTransport};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() {
//!     let transport = HttpTransport::new(
//!         "https://app.example.com/api/events",
//!         "kiosk-7",
//!         Duration::from_secs(10),
//!     )
//!     .unwrap();
//!
//!     let dispatcher = Dispatcher::new(Arc::new(transport));
//!     dispatcher.send_and_forget(Endpoint::Session, json!({"event": "start"}));
//! }
//! ```

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::Client;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, trace};

/// Header carrying the client identifier.
pub const SOURCE_ID_HEADER: &str = "X-Source-Id";

/// Default HTTP request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors that can occur while delivering a payload.
#[derive(Error, Debug)]
pub enum TransportError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The ingestion service answered with a non-success status.
    #[error("{endpoint} endpoint returned status {status}")]
    Status { status: u16, endpoint: String },

    /// The base URL cannot be used to build request URLs.
    #[error("invalid base URL '{0}'")]
    InvalidBaseUrl(String),

    /// The source identifier is not a valid header value.
    #[error("invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),

    /// The transport was told to refuse every send.
    #[error("transport unavailable")]
    Unavailable,
}

/// Ingestion routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Batch,
    Session,
    PageView,
    Error,
}

impl Endpoint {
    /// Path segment appended to the base URL.
    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            Self::Batch => "batch",
            Self::Session => "session",
            Self::PageView => "page-view",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Something that can carry a JSON body to an ingestion route.
///
/// Returned futures own everything they need, so callers may spawn them.
pub trait Transport: Send + Sync {
    /// Sends `body` to `endpoint`.
    fn post(
        &self,
        endpoint: Endpoint,
        body: Value,
    ) -> BoxFuture<'static, Result<(), TransportError>>;

    /// Sends `body` on the teardown path.
    ///
    /// The default delegates to [`Transport::post`]; callers bound it with a
    /// timeout either way.
    fn beacon(
        &self,
        endpoint: Endpoint,
        body: Value,
    ) -> BoxFuture<'static, Result<(), TransportError>> {
        self.post(endpoint, body)
    }
}

/// Transport backed by a pooled `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base: String,
}

impl HttpTransport {
    /// Creates a transport posting under `base` (e.g., `https://host/api/events`).
    ///
    /// # Errors
    ///
    /// Returns `TransportError` if the base URL is not absolute, the source
    /// id is not a valid header value, or the client cannot be built.
    pub fn new(
        base: impl Into<String>,
        source_id: &str,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let base = base.into();
        if reqwest::Url::parse(&base).is_err() {
            return Err(TransportError::InvalidBaseUrl(base));
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(SOURCE_ID_HEADER, HeaderValue::from_str(source_id)?);

        let client = Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(4)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base: base.trim_end_matches('/').to_string(),
        })
    }

    /// Full URL of `endpoint`.
    #[must_use]
    pub fn url(&self, endpoint: Endpoint) -> String {
        format!("{}/{}", self.base, endpoint.path())
    }
}

impl Transport for HttpTransport {
    fn post(
        &self,
        endpoint: Endpoint,
        body: Value,
    ) -> BoxFuture<'static, Result<(), TransportError>> {
        let request = self.client.post(self.url(endpoint)).json(&body);

        async move {
            let response = request.send().await?;
            let status = response.status();
            if status.is_success() {
                trace!(%endpoint, status = status.as_u16(), "Payload delivered");
                Ok(())
            } else {
                Err(TransportError::Status {
                    status: status.as_u16(),
                    endpoint: endpoint.to_string(),
                })
            }
        }
        .boxed()
    }
}

/// A request captured by [`MemoryTransport`].
#[derive(Debug, Clone, PartialEq)]
pub struct Recorded {
    pub endpoint: Endpoint,
    pub body: Value,
}

/// Transport that records every request instead of sending it.
///
/// Clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    requests: Arc<Mutex<Vec<Recorded>>>,
    failing: Arc<Mutex<bool>>,
}

impl MemoryTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent send fail with [`TransportError::Unavailable`].
    /// Failed sends are not recorded.
    pub fn set_failing(&self, failing: bool) {
        if let Ok(mut flag) = self.failing.lock() {
            *flag = failing;
        }
    }

    /// Snapshot of every recorded request, oldest first.
    #[must_use]
    pub fn requests(&self) -> Vec<Recorded> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }

    /// Bodies of the recorded requests to `endpoint`, oldest first.
    #[must_use]
    pub fn requests_to(&self, endpoint: Endpoint) -> Vec<Value> {
        self.requests()
            .into_iter()
            .filter(|r| r.endpoint == endpoint)
            .map(|r| r.body)
            .collect()
    }

    fn record(&self, endpoint: Endpoint, body: Value) -> Result<(), TransportError> {
        if self.failing.lock().map(|f| *f).unwrap_or(false) {
            return Err(TransportError::Unavailable);
        }
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(Recorded { endpoint, body });
        }
        Ok(())
    }
}

impl Transport for MemoryTransport {
    fn post(
        &self,
        endpoint: Endpoint,
        body: Value,
    ) -> BoxFuture<'static, Result<(), TransportError>> {
        futures::future::ready(self.record(endpoint, body)).boxed()
    }
}

/// Issues sends on behalf of the event loop.
#[derive(Clone)]
pub struct Dispatcher {
    transport: Arc<dyn Transport>,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher").finish_non_exhaustive()
    }
}

impl Dispatcher {
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Spawns a send and discards its outcome.
    ///
    /// Failures are logged at debug level and the payload is lost. Must be
    /// called from within a Tokio runtime.
    pub fn send_and_forget(&self, endpoint: Endpoint, body: Value) {
        let send = self.transport.post(endpoint, body);
        tokio::spawn(discard_outcome(endpoint, send));
    }

    /// Sends on the teardown path and waits at most `timeout` for it.
    ///
    /// Returns `true` if the send completed successfully within the bound.
    pub async fn beacon(&self, endpoint: Endpoint, body: Value, timeout: Duration) -> bool {
        let send = self.transport.beacon(endpoint, body);
        match tokio::time::timeout(timeout, send).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                debug!(%endpoint, error = %e, "Teardown send failed");
                false
            }
            Err(_) => {
                debug!(%endpoint, "Teardown send timed out");
                false
            }
        }
    }

    /// Sends and waits at most `timeout`, discarding the outcome.
    pub async fn send_bounded(&self, endpoint: Endpoint, body: Value, timeout: Duration) -> bool {
        let send = self.transport.post(endpoint, body);
        match tokio::time::timeout(timeout, send).await {
            Ok(result) => {
                let delivered = result.is_ok();
                log_outcome(endpoint, result);
                delivered
            }
            Err(_) => {
                debug!(%endpoint, "Send timed out");
                false
            }
        }
    }
}

/// Awaits a send and drops its result after logging a failure.
pub async fn discard_outcome(
    endpoint: Endpoint,
    send: BoxFuture<'static, Result<(), TransportError>>,
) {
    log_outcome(endpoint, send.await);
}

fn log_outcome(endpoint: Endpoint, result: Result<(), TransportError>) {
    if let Err(e) = result {
        debug!(%endpoint, error = %e, "Send failed, payload dropped");
    }
}
