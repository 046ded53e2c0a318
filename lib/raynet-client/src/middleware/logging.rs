//! Exchange logging middleware.
//!
//! Each exchange runs inside a `raynet_http` span that records the method, the
//! URL and the tenant instance. The `Authorization` header never reaches the
//! log, whatever the level.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use bytes::Bytes;
use tower::{Layer, Service};
use tracing::{Instrument, debug, info, info_span, warn};

use crate::{Error, INSTANCE_HEADER, Request, Response, Result};

/// How much of an exchange gets logged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug events with redacted headers and payload sizes.
    Debug,
    /// One info event per request and per outcome.
    #[default]
    Info,
}

/// Layer that logs every exchange through `tracing`.
///
/// # Example
///
/// ```ignore
/// use raynet_client::middleware::LoggingLayer;
/// use tower::ServiceBuilder;
///
/// let service = ServiceBuilder::new()
///     .layer(LoggingLayer::debug())
///     .service(client);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingLayer {
    level: LogLevel,
}

impl LoggingLayer {
    /// Info-level logging.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Debug-level logging.
    #[must_use]
    pub fn debug() -> Self {
        Self {
            level: LogLevel::Debug,
        }
    }

    /// Level this layer logs at.
    #[must_use]
    pub const fn level(&self) -> LogLevel {
        self.level
    }
}

impl<S> Layer<S> for LoggingLayer {
    type Service = Logging<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Logging {
            inner,
            level: self.level,
        }
    }
}

/// Service produced by [`LoggingLayer`].
#[derive(Debug, Clone)]
pub struct Logging<S> {
    inner: S,
    level: LogLevel,
}

/// Headers in a stable order, with credentials masked.
fn redacted_headers(headers: &HashMap<String, String>) -> BTreeMap<&str, &str> {
    headers
        .iter()
        .map(|(name, value)| {
            let value = if name.eq_ignore_ascii_case("authorization") {
                "<redacted>"
            } else {
                value.as_str()
            };
            (name.as_str(), value)
        })
        .collect()
}

fn log_request(level: LogLevel, request: &Request<Bytes>) {
    match level {
        LogLevel::Debug => debug!(
            headers = ?redacted_headers(request.headers()),
            body_len = request.body().map_or(0, Bytes::len),
            "sending request"
        ),
        LogLevel::Info => info!("sending request"),
    }
}

fn log_outcome(level: LogLevel, outcome: &Result<Response<Bytes>>, elapsed_ms: u64) {
    match outcome {
        Ok(response) if response.is_success() => match level {
            LogLevel::Debug => debug!(
                status = response.status(),
                body_len = response.body().len(),
                elapsed_ms,
                "request completed"
            ),
            LogLevel::Info => info!(status = response.status(), elapsed_ms, "request completed"),
        },
        // Classification happens upstream; here a non-2xx is only worth a warning
        Ok(response) => warn!(
            status = response.status(),
            elapsed_ms,
            "request completed with HTTP error status"
        ),
        Err(err) => warn!(error = %err, elapsed_ms, "request failed"),
    }
}

impl<S> Service<Request<Bytes>> for Logging<S>
where
    S: Service<Request<Bytes>, Response = Response<Bytes>, Error = Error> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response<Bytes>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<()>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<Bytes>) -> Self::Future {
        let span = info_span!(
            "raynet_http",
            method = %request.method(),
            url = %request.url(),
            instance = request.header(INSTANCE_HEADER).unwrap_or("-"),
        );
        let level = self.level;
        let mut inner = self.inner.clone();

        Box::pin(
            async move {
                log_request(level, &request);
                let start = Instant::now();

                let outcome = inner.call(request).await;

                let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
                log_outcome(level, &outcome, elapsed_ms);

                outcome
            }
            .instrument(span),
        )
    }
}
