//! Hyper-based transport.
//!
//! [`HyperClient`] owns a pooled hyper-util client over rustls. Tower layers
//! wrap it into one type-erased service, and every call works on its own clone
//! of that stack.

use std::collections::HashMap;
use std::error::Error as StdError;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};
use std::time::Duration;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper_rustls::HttpsConnector;
use hyper_util::{
    client::legacy::{Client, connect::HttpConnector},
    rt::TokioExecutor,
};
use tower::util::BoxCloneService;
use tower::{Layer, ServiceExt};
use tower_service::Service;

use crate::{
    Error, Request, Response, Result,
    config::{ClientConfig, ClientConfigBuilder},
    connector::https_connector,
    middleware::{FollowRedirectLayer, LoggingLayer},
};

/// Type-erased middleware stack over the transport.
pub type BoxedService = BoxCloneService<Request<Bytes>, Response<Bytes>, Error>;

/// Future returned by [`HyperClient`] as a tower service.
pub type ServiceFuture = Pin<Box<dyn Future<Output = Result<Response<Bytes>>> + Send + 'static>>;

/// Deferred layer: applied at build time, once the final config is known.
type LayerFn = Box<dyn Fn(BoxedService, &ClientConfig) -> BoxedService + Send + Sync>;

/// Stack prototype behind a mutex so the client is `Sync`.
///
/// The lock is held only long enough to clone the stack. The timeout bounds
/// the whole call, every redirect hop included.
#[derive(Clone)]
struct SharedStack {
    service: Arc<Mutex<BoxedService>>,
    timeout: Duration,
}

impl SharedStack {
    fn new(service: BoxedService, timeout: Duration) -> Self {
        Self {
            service: Arc::new(Mutex::new(service)),
            timeout,
        }
    }

    fn call(&self, request: Request<Bytes>) -> ServiceFuture {
        let service = self
            .service
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let timeout = self.timeout;

        Box::pin(async move {
            tokio::time::timeout(timeout, service.oneshot(request))
                .await
                .map_err(|_| Error::Timeout)?
        })
    }
}

// ============================================================================
// Connection pool
// ============================================================================

/// Innermost service: one hop over the pooled hyper client.
#[derive(Clone)]
struct Pool {
    hyper: Client<HttpsConnector<HttpConnector>, Full<Bytes>>,
}

impl Pool {
    fn new(config: &ClientConfig) -> Self {
        let hyper = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_idle_per_host)
            .build(https_connector(config.connect_timeout));

        Self { hyper }
    }

    /// Send one request and read the whole body.
    async fn send(self, request: Request<Bytes>) -> Result<Response<Bytes>> {
        let response = self
            .hyper
            .request(into_hyper(request)?)
            .await
            .map_err(transport_error)?;

        let (parts, body) = response.into_parts();
        let body = body
            .collect()
            .await
            .map_err(|e| Error::connection(e.to_string()))?
            .to_bytes();

        Ok(Response::new(
            parts.status.as_u16(),
            header_map(&parts.headers),
            body,
        ))
    }
}

impl Service<Request<Bytes>> for Pool {
    type Response = Response<Bytes>;
    type Error = Error;
    type Future = ServiceFuture;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request<Bytes>) -> Self::Future {
        Box::pin(self.clone().send(request))
    }
}

/// Convert a transport request into a hyper request.
fn into_hyper(request: Request<Bytes>) -> Result<http::Request<Full<Bytes>>> {
    let (method, url, headers, body) = request.into_parts();

    let builder = headers.iter().fold(
        http::Request::builder()
            .method(http::Method::from(method))
            .uri(url.as_str()),
        |builder, (name, value)| builder.header(name.as_str(), value.as_str()),
    );

    builder
        .body(body.map_or_else(Full::default, Full::new))
        .map_err(|e| Error::invalid_request(e.to_string()))
}

/// Response headers with a textual value; others are dropped.
fn header_map(headers: &http::HeaderMap) -> HashMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            let value = value.to_str().ok()?;
            Some((name.to_string(), value.to_string()))
        })
        .collect()
}

/// Map a hyper failure onto the transport error variants.
#[allow(clippy::needless_pass_by_value)]
fn transport_error(err: hyper_util::client::legacy::Error) -> Error {
    chain_error(&err)
}

/// Walk an error and all its sources.
///
/// An io `TimedOut` anywhere yields [`Error::Timeout`], a [`rustls::Error`]
/// anywhere yields [`Error::Tls`], anything else [`Error::Connection`]. The
/// message joins every level of the chain.
fn chain_error(err: &(dyn StdError + 'static)) -> Error {
    let mut message = String::new();
    let mut tls = false;

    let mut current = Some(err);
    while let Some(cause) = current {
        if let Some(io) = cause.downcast_ref::<std::io::Error>() {
            if io.kind() == std::io::ErrorKind::TimedOut {
                return Error::Timeout;
            }
            // io::Error::source skips its own payload, so inspect it here
            tls |= io.get_ref().is_some_and(|inner| inner.is::<rustls::Error>());
        }
        tls |= cause.is::<rustls::Error>();

        if !message.is_empty() {
            message.push_str(": ");
        }
        message.push_str(&cause.to_string());
        current = cause.source();
    }

    if tls {
        Error::tls(message)
    } else {
        Error::connection(message)
    }
}

// ============================================================================
// Public client
// ============================================================================

/// HTTP transport with connection pooling, rustls and tower middleware.
///
/// Cloning shares the pool and the middleware stack.
///
/// # Example
///
/// ```ignore
/// use raynet_client::HyperClient;
/// use std::time::Duration;
///
/// let client = HyperClient::builder()
///     .timeout(Duration::from_secs(20))
///     .with_follow_redirects()
///     .with_logging()
///     .build();
/// ```
#[derive(Clone)]
pub struct HyperClient {
    stack: SharedStack,
    config: ClientConfig,
}

impl std::fmt::Debug for HyperClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl HyperClient {
    /// Bare transport with the default configuration: no redirects, no logging.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(ClientConfig::default())
    }

    /// Bare transport with a custom configuration.
    #[must_use]
    pub fn with_config(config: ClientConfig) -> Self {
        Self::builder().config(config).build()
    }

    /// Create a new client builder.
    #[must_use]
    pub fn builder() -> HyperClientBuilder {
        HyperClientBuilder::default()
    }

    /// Configuration the transport was built with.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }
}

impl Default for HyperClient {
    fn default() -> Self {
        Self::new()
    }
}

impl raynet_core::HttpClient for HyperClient {
    async fn execute(&self, request: Request<Bytes>) -> Result<Response<Bytes>> {
        self.stack.call(request).await
    }
}

impl Service<Request<Bytes>> for HyperClient {
    type Response = Response<Bytes>;
    type Error = Error;
    type Future = ServiceFuture;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<()>> {
        // Readiness of the stack is awaited per call, on its own clone
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request<Bytes>) -> Self::Future {
        self.stack.call(request)
    }
}

/// Builder for [`HyperClient`].
///
/// Layers wrap the transport in the order they are added: the first one is
/// innermost, the last one sees the request first.
///
/// # Example
///
/// ```ignore
/// use raynet_client::HyperClient;
/// use raynet_client::middleware::LoggingLayer;
///
/// let client = HyperClient::builder()
///     .max_redirects(3)
///     .with_follow_redirects()
///     .layer(LoggingLayer::debug())
///     .build();
/// ```
#[derive(Default)]
pub struct HyperClientBuilder {
    config: ClientConfigBuilder,
    layers: Vec<LayerFn>,
}

impl std::fmt::Debug for HyperClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperClientBuilder")
            .field("config", &self.config)
            .field("layers_count", &self.layers.len())
            .finish()
    }
}

impl HyperClientBuilder {
    /// Replace the whole transport configuration.
    #[must_use]
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config.into();
        self
    }

    /// Overall timeout for one call, every redirect hop included.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.timeout(timeout);
        self
    }

    /// Connection timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.connect_timeout(timeout);
        self
    }

    /// Redirect limit used by [`with_follow_redirects`](Self::with_follow_redirects).
    #[must_use]
    pub fn max_redirects(mut self, max: usize) -> Self {
        self.config = self.config.max_redirects(max);
        self
    }

    /// Maximum idle connections per host.
    #[must_use]
    pub fn pool_idle_per_host(mut self, count: usize) -> Self {
        self.config = self.config.pool_idle_per_host(count);
        self
    }

    /// Idle connection timeout.
    #[must_use]
    pub fn pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.pool_idle_timeout(timeout);
        self
    }

    /// Add a Tower layer around the stack built so far.
    #[must_use]
    pub fn layer<L>(self, layer: L) -> Self
    where
        L: Layer<BoxedService> + Send + Sync + 'static,
        L::Service: Service<Request<Bytes>, Response = Response<Bytes>, Error = Error>
            + Clone
            + Send
            + 'static,
        <L::Service as Service<Request<Bytes>>>::Future: Send,
    {
        self.push(move |service, _| BoxCloneService::new(layer.layer(service)))
    }

    /// Log every exchange at info level.
    #[must_use]
    pub fn with_logging(self) -> Self {
        self.layer(LoggingLayer::new())
    }

    /// Log every exchange at debug level, with redacted headers.
    #[must_use]
    pub fn with_debug_logging(self) -> Self {
        self.layer(LoggingLayer::debug())
    }

    /// Follow 301, 302, 303, 307 and 308 up to the configured maximum.
    ///
    /// The limit is read when the client is built, so
    /// [`max_redirects`](Self::max_redirects) may come before or after.
    #[must_use]
    pub fn with_follow_redirects(self) -> Self {
        self.push(|service, config| {
            BoxCloneService::new(
                FollowRedirectLayer::with_max_redirects(config.max_redirects).layer(service),
            )
        })
    }

    fn push(
        mut self,
        layer: impl Fn(BoxedService, &ClientConfig) -> BoxedService + Send + Sync + 'static,
    ) -> Self {
        self.layers.push(Box::new(layer));
        self
    }

    /// Build the client.
    #[must_use]
    pub fn build(self) -> HyperClient {
        let config = self.config.build();

        let service = self
            .layers
            .iter()
            .fold(BoxCloneService::new(Pool::new(&config)), |service, layer| {
                layer(service, &config)
            });

        HyperClient {
            stack: SharedStack::new(service, config.timeout),
            config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_default() {
        let client = HyperClient::new();
        assert_eq!(client.config().timeout, Duration::from_secs(20));
        assert_eq!(client.config().connect_timeout, Duration::from_secs(5));
        assert_eq!(client.config().max_redirects, 10);
    }

    #[test]
    fn client_builder() {
        let client = HyperClient::builder()
            .timeout(Duration::from_secs(60))
            .pool_idle_per_host(16)
            .with_follow_redirects()
            .max_redirects(3)
            .build();

        assert_eq!(client.config().timeout, Duration::from_secs(60));
        assert_eq!(client.config().pool_idle_per_host, 16);
        assert_eq!(client.config().max_redirects, 3);
    }

    #[test]
    fn builder_accepts_whole_config() {
        let config = ClientConfig::builder()
            .timeout(Duration::from_secs(7))
            .connect_timeout(Duration::from_secs(1))
            .build();
        let client = HyperClient::builder().config(config).build();

        assert_eq!(client.config().timeout, Duration::from_secs(7));
        assert_eq!(client.config().connect_timeout, Duration::from_secs(1));
    }

    #[test]
    fn builder_debug_counts_layers() {
        let builder = HyperClient::builder().with_follow_redirects().with_logging();
        let debug = format!("{builder:?}");
        assert!(debug.contains("layers_count: 2"));
    }

    #[test]
    fn invalid_header_value_is_invalid_request() {
        let url = url::Url::parse("https://app.raynet.cz/api/v2/").expect("url");
        let request = Request::builder(raynet_core::Method::Get, url)
            .header("X-Instance-Name", "bad\nvalue")
            .build();

        let err = into_hyper(request).expect_err("invalid header");
        assert!(matches!(err, Error::InvalidRequest(_)));
    }

    #[test]
    fn hyper_request_carries_method_headers_and_body() {
        let url = url::Url::parse("https://app.raynet.cz/api/v2/company/").expect("url");
        let request = Request::builder(raynet_core::Method::Put, url)
            .header("X-Instance-Name", "acme")
            .body(Bytes::from_static(b"{}"))
            .build();

        let hyper_request = into_hyper(request).expect("valid request");
        assert_eq!(hyper_request.method(), http::Method::PUT);
        assert_eq!(
            hyper_request.uri().to_string(),
            "https://app.raynet.cz/api/v2/company/"
        );
        assert_eq!(
            hyper_request
                .headers()
                .get("x-instance-name")
                .and_then(|v| v.to_str().ok()),
            Some("acme")
        );
    }

    #[test]
    fn header_map_skips_opaque_values() {
        let mut headers = http::HeaderMap::new();
        headers.insert("content-type", http::HeaderValue::from_static("application/json"));
        headers.insert(
            "x-binary",
            http::HeaderValue::from_bytes(b"\xfa\xfb").expect("opaque header"),
        );

        let map = header_map(&headers);
        assert_eq!(map.get("content-type").map(String::as_str), Some("application/json"));
        assert!(!map.contains_key("x-binary"));
    }

    #[tokio::test]
    async fn timeout_bounds_every_redirect_hop() {
        let hop = tower::service_fn(|request: Request<Bytes>| async move {
            tokio::time::sleep(Duration::from_millis(60)).await;
            let next = request.url().path().len();
            let response = if next < 6 {
                let location = format!("{}x", request.url().path());
                let headers = HashMap::from([("location".to_string(), location)]);
                Response::new(302, headers, Bytes::new())
            } else {
                Response::new(200, HashMap::new(), Bytes::from_static(b"{}"))
            };
            Ok::<_, Error>(response)
        });
        let service = BoxCloneService::new(FollowRedirectLayer::new().layer(hop));
        let stack = SharedStack::new(service, Duration::from_millis(150));

        let url = url::Url::parse("https://app.raynet.cz/x").expect("url");
        let request = Request::builder(raynet_core::Method::Get, url).build();

        let err = stack.call(request).await.expect_err("slow redirect chain");
        assert!(err.is_timeout());
    }

    #[derive(Debug)]
    struct Wrapped(std::io::Error);

    impl std::fmt::Display for Wrapped {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("client error (Connect)")
        }
    }

    impl StdError for Wrapped {
        fn source(&self) -> Option<&(dyn StdError + 'static)> {
            Some(&self.0)
        }
    }

    #[test]
    fn rustls_error_in_chain_is_tls() {
        let handshake = std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            rustls::Error::InvalidCertificate(rustls::CertificateError::UnknownIssuer),
        );

        let err = chain_error(&Wrapped(handshake));
        assert!(matches!(err, Error::Tls(_)));
    }

    #[test]
    fn tls_words_in_message_are_not_tls() {
        let refused = std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "tcp connect error: ssl-gateway.tls.example:443 refused (certificate pending)",
        );

        let err = chain_error(&Wrapped(refused));
        assert!(matches!(err, Error::Connection(_)));
        assert!(err.to_string().contains("ssl-gateway"));
    }

    #[test]
    fn timed_out_io_in_chain_is_timeout() {
        let err = chain_error(&Wrapped(std::io::Error::from(std::io::ErrorKind::TimedOut)));
        assert!(err.is_timeout());
    }
}
