//! The Raynet request dispatcher.
//!
//! [`RaynetClient`] owns the credentials and a transport. Each
//! [`dispatch`](RaynetClient::dispatch) runs one request/response cycle:
//! resolve the URL, stamp the identifying headers, encode the payload,
//! transmit, then hand the raw response to [`classify`].

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::{
    ApiCall, ClientConfig, ClientConfigBuilder, Credentials, HttpClient, HyperClient, JsonMap,
    Request, Result, classify, from_value,
    middleware::LoggingLayer,
};

/// Default API origin.
pub const RAYNET_ORIGIN: &str = "https://app.raynet.cz/";

/// `User-Agent` sent when none is configured.
pub const DEFAULT_USER_AGENT: &str = concat!("raynet-client/", env!("CARGO_PKG_VERSION"));

/// Authenticated client for the Raynet CRM REST API.
///
/// Cheap to clone; clones share the transport and its connection pool.
///
/// # Example
///
/// ```ignore
/// use raynet_client::{ApiCall, Credentials, RaynetClient};
///
/// let client = RaynetClient::new(Credentials::new("user@acme.cz", "api-key", "acme"))?;
/// let companies = client
///     .dispatch(ApiCall::get("api/v2/company/").param("limit", "5"))
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct RaynetClient<C = HyperClient> {
    client: C,
    base_url: Url,
    credentials: Credentials,
    user_agent: Arc<str>,
}

impl RaynetClient<HyperClient> {
    /// Client against the public API origin with the default transport.
    ///
    /// # Errors
    ///
    /// Returns an error if the default origin cannot be parsed.
    pub fn new(credentials: Credentials) -> Result<Self> {
        Self::builder(credentials).build()
    }

    /// Builder for a client backed by [`HyperClient`].
    #[must_use]
    pub fn builder(credentials: Credentials) -> RaynetClientBuilder {
        RaynetClientBuilder::new(credentials)
    }
}

impl<C> RaynetClient<C> {
    /// Client over any transport, against the public API origin.
    ///
    /// # Errors
    ///
    /// Returns an error if the default origin cannot be parsed.
    pub fn with_client(client: C, credentials: Credentials) -> Result<Self> {
        Ok(Self::with_url(client, Url::parse(RAYNET_ORIGIN)?, credentials))
    }

    /// Client over any transport, against a custom base URL.
    ///
    /// A missing trailing `/` is added so relative paths append to the base
    /// instead of replacing its last segment.
    #[must_use]
    pub fn with_url(client: C, base_url: Url, credentials: Credentials) -> Self {
        Self {
            client,
            base_url: normalize_base_url(base_url),
            credentials,
            user_agent: Arc::from(DEFAULT_USER_AGENT),
        }
    }

    /// Replace the `User-Agent` value.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl AsRef<str>) -> Self {
        self.user_agent = Arc::from(user_agent.as_ref());
        self
    }

    /// Credentials stamped on every request.
    #[must_use]
    pub const fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Base URL every path is resolved against.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `User-Agent` sent on every request.
    #[must_use]
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Underlying transport.
    #[must_use]
    pub const fn inner(&self) -> &C {
        &self.client
    }

    /// Consume the dispatcher and return the transport.
    #[must_use]
    pub fn into_inner(self) -> C {
        self.client
    }

    /// Absolute URL for a relative API path.
    ///
    /// The path is appended to the base URL as text, so it always stays under
    /// the base origin: `https://other.host/x` or `scheme:rest` become path
    /// segments, never a new target.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrl`](crate::Error::InvalidUrl) if the result is
    /// not a valid URL.
    pub fn resolve(&self, path: &str) -> Result<Url> {
        Ok(Url::parse(&format!(
            "{}{}",
            self.base_url,
            path.trim_start_matches('/')
        ))?)
    }

    /// Transport request for a call: URL, identifying headers and payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the payload cannot be encoded.
    pub fn build_request(&self, call: &ApiCall) -> Result<Request<Bytes>> {
        let url = self.resolve(call.path())?;

        if call.has_conflicting_payload() {
            warn!(
                method = %call.method(),
                path = call.path(),
                "call has both a body and params; only the params are sent"
            );
        }

        let builder = Request::builder(call.method(), url)
            .header("User-Agent", self.user_agent.as_ref())
            .header("Accept", "application/json")
            .headers(self.credentials.headers());

        let request = match call.payload()? {
            Some((content_type, body)) => builder.payload(content_type, body).build(),
            None => builder.build(),
        };

        Ok(request)
    }
}

impl<C: HttpClient> RaynetClient<C> {
    /// Run one call and classify the response.
    ///
    /// Returns the decoded JSON object (empty when the response had no usable
    /// body) or exactly one [`Error`](crate::Error).
    ///
    /// # Errors
    ///
    /// Returns a transport error if no response was received, otherwise the
    /// error [`classify`] assigns to the response.
    pub async fn dispatch(&self, call: ApiCall) -> Result<JsonMap> {
        let request = self.build_request(&call)?;
        let response = self.client.execute(request).await?;
        let outcome = classify(&response);

        match &outcome {
            Ok(map) => debug!(
                method = %call.method(),
                path = call.path(),
                status = response.status(),
                fields = map.len(),
                "call succeeded"
            ),
            Err(err) => debug!(
                method = %call.method(),
                path = call.path(),
                status = response.status(),
                error = %err,
                "call failed"
            ),
        }

        outcome
    }

    /// Run one call and decode the resulting object into `T`.
    ///
    /// # Errors
    ///
    /// Same as [`dispatch`](Self::dispatch), plus
    /// [`Error::JsonDeserialization`](crate::Error::JsonDeserialization) with
    /// the failing field path when the object does not match `T`.
    pub async fn dispatch_as<T: DeserializeOwned>(&self, call: ApiCall) -> Result<T> {
        let map = self.dispatch(call).await?;
        from_value(Value::Object(map))
    }
}

/// Base URL ready for path concatenation: no query or fragment, trailing `/`.
fn normalize_base_url(mut url: Url) -> Url {
    url.set_query(None);
    url.set_fragment(None);
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

/// Builder for a [`RaynetClient`] over [`HyperClient`].
///
/// The transport it builds follows redirects and logs every exchange through
/// [`LoggingLayer`].
#[derive(Debug, Clone)]
pub struct RaynetClientBuilder {
    credentials: Credentials,
    base_url: Option<String>,
    user_agent: Option<String>,
    config: ClientConfigBuilder,
    debug_logging: bool,
}

impl RaynetClientBuilder {
    /// Builder with default settings for the given credentials.
    #[must_use]
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            base_url: None,
            user_agent: None,
            config: ClientConfigBuilder::default(),
            debug_logging: false,
        }
    }

    /// Override the API origin (tests, proxies).
    #[must_use]
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Override the `User-Agent` header.
    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Replace the whole transport configuration.
    #[must_use]
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config.into();
        self
    }

    /// Overall timeout for one call, redirects included.
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

    /// Maximum redirects followed before failing.
    #[must_use]
    pub fn max_redirects(mut self, max: usize) -> Self {
        self.config = self.config.max_redirects(max);
        self
    }

    /// Log exchanges at debug level, headers included (credentials redacted).
    #[must_use]
    pub const fn with_debug_logging(mut self) -> Self {
        self.debug_logging = true;
        self
    }

    /// Build the client.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrl`](crate::Error::InvalidUrl) if the base URL
    /// cannot be parsed.
    pub fn build(self) -> Result<RaynetClient<HyperClient>> {
        let base_url = Url::parse(self.base_url.as_deref().unwrap_or(RAYNET_ORIGIN))?;

        let logging = if self.debug_logging {
            LoggingLayer::debug()
        } else {
            LoggingLayer::new()
        };

        // Redirects inside, logging outside: one span per dispatched call
        let client = HyperClient::builder()
            .config(self.config.build())
            .with_follow_redirects()
            .layer(logging)
            .build();

        let dispatcher = RaynetClient::with_url(client, base_url, self.credentials);
        Ok(match self.user_agent {
            Some(user_agent) => dispatcher.with_user_agent(user_agent),
            None => dispatcher,
        })
    }
}
