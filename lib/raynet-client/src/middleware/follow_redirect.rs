//! Follow redirect middleware.
//!
//! This middleware follows HTTP redirects (3xx responses with a `Location`
//! header), resolving relative locations against the current URL. Credentials
//! are only forwarded while the redirect stays on the same origin.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use tower::{Layer, Service};
use tracing::debug;
use url::Url;

use crate::{Error, Method, Request, Response, Result};

pub use crate::config::DEFAULT_MAX_REDIRECTS;

/// Layer that follows HTTP redirects.
///
/// # Example
///
/// ```ignore
/// use raynet_client::middleware::FollowRedirectLayer;
/// use tower::ServiceBuilder;
///
/// let service = ServiceBuilder::new()
///     .layer(FollowRedirectLayer::new())
///     .service(client);
/// ```
#[derive(Debug, Clone)]
pub struct FollowRedirectLayer {
    max_redirects: usize,
}

impl Default for FollowRedirectLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl FollowRedirectLayer {
    /// Create a new follow redirect layer with default max redirects (10).
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_redirects: DEFAULT_MAX_REDIRECTS,
        }
    }

    /// Create a new follow redirect layer with a custom max redirects.
    #[must_use]
    pub fn with_max_redirects(max_redirects: usize) -> Self {
        Self { max_redirects }
    }
}

impl<S> Layer<S> for FollowRedirectLayer {
    type Service = FollowRedirect<S>;

    fn layer(&self, inner: S) -> Self::Service {
        FollowRedirect {
            inner,
            max_redirects: self.max_redirects,
        }
    }
}

/// Service that follows HTTP redirects.
#[derive(Debug, Clone)]
pub struct FollowRedirect<S> {
    inner: S,
    max_redirects: usize,
}

/// Check if a status code is a redirect.
fn is_redirect(status: u16) -> bool {
    matches!(status, 301 | 302 | 303 | 307 | 308)
}

/// Determine the method for the redirected request.
///
/// - 303: switch to GET
/// - 301, 302: switch a POST to GET, keep any other method
/// - 307, 308: keep the original method
fn redirect_method(status: u16, original: Method) -> Method {
    match (status, original) {
        (303, _) | (301 | 302, Method::Post) => Method::Get,
        _ => original,
    }
}

/// Resolve a redirect Location URL relative to the original request URL.
fn resolve_redirect_url(base_url: &Url, location: &str) -> Result<Url> {
    // Try parsing as absolute URL first
    if let Ok(url) = Url::parse(location) {
        return Ok(url);
    }

    base_url.join(location).map_err(Error::InvalidUrl)
}

impl<S> Service<Request<Bytes>> for FollowRedirect<S>
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
        let mut inner = self.inner.clone();
        let max_redirects = self.max_redirects;

        Box::pin(async move {
            let mut current_request = request;
            let mut redirects = 0;

            loop {
                let response = inner.call(current_request.clone()).await?;

                if !is_redirect(response.status()) {
                    return Ok(response);
                }

                if redirects >= max_redirects {
                    return Err(Error::TooManyRedirects {
                        count: redirects,
                        max: max_redirects,
                    });
                }

                let location = response.header("location").ok_or_else(|| {
                    Error::InvalidRedirect("redirect response missing Location header".into())
                })?;

                let new_url = resolve_redirect_url(current_request.url(), location)?;
                let new_method = redirect_method(response.status(), current_request.method());
                let same_origin = new_url.origin() == current_request.url().origin();

                debug!(
                    status = response.status(),
                    location = %new_url,
                    same_origin,
                    "following redirect"
                );

                let (_, _, mut headers, body) = current_request.into_parts();
                if !same_origin {
                    headers.retain(|name, _| !name.eq_ignore_ascii_case("authorization"));
                }

                // A method switched to GET drops the payload and its content type
                let body = if new_method == Method::Get {
                    headers.retain(|name, _| !name.eq_ignore_ascii_case("content-type"));
                    None
                } else {
                    body
                };

                let builder = Request::builder(new_method, new_url).headers(headers);
                current_request = match body {
                    Some(body) => builder.body(body).build(),
                    None => builder.build(),
                };

                redirects += 1;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use tower::ServiceExt;

    use super::*;

    #[test]
    fn default_max_redirects() {
        let layer = FollowRedirectLayer::new();
        assert_eq!(layer.max_redirects, DEFAULT_MAX_REDIRECTS);
    }

    #[test]
    fn custom_max_redirects() {
        let layer = FollowRedirectLayer::with_max_redirects(5);
        assert_eq!(layer.max_redirects, 5);
    }

    #[test]
    fn is_redirect_statuses() {
        for status in [301, 302, 303, 307, 308] {
            assert!(is_redirect(status));
        }
        for status in [200, 300, 304, 404, 500] {
            assert!(!is_redirect(status));
        }
    }

    #[test]
    fn redirect_method_rules() {
        assert_eq!(redirect_method(301, Method::Post), Method::Get);
        assert_eq!(redirect_method(302, Method::Post), Method::Get);
        assert_eq!(redirect_method(301, Method::Put), Method::Put);
        assert_eq!(redirect_method(302, Method::Delete), Method::Delete);
        assert_eq!(redirect_method(302, Method::Patch), Method::Patch);
        assert_eq!(redirect_method(303, Method::Put), Method::Get);
        assert_eq!(redirect_method(307, Method::Post), Method::Post);
        assert_eq!(redirect_method(308, Method::Patch), Method::Patch);
    }

    #[test]
    fn resolve_absolute_url() {
        let base = Url::parse("https://app.raynet.cz/api/v2/company/").expect("base url");
        let result = resolve_redirect_url(&base, "https://eu.raynet.cz/api/v2/company/")
            .expect("resolve");
        assert_eq!(result.as_str(), "https://eu.raynet.cz/api/v2/company/");
    }

    #[test]
    fn resolve_relative_url() {
        let base = Url::parse("https://app.raynet.cz/api/v2/company/").expect("base url");
        let result = resolve_redirect_url(&base, "/api/v2/person/").expect("resolve");
        assert_eq!(result.as_str(), "https://app.raynet.cz/api/v2/person/");
    }

    type Seen = Arc<Mutex<Vec<(String, Option<String>)>>>;

    /// Inner service: `app.raynet.cz` redirects to `location`, anything else answers 200.
    fn redirecting_service(
        status: u16,
        location: &'static str,
        seen: Seen,
    ) -> impl Service<
        Request<Bytes>,
        Response = Response<Bytes>,
        Error = Error,
        Future = impl Future<Output = Result<Response<Bytes>>> + Send,
    > + Clone
    + Send
    + 'static {
        tower::service_fn(move |request: Request<Bytes>| {
            let seen = Arc::clone(&seen);
            async move {
                let first_hop = request.url().path() == "/start";
                seen.lock().expect("lock").push((
                    request.url().to_string(),
                    request.header("Authorization").map(str::to_string),
                ));
                let response = if first_hop {
                    let headers = HashMap::from([("location".to_string(), location.to_string())]);
                    Response::new(status, headers, Bytes::new())
                } else {
                    Response::new(200, HashMap::new(), Bytes::from_static(b"{}"))
                };
                Ok::<_, Error>(response)
            }
        })
    }

    fn start_request() -> Request<Bytes> {
        let url = Url::parse("https://app.raynet.cz/start").expect("url");
        Request::builder(Method::Post, url)
            .header("Authorization", "Basic dXNlcjpwYXNz")
            .header("Content-Type", "application/json")
            .body(Bytes::from_static(b"{\"a\":1}"))
            .build()
    }

    #[tokio::test]
    async fn keeps_authorization_on_same_origin() {
        let seen: Seen = Arc::default();
        let service = FollowRedirectLayer::new().layer(redirecting_service(
            307,
            "/next",
            Arc::clone(&seen),
        ));

        let response = service.oneshot(start_request()).await.expect("response");
        assert_eq!(response.status(), 200);

        let seen = seen.lock().expect("lock");
        assert_eq!(seen.len(), 2);
        assert_eq!(
            seen.get(1).and_then(|(_, auth)| auth.as_deref()),
            Some("Basic dXNlcjpwYXNz")
        );
    }

    #[tokio::test]
    async fn drops_authorization_on_cross_origin() {
        let seen: Seen = Arc::default();
        let service = FollowRedirectLayer::new().layer(redirecting_service(
            302,
            "https://files.example.com/export.csv",
            Arc::clone(&seen),
        ));

        service.oneshot(start_request()).await.expect("response");

        let seen = seen.lock().expect("lock");
        let (url, auth) = seen.get(1).expect("second hop");
        assert_eq!(url, "https://files.example.com/export.csv");
        assert_eq!(auth, &None);
    }

    #[tokio::test]
    async fn moved_put_keeps_method_and_body() {
        let hops: Arc<Mutex<Vec<(Method, Option<Bytes>, Option<String>)>>> = Arc::default();
        let inner = tower::service_fn({
            let hops = Arc::clone(&hops);
            move |request: Request<Bytes>| {
                let hops = Arc::clone(&hops);
                async move {
                    let first_hop = request.url().path() == "/start";
                    hops.lock().expect("lock").push((
                        request.method(),
                        request.body().cloned(),
                        request.header("Content-Type").map(str::to_string),
                    ));
                    let response = if first_hop {
                        let headers =
                            HashMap::from([("location".to_string(), "/moved".to_string())]);
                        Response::new(301, headers, Bytes::new())
                    } else {
                        Response::new(201, HashMap::new(), Bytes::from_static(b"{}"))
                    };
                    Ok::<_, Error>(response)
                }
            }
        });
        let service = FollowRedirectLayer::new().layer(inner);

        let url = Url::parse("https://app.raynet.cz/start").expect("url");
        let request = Request::builder(Method::Put, url)
            .header("Content-Type", "application/json")
            .body(Bytes::from_static(b"{\"name\":\"Acme\"}"))
            .build();

        let response = service.oneshot(request).await.expect("response");
        assert_eq!(response.status(), 201);

        let hops = hops.lock().expect("lock");
        let (method, body, content_type) = hops.get(1).expect("second hop");
        assert_eq!(*method, Method::Put);
        assert_eq!(body.as_deref(), Some(&b"{\"name\":\"Acme\"}"[..]));
        assert_eq!(content_type.as_deref(), Some("application/json"));
    }

    #[tokio::test]
    async fn missing_location_is_invalid_redirect() {
        let inner = tower::service_fn(|_request: Request<Bytes>| async {
            Ok::<_, Error>(Response::new(302, HashMap::new(), Bytes::new()))
        });
        let service = FollowRedirectLayer::new().layer(inner);

        let err = service.oneshot(start_request()).await.expect_err("no location");
        assert!(matches!(err, Error::InvalidRedirect(_)));
    }

    #[tokio::test]
    async fn redirect_loop_hits_limit() {
        let inner = tower::service_fn(|_request: Request<Bytes>| async {
            let headers = HashMap::from([("location".to_string(), "/start".to_string())]);
            Ok::<_, Error>(Response::new(302, headers, Bytes::new()))
        });
        let service = FollowRedirectLayer::with_max_redirects(2).layer(inner);

        let err = service.oneshot(start_request()).await.expect_err("loop");
        assert!(matches!(err, Error::TooManyRedirects { count: 2, max: 2 }));
    }
}
