//! Error types for the Raynet client.
//!
//! The first group of variants is the API taxonomy produced by
//! [`classify`](crate::classify): every failed response maps to exactly one of
//! them. The second group covers everything that goes wrong before a response
//! exists (building, encoding, connecting, redirecting) plus typed decoding of
//! a successful payload.

use derive_more::{Display, Error, From};

use crate::JsonMap;

// ============================================================================
// Error Type
// ============================================================================

/// Main error type for Raynet operations.
#[derive(Debug, Display, Error, From)]
pub enum Error {
    /// HTTP 404 for a resource that does not exist.
    #[display("resource not found")]
    #[from(skip)]
    NotFound,

    /// HTTP 404 where the API reports that the instance itself is unknown.
    #[display("instance not found")]
    #[from(skip)]
    InstanceNotFound,

    /// HTTP 401, the username/API key pair was rejected.
    #[display("invalid authorization")]
    #[from(skip)]
    InvalidAuthorization,

    /// HTTP 400 carrying the provider's error message or the raw body.
    #[display("request error: {_0}")]
    #[from(skip)]
    RequestError(#[error(not(source))] String),

    /// The API refused the call because the request quota is exhausted.
    #[display("request limit reached")]
    #[from(skip)]
    RequestLimitReached,

    /// The body reported `success` as falsy without a more specific signal.
    #[display("API reported an unsuccessful result")]
    #[from(skip)]
    AnotherError {
        /// Entire decoded response body.
        #[error(not(source))]
        body: JsonMap,
    },

    /// A non-2xx status that no classification rule recognised.
    #[display("unexpected HTTP status {status}")]
    #[from(skip)]
    UnexpectedStatus {
        /// HTTP status code.
        status: u16,
        /// Raw response body, decoded lossily as UTF-8.
        #[error(not(source))]
        body: String,
    },

    /// Network/connection errors.
    #[display("connection error: {_0}")]
    #[from(skip)]
    Connection(#[error(not(source))] String),

    /// TLS/SSL errors.
    #[display("TLS error: {_0}")]
    #[from(skip)]
    Tls(#[error(not(source))] String),

    /// Connect or overall request timeout.
    #[display("request timeout")]
    #[from(skip)]
    Timeout,

    /// Invalid request configuration.
    #[display("invalid request: {_0}")]
    #[from(skip)]
    InvalidRequest(#[error(not(source))] String),

    /// JSON serialization error.
    #[display("JSON serialization error: {_0}")]
    #[from]
    JsonSerialization(serde_json::Error),

    /// JSON deserialization error with path context.
    #[display("JSON deserialization error at '{path}': {message}")]
    #[from(skip)]
    JsonDeserialization {
        /// JSON path to the error (e.g., "data.owner.id").
        path: String,
        /// Error message.
        message: String,
    },

    /// Form URL-encoded serialization error.
    #[display("form serialization error: {_0}")]
    #[from]
    FormSerialization(serde_html_form::ser::Error),

    /// URL parsing error.
    #[display("invalid URL: {_0}")]
    #[from]
    InvalidUrl(url::ParseError),

    /// Too many redirects.
    #[display("too many redirects ({count} exceeded max of {max})")]
    #[from(skip)]
    TooManyRedirects {
        /// Number of redirects followed.
        count: usize,
        /// Maximum allowed redirects.
        max: usize,
    },

    /// Invalid redirect response.
    #[display("invalid redirect: {_0}")]
    #[from(skip)]
    InvalidRedirect(#[error(not(source))] String),
}

/// Result type alias using [`crate::Error`].
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a request error from the provider's message.
    #[must_use]
    pub fn request(message: impl Into<String>) -> Self {
        Self::RequestError(message.into())
    }

    /// Create a connection error.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// Create a TLS error.
    #[must_use]
    pub fn tls(message: impl Into<String>) -> Self {
        Self::Tls(message.into())
    }

    /// Create an invalid request error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Create a JSON deserialization error with path context.
    #[must_use]
    pub fn json_deserialization(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::JsonDeserialization {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Returns `true` for both flavours of HTTP 404.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound | Self::InstanceNotFound)
    }

    /// Returns `true` if the credentials were rejected.
    #[must_use]
    pub const fn is_authorization(&self) -> bool {
        matches!(self, Self::InvalidAuthorization)
    }

    /// Returns `true` if the request quota is exhausted.
    #[must_use]
    pub const fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RequestLimitReached)
    }

    /// Returns `true` if this is a timeout error.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }

    /// Returns `true` if this is a connection error.
    #[must_use]
    pub const fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }

    /// Returns `true` if no classified response exists because the exchange
    /// itself failed.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Connection(_)
                | Self::Tls(_)
                | Self::Timeout
                | Self::InvalidUrl(_)
                | Self::TooManyRedirects { .. }
                | Self::InvalidRedirect(_)
        )
    }

    /// Returns `true` if repeating the same call later may succeed.
    ///
    /// Covers rate limiting, timeouts, connection failures and 5xx statuses.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RequestLimitReached | Self::Timeout | Self::Connection(_) => true,
            Self::UnexpectedStatus { status, .. } => (500..600).contains(status),
            _ => false,
        }
    }

    /// Returns the HTTP status code implied by this error, if any.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::NotFound | Self::InstanceNotFound => Some(404),
            Self::InvalidAuthorization => Some(401),
            Self::UnexpectedStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns the decoded body carried by [`Error::AnotherError`].
    #[must_use]
    pub const fn response_body(&self) -> Option<&JsonMap> {
        match self {
            Self::AnotherError { body } => Some(body),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use assert2::{check, let_assert};
    use serde_json::json;

    use super::*;

    #[test]
    fn error_display() {
        check!(Error::NotFound.to_string() == "resource not found");
        check!(Error::InstanceNotFound.to_string() == "instance not found");
        check!(Error::InvalidAuthorization.to_string() == "invalid authorization");
        check!(Error::request("bad field").to_string() == "request error: bad field");
        check!(Error::RequestLimitReached.to_string() == "request limit reached");
        check!(Error::Timeout.to_string() == "request timeout");
        check!(
            Error::connection("failed to connect").to_string()
                == "connection error: failed to connect"
        );
        check!(
            Error::json_deserialization("data.id", "invalid type").to_string()
                == "JSON deserialization error at 'data.id': invalid type"
        );

        let err = Error::UnexpectedStatus {
            status: 503,
            body: "busy".to_string(),
        };
        check!(err.to_string() == "unexpected HTTP status 503");
    }

    #[test]
    fn error_status() {
        check!(Error::NotFound.status() == Some(404));
        check!(Error::InstanceNotFound.status() == Some(404));
        check!(Error::InvalidAuthorization.status() == Some(401));
        check!(Error::request("x").status() == None);
        check!(Error::Timeout.status() == None);
    }

    #[test]
    fn error_is_not_found() {
        assert!(Error::NotFound.is_not_found());
        assert!(Error::InstanceNotFound.is_not_found());
        assert!(!Error::InvalidAuthorization.is_not_found());
    }

    #[test]
    fn error_is_transport() {
        assert!(Error::Timeout.is_transport());
        assert!(Error::connection("refused").is_transport());
        assert!(Error::tls("bad certificate").is_transport());
        assert!(!Error::NotFound.is_transport());
        assert!(!Error::RequestLimitReached.is_transport());
    }

    #[test]
    fn error_is_retryable() {
        assert!(Error::RequestLimitReached.is_retryable());
        assert!(Error::Timeout.is_retryable());
        assert!(Error::connection("reset").is_retryable());
        assert!(
            Error::UnexpectedStatus {
                status: 502,
                body: String::new()
            }
            .is_retryable()
        );
        assert!(
            !Error::UnexpectedStatus {
                status: 409,
                body: String::new()
            }
            .is_retryable()
        );
        assert!(!Error::InvalidAuthorization.is_retryable());
        assert!(!Error::request("bad field").is_retryable());
    }

    #[test]
    fn error_response_body() {
        let_assert!(serde_json::Value::Object(body) = json!({"success": false, "detail": "x"}));
        let err = Error::AnotherError { body: body.clone() };
        check!(err.response_body() == Some(&body));
        check!(Error::NotFound.response_body() == None);
    }
}
