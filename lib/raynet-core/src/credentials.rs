//! Raynet API credentials.

use std::fmt;
use std::sync::Arc;

use base64::Engine;

/// Header that selects the tenant instance on every request.
pub const INSTANCE_HEADER: &str = "X-Instance-Name";

/// Username, API key and instance name for one Raynet tenant.
///
/// Immutable once built. Cloning is cheap: the encoded `Authorization` value is
/// computed once and shared.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: Arc<str>,
    api_key: Arc<str>,
    instance: Arc<str>,
    /// `Basic <base64(username:api_key)>`.
    authorization: Arc<str>,
}

impl Credentials {
    /// Create credentials for the given user, API key and instance.
    pub fn new(
        username: impl AsRef<str>,
        api_key: impl AsRef<str>,
        instance: impl AsRef<str>,
    ) -> Self {
        let pair = format!("{}:{}", username.as_ref(), api_key.as_ref());
        let encoded = base64::engine::general_purpose::STANDARD.encode(pair);
        Self {
            username: Arc::from(username.as_ref()),
            api_key: Arc::from(api_key.as_ref()),
            instance: Arc::from(instance.as_ref()),
            authorization: Arc::from(format!("Basic {encoded}")),
        }
    }

    /// API user name.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// API key.
    #[must_use]
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Tenant instance name.
    #[must_use]
    pub fn instance(&self) -> &str {
        &self.instance
    }

    /// Value for the `Authorization` header.
    #[must_use]
    pub fn authorization(&self) -> &str {
        &self.authorization
    }

    /// The headers these credentials stamp onto a request.
    #[must_use]
    pub fn headers(&self) -> [(String, String); 2] {
        [
            ("Authorization".to_string(), self.authorization.to_string()),
            (INSTANCE_HEADER.to_string(), self.instance.to_string()),
        ]
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("api_key", &"<redacted>")
            .field("instance", &self.instance)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_auth_encodes_correctly() {
        // "user:pass" -> "dXNlcjpwYXNz"
        let credentials = Credentials::new("user", "pass", "acme");
        assert_eq!(credentials.authorization(), "Basic dXNlcjpwYXNz");
    }

    #[test]
    fn headers_carry_instance() {
        let credentials = Credentials::new("user", "pass", "acme");
        let headers = credentials.headers();
        assert_eq!(
            headers,
            [
                ("Authorization".to_string(), "Basic dXNlcjpwYXNz".to_string()),
                ("X-Instance-Name".to_string(), "acme".to_string()),
            ]
        );
    }

    #[test]
    fn debug_redacts_api_key() {
        let credentials = Credentials::new("jane@acme.cz", "s3cr3t", "acme");
        let debug = format!("{credentials:?}");
        assert!(debug.contains("jane@acme.cz"));
        assert!(debug.contains("acme"));
        assert!(!debug.contains("s3cr3t"));
    }

    #[test]
    fn clones_share_values() {
        let credentials = Credentials::new("user", "pass", "acme");
        let cloned = credentials.clone();
        assert_eq!(credentials, cloned);
        assert_eq!(cloned.api_key(), "pass");
        assert_eq!(cloned.username(), "user");
    }
}
