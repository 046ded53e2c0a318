//! Body serialization utilities.

use bytes::Bytes;
use serde_json::Value;

use crate::{JsonMap, Result};

/// Content type for request payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentType {
    /// JSON content type (`application/json`).
    Json,
    /// Form URL-encoded content type (`application/x-www-form-urlencoded`).
    FormUrlEncoded,
}

impl ContentType {
    /// Get the MIME type string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::FormUrlEncoded => "application/x-www-form-urlencoded",
        }
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Serialize a value to JSON bytes.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
///
/// # Example
///
/// ```
/// use raynet_core::to_json;
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct Company { name: String }
///
/// let company = Company { name: "Acme".to_string() };
/// let bytes = to_json(&company).expect("serialize");
/// assert_eq!(bytes.as_ref(), br#"{"name":"Acme"}"#);
/// ```
pub fn to_json<T: serde::Serialize>(value: &T) -> Result<Bytes> {
    serde_json::to_vec(value)
        .map(Bytes::from)
        .map_err(Into::into)
}

/// Serialize a value to form URL-encoded bytes.
///
/// # Errors
///
/// Returns an error if form serialization fails.
///
/// # Example
///
/// ```
/// use std::collections::BTreeMap;
/// use raynet_core::to_form;
///
/// let params = BTreeMap::from([
///     ("limit".to_string(), "10".to_string()),
///     ("name[LIKE]".to_string(), "Acme%".to_string()),
/// ]);
/// let bytes = to_form(&params).expect("serialize");
/// assert_eq!(bytes.as_ref(), b"limit=10&name%5BLIKE%5D=Acme%25");
/// ```
pub fn to_form<T: serde::Serialize>(value: &T) -> Result<Bytes> {
    serde_html_form::to_string(value)
        .map(|s| Bytes::from(s.into_bytes()))
        .map_err(Into::into)
}

/// Deserialize an already decoded JSON value with path-aware error messages.
///
/// # Errors
///
/// Returns an error if the value does not match `T`.
///
/// # Example
///
/// ```
/// use raynet_core::from_value;
/// use serde::Deserialize;
///
/// #[derive(Debug, PartialEq, Deserialize)]
/// struct Created { id: u64 }
///
/// let created: Created = from_value(serde_json::json!({"id": 42})).expect("deserialize");
/// assert_eq!(created, Created { id: 42 });
/// ```
pub fn from_value<T: serde::de::DeserializeOwned>(value: Value) -> Result<T> {
    serde_path_to_error::deserialize(value).map_err(|e| {
        crate::Error::json_deserialization(e.path().to_string(), e.inner().to_string())
    })
}

/// Best-effort decode of a response body into a JSON object.
///
/// Empty bodies, invalid JSON and JSON that is not an object all yield `None`.
pub(crate) fn decode_object(bytes: &[u8]) -> Option<JsonMap> {
    match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Loose truthiness test used on the `success` flag of API bodies.
///
/// `null`, `false`, numeric zero, `""`, `"0"`, `[]` and `{}` are falsy. Any
/// other string, including `"false"`, is truthy.
#[must_use]
#[allow(clippy::float_cmp)]
pub fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f == 0.0),
        Value::String(s) => s.is_empty() || s == "0",
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}
