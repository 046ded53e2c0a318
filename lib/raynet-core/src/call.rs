//! A single API call as the caller describes it.
//!
//! [`ApiCall`] carries what a resource method knows: the method, a path
//! relative to the API origin, an optional JSON body and optional string
//! parameters. The dispatcher turns it into a transport [`Request`](crate::Request).

use std::collections::BTreeMap;

use bytes::Bytes;
use serde_json::Value;

use crate::{ContentType, Method, Result, is_falsy};

/// Method, relative path and payload of one Raynet API call.
///
/// # Example
///
/// ```
/// use raynet_core::{ApiCall, Method};
///
/// let call = ApiCall::get("api/v2/company/")
///     .param("limit", "10")
///     .param("offset", "0");
///
/// assert_eq!(call.method(), Method::Get);
/// assert_eq!(call.params().len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ApiCall {
    method: Method,
    path: String,
    body: Value,
    params: BTreeMap<String, String>,
}

impl ApiCall {
    /// Create a call with no body and no parameters.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: Value::Null,
            params: BTreeMap::new(),
        }
    }

    /// GET call.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    /// POST call.
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    /// PUT call.
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::Put, path)
    }

    /// DELETE call.
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    /// PATCH call.
    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::Patch, path)
    }

    /// Set the JSON body from any serializable value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be represented as JSON.
    pub fn json<T: serde::Serialize>(self, value: &T) -> Result<Self> {
        Ok(self.body_value(serde_json::to_value(value)?))
    }

    /// Set the JSON body from an already built value.
    #[must_use]
    pub fn body_value(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    /// Add one string parameter, replacing a previous value for the same key.
    #[must_use]
    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Add several string parameters.
    #[must_use]
    pub fn params_from(
        mut self,
        params: impl IntoIterator<Item = (impl Into<String>, impl Into<String>)>,
    ) -> Self {
        self.params
            .extend(params.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// HTTP method.
    #[must_use]
    pub const fn method(&self) -> Method {
        self.method
    }

    /// Path relative to the API origin.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// JSON body (`Value::Null` when unset).
    #[must_use]
    pub const fn body(&self) -> &Value {
        &self.body
    }

    /// String parameters.
    #[must_use]
    pub const fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }

    /// Returns `true` when the body would be sent.
    ///
    /// Null, `{}` and `[]` count as empty; scalars never do.
    #[must_use]
    pub fn has_body(&self) -> bool {
        match &self.body {
            Value::Null | Value::Array(_) | Value::Object(_) => !is_falsy(&self.body),
            _ => true,
        }
    }

    /// Returns `true` when both a body and parameters are set.
    ///
    /// Only the parameters are transmitted in that case.
    #[must_use]
    pub fn has_conflicting_payload(&self) -> bool {
        self.has_body() && !self.params.is_empty()
    }

    /// Encode the payload that goes on the wire, if any.
    ///
    /// The body is encoded as JSON first; non-empty parameters are then encoded
    /// as a form and replace it.
    ///
    /// # Errors
    ///
    /// Returns an error if either encoding fails.
    pub fn payload(&self) -> Result<Option<(ContentType, Bytes)>> {
        let mut payload = None;

        if self.has_body() {
            payload = Some((ContentType::Json, crate::to_json(&self.body)?));
        }

        if !self.params.is_empty() {
            payload = Some((ContentType::FormUrlEncoded, crate::to_form(&self.params)?));
        }

        Ok(payload)
    }
}
