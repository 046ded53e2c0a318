//! Core types for the Raynet CRM REST client.
//!
//! This crate holds everything that does not touch the network:
//! - [`Method`] - the closed set of HTTP methods the API accepts
//! - [`Request`] and [`RequestBuilder`] - transport-level HTTP requests
//! - [`Response`] - transport-level HTTP responses
//! - [`ApiCall`] - a caller's intent: method, relative path, body, params
//! - [`Credentials`] - username, API key and instance name
//! - [`Error`] and [`Result`] - the typed error taxonomy
//! - [`classify`] - turns a raw response into a mapping or a typed error
//! - [`HttpClient`] - the seam a transport implements
//! - [`StatusCode`] - HTTP status codes (re-exported from `http` crate)
//! - [`header`] - HTTP header names (re-exported from `http` crate)

mod body;
mod call;
mod classify;
mod client;
mod credentials;
mod error;
mod method;
pub mod prelude;
mod request;
mod response;

pub use body::{ContentType, from_value, is_falsy, to_form, to_json};
pub use call::ApiCall;
pub use classify::classify;
pub use client::HttpClient;
pub use credentials::{Credentials, INSTANCE_HEADER};
pub use error::{Error, Result};
pub use method::Method;
pub use request::{Request, RequestBuilder};
pub use response::Response;

// Re-export http crate types for status codes and headers
pub use http::{StatusCode, header};

/// A decoded JSON object, the success payload of every dispatch.
pub type JsonMap = serde_json::Map<String, serde_json::Value>;
