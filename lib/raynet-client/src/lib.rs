//! Authenticated HTTP client for the Raynet CRM REST API.
//!
//! [`RaynetClient`] attaches credentials, encodes payloads and turns every
//! response into either the decoded JSON object or one typed [`Error`].
//!
//! # Example
//!
//! ```ignore
//! use raynet_client::prelude::*;
//!
//! let client = RaynetClient::new(Credentials::new("user@acme.cz", "api-key", "acme"))?;
//!
//! match client.dispatch(ApiCall::get("api/v2/company/42/")).await {
//!     Ok(company) => println!("{company:?}"),
//!     Err(err) if err.is_not_found() => println!("no such company"),
//!     Err(err) if err.is_rate_limited() => println!("slow down"),
//!     Err(err) => return Err(err),
//! }
//! ```
//!
//! The transport is a hyper-util client with rustls, wrapped in tower
//! middleware (see [`middleware`]). Any other [`HttpClient`] can be plugged in
//! with [`RaynetClient::with_client`].

mod client;
mod config;
mod connector;
mod dispatcher;
pub mod middleware;
pub mod prelude;

// Re-export client types
pub use client::{BoxedService, HyperClient, HyperClientBuilder, ServiceFuture};
pub use config::{
    ClientConfig, ClientConfigBuilder, DEFAULT_CONNECT_TIMEOUT, DEFAULT_MAX_REDIRECTS,
    DEFAULT_TIMEOUT,
};
pub use dispatcher::{DEFAULT_USER_AGENT, RAYNET_ORIGIN, RaynetClient, RaynetClientBuilder};

// Re-export tower for middleware composition
pub use tower;

// Re-export core types
pub use raynet_core::{
    ApiCall, ContentType, Credentials, Error, HttpClient, INSTANCE_HEADER, JsonMap, Method,
    Request, RequestBuilder, Response, Result, classify, from_value, is_falsy, to_form,
    to_json,
};

// Re-export http types for status codes and headers
pub use raynet_core::{StatusCode, header};

pub use url;
