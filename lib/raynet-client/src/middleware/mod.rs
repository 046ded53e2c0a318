//! Tower middleware layers for the Raynet HTTP transport.
//!
//! Layers wrap the hyper transport as [`tower::Service`]s over
//! [`Request`](crate::Request)/[`Response`](crate::Response). The dispatcher
//! builds its stack as logging (outermost) → redirects → transport, so one
//! logged span covers every hop of a redirect chain.
//!
//! # Available Layers
//!
//! - [`LoggingLayer`] - Logs requests/responses using `tracing`
//! - [`FollowRedirectLayer`] - Follows 3xx responses with a `Location` header
//!
//! # Example
//!
//! ```ignore
//! use raynet_client::HyperClient;
//! use raynet_client::middleware::{FollowRedirectLayer, LoggingLayer};
//!
//! let client = HyperClient::builder()
//!     .layer(FollowRedirectLayer::new())
//!     .layer(LoggingLayer::debug())
//!     .build();
//! ```

mod follow_redirect;
mod logging;

pub use follow_redirect::{DEFAULT_MAX_REDIRECTS, FollowRedirect, FollowRedirectLayer};
pub use logging::{LogLevel, Logging, LoggingLayer};

// Re-export tower types for convenience
pub use tower::{Layer, ServiceBuilder};
