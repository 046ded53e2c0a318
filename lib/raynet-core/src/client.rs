//! HTTP client trait.
//!
//! [`HttpClient`] is the seam between the dispatcher and the transport. The
//! `raynet-client` crate implements it with hyper; tests implement it with
//! in-memory fakes.

use std::future::Future;

use bytes::Bytes;

use crate::{Request, Response, Result};

/// Core HTTP client trait.
///
/// Executes one request and returns the raw response, whatever its status.
/// Only failures that prevent a response from existing are errors here;
/// status handling belongs to [`classify`](crate::classify).
pub trait HttpClient: Send + Sync {
    /// Execute an HTTP request and return the response.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails for any reason:
    /// - Network errors
    /// - TLS errors
    /// - Timeouts
    /// - Redirect loops
    fn execute(
        &self,
        request: Request<Bytes>,
    ) -> impl Future<Output = Result<Response<Bytes>>> + Send;
}
