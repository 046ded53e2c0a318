//! Prelude module for convenient imports.
//!
//! This module re-exports the most commonly used types and functions
//! for easy glob importing:
//!
//! ```ignore
//! use raynet_client::prelude::*;
//! ```

pub use crate::{
    ApiCall, ClientConfig, Credentials, Error, HttpClient, HyperClient, JsonMap, Method,
    RaynetClient, RaynetClientBuilder, Response, Result, StatusCode,
};
pub use serde::{Deserialize, Serialize};
