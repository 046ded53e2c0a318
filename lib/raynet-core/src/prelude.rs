//! Prelude module for convenient imports.
//!
//! This module re-exports the most commonly used types and functions
//! for easy glob importing:
//!
//! ```ignore
//! use raynet_core::prelude::*;
//! ```

pub use crate::{
    ApiCall, ContentType, Credentials, Error, HttpClient, JsonMap, Method, Request,
    RequestBuilder, Response, Result, classify, from_value, to_form, to_json,
};
