//! Response classification.
//!
//! The Raynet API signals failure inconsistently: some errors only show up as
//! an HTTP status, others only inside the JSON body (`success`, `type`),
//! whatever the status. [`classify`] applies the status rules for anything
//! other than 200/201 first, then the body rules on every response.

use bytes::Bytes;
use serde_json::Value;

use crate::{Error, JsonMap, Response, Result, is_falsy};

const INSTANCE_NOT_FOUND_PREFIX: &str = "Instance not found";
const REQUEST_LIMIT_REACHED: &str = "RequestLimitReached";

/// Turn a raw response into the decoded body or exactly one typed error.
///
/// Order of evaluation:
/// 1. statuses other than 200/201 go through the status rules (404, 401, 400);
/// 2. an undecodable or empty body becomes an empty mapping;
/// 3. `type == "RequestLimitReached"` yields [`Error::RequestLimitReached`];
/// 4. a falsy `success` yields [`Error::AnotherError`] with the whole body;
/// 5. any non-2xx status still unclassified yields [`Error::UnexpectedStatus`].
///
/// # Errors
///
/// Returns the error variant selected by the rules above.
///
/// # Example
///
/// ```
/// use std::collections::HashMap;
/// use bytes::Bytes;
/// use raynet_core::{Error, Response, classify};
///
/// let response = Response::new(401, HashMap::new(), Bytes::from("{}"));
/// assert!(matches!(classify(&response), Err(Error::InvalidAuthorization)));
/// ```
pub fn classify(response: &Response<Bytes>) -> Result<JsonMap> {
    let status = response.status();
    let decoded = response.json_object();

    if !matches!(status, 200 | 201) {
        check_status(status, decoded.as_ref(), response)?;
    }

    let body = decoded.unwrap_or_default();

    if body.get("type").and_then(Value::as_str) == Some(REQUEST_LIMIT_REACHED) {
        return Err(Error::RequestLimitReached);
    }

    if body.get("success").is_some_and(is_falsy) {
        return Err(Error::AnotherError { body });
    }

    if response.is_success() {
        Ok(body)
    } else {
        Err(Error::UnexpectedStatus {
            status,
            body: response.text_lossy(),
        })
    }
}

/// Status-driven rules. `Ok(())` means "fall through to the body rules".
fn check_status(status: u16, body: Option<&JsonMap>, response: &Response<Bytes>) -> Result<()> {
    match status {
        404 if is_unknown_instance(body) => Err(Error::InstanceNotFound),
        404 => Err(Error::NotFound),
        401 => Err(Error::InvalidAuthorization),
        400 => check_bad_request(body, response),
        _ => Ok(()),
    }
}

fn is_unknown_instance(body: Option<&JsonMap>) -> bool {
    body.and_then(|map| map.get("translatedMessage"))
        .and_then(Value::as_str)
        .is_some_and(|message| message.starts_with(INSTANCE_NOT_FOUND_PREFIX))
}

/// HTTP 400: only the literal string `"false"` triggers the nested walk.
fn check_bad_request(body: Option<&JsonMap>, response: &Response<Bytes>) -> Result<()> {
    let Some(success) = body.and_then(|map| map.get("success")) else {
        return Err(Error::RequestError(response.text_lossy()));
    };

    if success.as_str() != Some("false") {
        return Ok(());
    }

    match body.and_then(first_error_message) {
        Some(message) => Err(Error::RequestError(message)),
        None => Ok(()),
    }
}

/// First entry of `results[*].errors[*]`, as its `message` or its JSON text.
fn first_error_message(body: &JsonMap) -> Option<String> {
    let error = body
        .get("results")?
        .as_array()?
        .iter()
        .filter_map(|result| result.get("errors").and_then(Value::as_array))
        .flatten()
        .next()?;

    Some(match error.get("message").and_then(Value::as_str) {
        Some(message) => message.to_string(),
        None => error.to_string(),
    })
}
