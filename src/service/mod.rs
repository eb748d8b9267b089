//! Service layer: the generic CRUD service and the product image service.
//!
//! Services take raw request bodies and return domain results or a
//! [`HandlerError`]; turning those into envelopes is the api layer's job.

pub mod crud;
pub mod images;

use serde_json::Value;

use crate::error::HandlerError;
use crate::record::Record;

pub const EMPTY_BODY: &str = "Error: The request body is empty.";
pub const INVALID_BODY: &str = "Error: The request body is not a valid JSON object.";

/// Parse a request body into a JSON object
pub(crate) fn parse_body(body: Option<&str>) -> Result<Record, HandlerError> {
    let raw = body
        .map(str::trim)
        .filter(|raw| !raw.is_empty())
        .ok_or_else(|| HandlerError::validation(EMPTY_BODY))?;

    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(HandlerError::validation_with_detail(
            INVALID_BODY,
            "expected a JSON object",
        )),
        Err(e) => Err(HandlerError::validation_with_detail(INVALID_BODY, e.to_string())),
    }
}

/// A non-empty string attribute of `body`
pub(crate) fn string_field<'a>(body: &'a Record, name: &str) -> Option<&'a str> {
    body.get(name)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
}
