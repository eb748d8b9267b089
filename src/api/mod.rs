//! Handler boundary
//!
//! Turns a transport-neutral [`HandlerRequest`] into an [`Envelope`]. Every
//! error is logged and converted here; nothing escapes as a transport failure.

pub mod envelope;
pub mod routes;

use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::fmt;

use crate::app_state::AppState;
use crate::error::HandlerError;
use crate::schema::ResourceKind;
pub use envelope::Envelope;

/// Incoming event, independent of the HTTP framework
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandlerRequest {
    pub body: Option<String>,
    pub path_parameters: Option<HashMap<String, String>>,
    pub http_method: Option<String>,
}

impl HandlerRequest {
    pub fn with_body(body: impl Into<String>) -> Self {
        Self {
            body: Some(body.into()),
            ..Self::default()
        }
    }

    pub fn path_parameter(&self, name: &str) -> Option<&str> {
        self.path_parameters
            .as_ref()
            .and_then(|params| params.get(name))
            .map(String::as_str)
    }

    fn is_preflight(&self) -> bool {
        self.http_method
            .as_deref()
            .map_or(false, |method| method.eq_ignore_ascii_case("OPTIONS"))
    }
}

/// The four record handlers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Insert,
    Select,
    Update,
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Insert => "insert",
            Operation::Select => "select",
            Operation::Update => "update",
            Operation::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// Image handlers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageOperation {
    Upload,
    Delete,
}

impl fmt::Display for ImageOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageOperation::Upload => f.write_str("upload"),
            ImageOperation::Delete => f.write_str("delete"),
        }
    }
}

fn log_error(context: &str, err: &HandlerError) {
    match err {
        HandlerError::Backend { .. } => error!("{} failed: {}", context, err),
        _ => warn!("{} rejected: {}", context, err),
    }
}

fn into_envelope(context: &str, outcome: Result<Envelope, HandlerError>) -> Envelope {
    outcome.unwrap_or_else(|err| {
        log_error(context, &err);
        Envelope::from_error(&err)
    })
}

/// Run one record operation for one resource
pub fn handle(state: &AppState, kind: ResourceKind, operation: Operation, request: &HandlerRequest) -> Envelope {
    log_mdc::insert("resource", kind.slug());
    log_mdc::insert("operation", operation.to_string());
    info!("{} {}", operation, kind);

    if request.is_preflight() {
        return Envelope::preflight();
    }

    let service = state.crud(kind);
    let body = request.body.as_deref();
    let outcome = match operation {
        Operation::Insert => service
            .insert(body)
            .map(|record| Envelope::data("Inserted Successfully", Value::Object(record))),
        Operation::Select => service.select().map(|records| {
            Envelope::result(
                "Data selected",
                Value::Array(records.into_iter().map(Value::Object).collect()),
            )
        }),
        Operation::Update => service
            .update(body)
            .map(|record| Envelope::data("Updated Successfully", Value::Object(record))),
        Operation::Delete => service
            .delete(request.path_parameter("id"), body)
            .map(|record| Envelope::data("Deleted Successfully", Value::Object(record))),
    };

    into_envelope(&format!("{} {}", operation, kind), outcome)
}

/// Run one product image operation
pub fn handle_image(state: &AppState, operation: ImageOperation, request: &HandlerRequest) -> Envelope {
    log_mdc::insert("resource", "product-images");
    log_mdc::insert("operation", operation.to_string());
    info!("{} product image", operation);

    if request.is_preflight() {
        return Envelope::preflight();
    }

    let images = state.images();
    let body = request.body.as_deref();
    let outcome = match operation {
        ImageOperation::Upload => images.upload(body).map(|uploaded| {
            Envelope::json(
                200,
                &json!({ "message": "Image uploaded", "url": uploaded.url, "key": uploaded.key }),
            )
        }),
        ImageOperation::Delete => images
            .delete(body)
            .map(|key| Envelope::json(200, &json!({ "message": "Image deleted", "key": key }))),
    };

    into_envelope("product image", outcome)
}
