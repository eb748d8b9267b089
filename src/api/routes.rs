//! actix-web routes
//!
//! One generic route set serves every resource; the `{resource}` path
//! segment selects the schema.

use actix_web::http::Method;
use actix_web::{web, HttpRequest, HttpResponse};
use bytes::BytesMut;
use futures::StreamExt;
use log::{debug, warn};
use serde_json::json;
use std::collections::HashMap;

use crate::api::{self, Envelope, HandlerRequest, ImageOperation, Operation};
use crate::app_state::AppState;
use crate::error::HandlerError;
use crate::schema::ResourceKind;

/// Register all routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health))
        // Must come before the generic `/{resource}/{id}` pattern
        .service(
            web::resource("/products/images")
                .route(web::post().to(upload_image))
                .route(web::delete().to(delete_image))
                .route(web::method(Method::OPTIONS).to(image_preflight)),
        )
        .service(
            web::resource("/{resource}")
                .route(web::post().to(insert))
                .route(web::get().to(select))
                .route(web::put().to(update))
                .route(web::delete().to(delete))
                .route(web::method(Method::OPTIONS).to(preflight)),
        )
        .service(
            web::resource("/{resource}/{id}")
                .route(web::delete().to(delete))
                .route(web::method(Method::OPTIONS).to(preflight)),
        );
}

const UNREADABLE_BODY: &str = "Error: The request body could not be read.";

/// Collect the payload, at most `limit` bytes of UTF-8
async fn read_body(mut payload: web::Payload, limit: usize) -> Result<Option<String>, HandlerError> {
    let mut bytes = BytesMut::new();
    while let Some(chunk) = payload.next().await {
        let chunk = chunk.map_err(|e| HandlerError::validation_with_detail(UNREADABLE_BODY, e.to_string()))?;
        if bytes.len() + chunk.len() > limit {
            return Err(HandlerError::validation_with_detail(
                UNREADABLE_BODY,
                format!("payload exceeds {} bytes", limit),
            ));
        }
        bytes.extend_from_slice(&chunk);
    }
    if bytes.is_empty() {
        return Ok(None);
    }
    debug!("Received request body of {} bytes", bytes.len());
    String::from_utf8(bytes.to_vec())
        .map(Some)
        .map_err(|e| HandlerError::validation_with_detail(UNREADABLE_BODY, e.to_string()))
}

/// Build the framework-neutral request from the actix one
async fn handler_request(
    req: &HttpRequest,
    payload: web::Payload,
    app_state: &AppState,
) -> Result<HandlerRequest, HandlerError> {
    let path_parameters: HashMap<String, String> = req
        .match_info()
        .iter()
        .filter(|(name, _)| *name != "resource")
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect();

    Ok(HandlerRequest {
        body: read_body(payload, app_state.config.server.max_payload_size).await?,
        path_parameters: (!path_parameters.is_empty()).then_some(path_parameters),
        http_method: Some(req.method().to_string()),
    })
}

fn rejected_body(err: HandlerError) -> HttpResponse {
    warn!("Request body rejected: {}", err);
    Envelope::from_error(&err).into_http_response()
}

fn unknown_resource(name: &str) -> HttpResponse {
    warn!("Request for unknown resource: {}", name);
    Envelope::json(404, &json!({ "message": format!("Unknown resource: {}", name) })).into_http_response()
}

async fn dispatch(
    operation: Operation,
    req: HttpRequest,
    payload: web::Payload,
    app_state: web::Data<AppState>,
) -> HttpResponse {
    let name = req.match_info().get("resource").unwrap_or_default();
    let kind = match name.parse::<ResourceKind>() {
        Ok(kind) => kind,
        Err(_) => return unknown_resource(name),
    };

    match handler_request(&req, payload, &app_state).await {
        Ok(request) => api::handle(&app_state, kind, operation, &request).into_http_response(),
        Err(err) => rejected_body(err),
    }
}

async fn insert(req: HttpRequest, payload: web::Payload, app_state: web::Data<AppState>) -> HttpResponse {
    dispatch(Operation::Insert, req, payload, app_state).await
}

async fn select(req: HttpRequest, payload: web::Payload, app_state: web::Data<AppState>) -> HttpResponse {
    dispatch(Operation::Select, req, payload, app_state).await
}

async fn update(req: HttpRequest, payload: web::Payload, app_state: web::Data<AppState>) -> HttpResponse {
    dispatch(Operation::Update, req, payload, app_state).await
}

async fn delete(req: HttpRequest, payload: web::Payload, app_state: web::Data<AppState>) -> HttpResponse {
    dispatch(Operation::Delete, req, payload, app_state).await
}

// The method on the request short-circuits to a preflight whatever the operation
async fn preflight(req: HttpRequest, payload: web::Payload, app_state: web::Data<AppState>) -> HttpResponse {
    dispatch(Operation::Select, req, payload, app_state).await
}

async fn image_dispatch(
    operation: ImageOperation,
    req: HttpRequest,
    payload: web::Payload,
    app_state: web::Data<AppState>,
) -> HttpResponse {
    match handler_request(&req, payload, &app_state).await {
        Ok(request) => api::handle_image(&app_state, operation, &request).into_http_response(),
        Err(err) => rejected_body(err),
    }
}

async fn upload_image(req: HttpRequest, payload: web::Payload, app_state: web::Data<AppState>) -> HttpResponse {
    image_dispatch(ImageOperation::Upload, req, payload, app_state).await
}

async fn delete_image(req: HttpRequest, payload: web::Payload, app_state: web::Data<AppState>) -> HttpResponse {
    image_dispatch(ImageOperation::Delete, req, payload, app_state).await
}

async fn image_preflight(req: HttpRequest, payload: web::Payload, app_state: web::Data<AppState>) -> HttpResponse {
    image_dispatch(ImageOperation::Upload, req, payload, app_state).await
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}
