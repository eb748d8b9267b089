//! Response envelope: `{statusCode, headers, body}`

use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use log::error;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;

use crate::error::HandlerError;

pub const ALLOW_ORIGIN: &str = "Access-Control-Allow-Origin";
pub const ALLOW_CREDENTIALS: &str = "Access-Control-Allow-Credentials";
pub const ALLOW_METHODS: &str = "Access-Control-Allow-Methods";
pub const ALLOW_HEADERS: &str = "Access-Control-Allow-Headers";

/// Uniform handler response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

fn cors_headers() -> BTreeMap<String, String> {
    let mut headers = BTreeMap::new();
    headers.insert(ALLOW_ORIGIN.to_string(), "*".to_string());
    headers.insert(ALLOW_CREDENTIALS.to_string(), "true".to_string());
    headers
}

impl Envelope {
    /// Envelope with a pretty-printed JSON body
    pub fn json(status_code: u16, body: &Value) -> Self {
        let body = serde_json::to_string_pretty(body).unwrap_or_else(|e| {
            error!("Failed to serialize response body: {}", e);
            String::from("{}")
        });
        Self {
            status_code,
            headers: cors_headers(),
            body: Some(body),
        }
    }

    /// 200 with `message` and `data`
    pub fn data(message: &str, data: Value) -> Self {
        Self::json(200, &json!({ "message": message, "data": data }))
    }

    /// 200 with `message` and `result`
    pub fn result(message: &str, result: Value) -> Self {
        Self::json(200, &json!({ "message": message, "result": result }))
    }

    /// CORS preflight answer, no body
    pub fn preflight() -> Self {
        let mut headers = cors_headers();
        headers.insert(ALLOW_METHODS.to_string(), "OPTIONS,POST,GET,PUT,DELETE".to_string());
        headers.insert(ALLOW_HEADERS.to_string(), "Content-Type, Authorization".to_string());
        Self {
            status_code: 200,
            headers,
            body: None,
        }
    }

    pub fn from_error(err: &HandlerError) -> Self {
        let body = match err.detail() {
            Some(detail) => json!({ "message": err.message(), "error": detail }),
            None => json!({ "message": err.message() }),
        };
        Self::json(err.status_code(), &body)
    }

    /// Body parsed back into JSON, mostly for tests and logging
    pub fn body_json(&self) -> Option<Value> {
        self.body.as_deref().and_then(|b| serde_json::from_str(b).ok())
    }

    pub fn into_http_response(self) -> HttpResponse {
        let status = StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut builder = HttpResponse::build(status);
        for (name, value) in &self.headers {
            builder.insert_header((name.as_str(), value.as_str()));
        }
        match self.body {
            Some(body) => builder.content_type("application/json").body(body),
            None => builder.finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;

    #[test]
    fn test_data_envelope() {
        let envelope = Envelope::data("Inserted Successfully", json!({"id": "1"}));
        assert_eq!(envelope.status_code, 200);
        assert_eq!(envelope.headers[ALLOW_ORIGIN], "*");
        assert_eq!(envelope.headers[ALLOW_CREDENTIALS], "true");
        // Two-space pretty printing
        assert!(envelope.body.as_deref().unwrap().contains("\n  \"data\""));
        assert_eq!(envelope.body_json().unwrap()["data"]["id"], json!("1"));
    }

    #[test]
    fn test_error_envelopes() {
        let envelope = Envelope::from_error(&HandlerError::Forbidden("nope".into()));
        assert_eq!(envelope.status_code, 403);
        assert_eq!(envelope.body_json().unwrap(), json!({"message": "nope"}));

        let envelope = Envelope::from_error(&HandlerError::backend(
            "Error selecting data",
            StoreError::Backend("timeout".into()),
        ));
        assert_eq!(envelope.status_code, 500);
        assert_eq!(
            envelope.body_json().unwrap(),
            json!({"message": "Error selecting data", "error": "record store failure: timeout"})
        );
    }

    #[test]
    fn test_preflight_has_no_body() {
        let envelope = Envelope::preflight();
        assert_eq!(envelope.status_code, 200);
        assert!(envelope.body.is_none());
        assert_eq!(envelope.headers[ALLOW_METHODS], "OPTIONS,POST,GET,PUT,DELETE");

        let serialized = serde_json::to_value(&envelope).unwrap();
        assert_eq!(serialized["statusCode"], json!(200));
        assert!(serialized.get("body").is_none());
    }

    #[test]
    fn test_into_http_response() {
        let response = Envelope::from_error(&HandlerError::validation("bad")).into_http_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.headers().get(ALLOW_ORIGIN).unwrap(), "*");
        assert_eq!(response.headers().get("content-type").unwrap(), "application/json");
    }
}
