//! Error types shared by the adapters and the CRUD handlers.
//!
//! Adapter errors (`StoreError`, `ObjectStoreError`) describe what went wrong
//! in a backend. `HandlerError` is the taxonomy the handlers speak; every
//! variant maps onto exactly one status code.

use thiserror::Error;

/// Errors raised by a [`RecordStore`](crate::record::RecordStore).
#[derive(Debug, Error)]
pub enum StoreError {
    /// The "key exists" precondition of a conditional write did not hold.
    #[error("conditional check failed for key {key} in table {table}")]
    ConditionalCheckFailed { table: String, key: String },

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("record serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Any other backend failure (lock poisoning, unreachable backend, ...).
    #[error("record store failure: {0}")]
    Backend(String),
}

/// Errors raised by an [`ObjectStorage`](crate::objects::ObjectStorage).
#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("object {key} not found in bucket {bucket}")]
    NotFound { bucket: String, key: String },

    #[error("invalid object key: {0}")]
    InvalidKey(String),

    #[error("object storage io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("object storage failure: {0}")]
    Backend(String),
}

/// Outcome of a failed handler operation.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Malformed or incomplete input. Never touches the backend.
    #[error("{message}")]
    Validation {
        message: String,
        detail: Option<String>,
    },

    /// Key absent, or deleted concurrently between a read and a write.
    #[error("{0}")]
    NotFound(String),

    /// Mutation of a protected record.
    #[error("{0}")]
    Forbidden(String),

    /// Unclassified backend failure.
    #[error("{message}: {source}")]
    Backend {
        message: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl HandlerError {
    pub fn validation(message: impl Into<String>) -> Self {
        HandlerError::Validation {
            message: message.into(),
            detail: None,
        }
    }

    pub fn validation_with_detail(message: impl Into<String>, detail: impl Into<String>) -> Self {
        HandlerError::Validation {
            message: message.into(),
            detail: Some(detail.into()),
        }
    }

    pub fn backend<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        HandlerError::Backend {
            message: message.into(),
            source: Box::new(source),
        }
    }

    /// HTTP status code this error is reported with.
    pub fn status_code(&self) -> u16 {
        match self {
            HandlerError::Validation { .. } => 400,
            HandlerError::NotFound(_) => 400,
            HandlerError::Forbidden(_) => 403,
            HandlerError::Backend { .. } => 500,
        }
    }

    /// Message shown to the caller in the `message` field of the envelope.
    pub fn message(&self) -> &str {
        match self {
            HandlerError::Validation { message, .. } => message,
            HandlerError::NotFound(message) => message,
            HandlerError::Forbidden(message) => message,
            HandlerError::Backend { message, .. } => message,
        }
    }

    /// Optional extra detail shown in the `error` field of the envelope.
    pub fn detail(&self) -> Option<String> {
        match self {
            HandlerError::Validation { detail, .. } => detail.clone(),
            HandlerError::Backend { source, .. } => Some(source.to_string()),
            HandlerError::NotFound(_) | HandlerError::Forbidden(_) => None,
        }
    }
}
