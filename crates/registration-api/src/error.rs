//! Error types for the registration API.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use document_store::StoreError;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// A single offending field in a registration submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldIssue {
    pub field: String,
    pub message: String,
}

impl FieldIssue {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Submission rejected before any side effect, listing every offending field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid registration: {}", summarize(.issues))]
pub struct ValidationError {
    issues: Vec<FieldIssue>,
}

impl ValidationError {
    pub fn new(issues: Vec<FieldIssue>) -> Self {
        Self { issues }
    }

    pub fn issues(&self) -> &[FieldIssue] {
        &self.issues
    }

    /// Whether `field` is among the offending fields.
    pub fn names(&self, field: &str) -> bool {
        self.issues.iter().any(|issue| issue.field == field)
    }
}

fn summarize(issues: &[FieldIssue]) -> String {
    issues
        .iter()
        .map(|issue| format!("{}: {}", issue.field, issue.message))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Failure talking to, or interpreting data from, the document store.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to write registration {registration_id}: {source}")]
    Write {
        registration_id: String,
        #[source]
        source: StoreError,
    },

    #[error("Failed to read registration {registration_id}: {source}")]
    Read {
        registration_id: String,
        #[source]
        source: StoreError,
    },

    #[error("Stored registration {registration_id} is malformed: {reason}")]
    Malformed {
        registration_id: String,
        reason: String,
    },

    #[error("Failed to encode registration document: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Errors surfaced by the HTTP layer.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Registration {0} not found")]
    NotFound(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error envelope returned for every failed request.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub detail: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldIssue>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            detail: detail.into(),
            timestamp: Utc::now(),
            fields: Vec::new(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Validation(e) => {
                let mut body = ErrorResponse::new("ValidationError", e.to_string());
                body.fields = e.issues;
                (StatusCode::BAD_REQUEST, body)
            }
            ApiError::NotFound(id) => (
                StatusCode::NOT_FOUND,
                ErrorResponse::new("NotFound", format!("Registration {} not found", id)),
            ),
            ApiError::Storage(e) => {
                // The cause stays in the logs; callers get a fixed message.
                error!(error = %e, "Storage failure");
                let detail = match e {
                    StorageError::Write { .. } | StorageError::Encode(_) => {
                        "Failed to create registration. Please try again later."
                    }
                    StorageError::Read { .. } | StorageError::Malformed { .. } => {
                        "Failed to retrieve registration. Please try again later."
                    }
                };
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new("StorageError", detail),
                )
            }
            ApiError::RateLimitExceeded => (
                StatusCode::TOO_MANY_REQUESTS,
                ErrorResponse::new(
                    "RateLimitExceeded",
                    "Too many requests. Please try again later.",
                ),
            ),
            ApiError::Internal(message) => {
                error!(error = %message, "Unexpected error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new(
                        "InternalServerError",
                        "An unexpected error occurred. Please try again later.",
                    ),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
