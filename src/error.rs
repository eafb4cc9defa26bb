//! Crate-wide error kinds and the `Result` alias used throughout the core.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CmdbError {
    #[error("validation failed: {0}")]
    ValidationFailure(String),

    #[error("configuration item not found: {0}")]
    CINotFound(String),

    #[error("relationship not found: {0}")]
    RelationshipNotFound(String),

    #[error("job not found: {0}")]
    JobNotFound(String),

    #[error("invalid condition type: {0}")]
    InvalidConditionType(String),

    #[error("invalid relationship type: {0}")]
    InvalidRelationshipType(String),

    #[error("could not parse date: {0}")]
    DateParseFailure(String),

    #[error("graph store query failed")]
    QueryFailure(String),

    #[error("queue operation failed")]
    QueueFailure(String),

    #[error("rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("operation cancelled")]
    Cancelled,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("internal error")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, CmdbError>;

impl From<serde_json::Error> for CmdbError {
    fn from(e: serde_json::Error) -> Self {
        CmdbError::ValidationFailure(e.to_string())
    }
}

impl From<neo4rs::Error> for CmdbError {
    fn from(e: neo4rs::Error) -> Self {
        CmdbError::QueryFailure(e.to_string())
    }
}

impl From<redis::RedisError> for CmdbError {
    fn from(e: redis::RedisError) -> Self {
        CmdbError::QueueFailure(e.to_string())
    }
}

impl From<chrono::ParseError> for CmdbError {
    fn from(e: chrono::ParseError) -> Self {
        CmdbError::DateParseFailure(e.to_string())
    }
}

/// Standardized error payload: `{error, details?}` (spec §6).
#[derive(Debug, Serialize)]
struct ErrorPayload {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for CmdbError {
    fn into_response(self) -> Response {
        use CmdbError::*;

        let (status, error, details) = match &self {
            ValidationFailure(msg) => (StatusCode::BAD_REQUEST, "ValidationFailure", Some(msg.clone())),
            CINotFound(id) => (StatusCode::NOT_FOUND, "CINotFound", Some(format!("no such CI: {id}"))),
            RelationshipNotFound(id) => (
                StatusCode::NOT_FOUND,
                "RelationshipNotFound",
                Some(format!("no such relationship: {id}")),
            ),
            JobNotFound(id) => (StatusCode::NOT_FOUND, "JobNotFound", Some(format!("no such job: {id}"))),
            InvalidConditionType(t) => (StatusCode::BAD_REQUEST, "InvalidConditionType", Some(t.clone())),
            InvalidRelationshipType(t) => (StatusCode::BAD_REQUEST, "InvalidRelationshipType", Some(t.clone())),
            DateParseFailure(msg) => (StatusCode::BAD_REQUEST, "DateParseFailure", Some(msg.clone())),
            QueryFailure(msg) => {
                tracing::error!(error = %msg, "graph store query failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "QueryFailure", None)
            }
            QueueFailure(msg) => {
                tracing::error!(error = %msg, "queue operation failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "QueueFailure", None)
            }
            RateLimited { retry_after_secs } => (
                StatusCode::TOO_MANY_REQUESTS,
                "RateLimited",
                Some(format!("retry after {retry_after_secs}s")),
            ),
            Cancelled => (StatusCode::CONFLICT, "Cancelled", None),
            Conflict(msg) => (StatusCode::CONFLICT, "Conflict", Some(msg.clone())),
            Internal(msg) => {
                tracing::error!(error = %msg, "internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal", None)
            }
        };

        let payload = ErrorPayload {
            error: error.to_string(),
            details,
        };

        (status, Json(payload)).into_response()
    }
}
