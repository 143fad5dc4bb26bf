//! # REST API Errors
//!
//! Error types for the draft-issue endpoints.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::error::QueryError;

/// Result type for REST operations
pub type RestResult<T> = Result<T, RestError>;

/// REST API errors
#[derive(Debug, Error)]
pub enum RestError {
    // ==================
    // Client Errors (4xx)
    // ==================
    /// Required header absent
    #[error("Missing required header: {0}")]
    MissingHeader(&'static str),

    /// Header present but unparseable
    #[error("Invalid header {0}: {1}")]
    InvalidHeader(&'static str, String),

    /// Path segment is not a UUID
    #[error("Invalid path parameter {0}: {1}")]
    InvalidPath(&'static str, String),

    /// Invalid request body
    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    // ==================
    // Engine Errors
    // ==================
    #[error("{0}")]
    Query(#[from] QueryError),
}

impl RestError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            RestError::MissingHeader(_) => StatusCode::UNAUTHORIZED,
            RestError::InvalidHeader(_, _) => StatusCode::BAD_REQUEST,
            RestError::InvalidPath(_, _) => StatusCode::BAD_REQUEST,
            RestError::InvalidBody(_) => StatusCode::BAD_REQUEST,
            RestError::Query(err) => StatusCode::from_u16(err.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        }
    }

    /// Stable error code carried in the response body
    pub fn code(&self) -> &'static str {
        match self {
            RestError::MissingHeader(_) => "DRAFT_UNAUTHENTICATED",
            RestError::InvalidHeader(_, _) => "DRAFT_INVALID_HEADER",
            RestError::InvalidPath(_, _) => "DRAFT_INVALID_PATH",
            RestError::InvalidBody(_) => "DRAFT_INVALID_BODY",
            RestError::Query(err) => err.code(),
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl From<&RestError> for ErrorResponse {
    fn from(err: &RestError) -> Self {
        let field = match err {
            RestError::Query(query) => query.field().map(str::to_string),
            _ => None,
        };
        Self {
            error: err.to_string(),
            code: err.code(),
            field,
        }
    }
}

impl IntoResponse for RestError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(ErrorResponse::from(&self));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    use crate::store::StoreError;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            RestError::InvalidBody("test".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            RestError::MissingHeader("x-actor-id").status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            RestError::from(QueryError::NotFound(Uuid::nil())).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            RestError::from(QueryError::Forbidden(Uuid::nil())).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            RestError::from(QueryError::from(StoreError::LockPoisoned)).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_error_body_names_field() {
        let err = RestError::from(QueryError::validation("priority", "unknown value: hot"));
        let body = ErrorResponse::from(&err);
        assert_eq!(body.code, "DRAFT_VALIDATION_FAILED");
        assert_eq!(body.field.as_deref(), Some("priority"));
        assert_eq!(body.error, "Invalid priority: unknown value: hot");
    }
}
