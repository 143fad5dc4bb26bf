//! Query error taxonomy
//!
//! Validation failures are raised while compiling a request, before the
//! store is touched. Store failures pass through unchanged.

use thiserror::Error;
use uuid::Uuid;

use crate::store::StoreError;

/// Result type for query engine operations
pub type QueryResult<T> = Result<T, QueryError>;

/// Errors surfaced by the query engine
#[derive(Debug, Error)]
pub enum QueryError {
    /// A single request parameter is malformed or unknown
    #[error("Invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    /// No draft issue with this id in the caller's project
    #[error("Draft issue not found: {0}")]
    NotFound(Uuid),

    /// The workspace/project pair does not exist
    #[error("Project not found: {0}")]
    ProjectNotFound(Uuid),

    /// The permission gate refused the actor
    #[error("Actor {0} is not allowed to access this project")]
    Forbidden(Uuid),

    /// The record store failed to execute a call
    #[error("Store failure: {0}")]
    Store(#[from] StoreError),
}

impl QueryError {
    /// Create a validation error attributed to one parameter
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Name of the offending parameter, for validation errors
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Validation { field, .. } => Some(field),
            _ => None,
        }
    }

    /// Stable error code for responses and logs
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "DRAFT_VALIDATION_FAILED",
            Self::NotFound(_) => "DRAFT_NOT_FOUND",
            Self::ProjectNotFound(_) => "DRAFT_PROJECT_NOT_FOUND",
            Self::Forbidden(_) => "DRAFT_FORBIDDEN",
            Self::Store(_) => "DRAFT_STORE_FAILED",
        }
    }

    /// HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation { .. } => 400,
            Self::Forbidden(_) => 403,
            Self::NotFound(_) | Self::ProjectNotFound(_) => 404,
            Self::Store(_) => 500,
        }
    }

    pub fn is_client_error(&self) -> bool {
        self.status_code() < 500
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_names_field() {
        let err = QueryError::validation("state", "not a UUID: abc");
        assert_eq!(err.field(), Some("state"));
        assert_eq!(err.to_string(), "Invalid state: not a UUID: abc");
        assert_eq!(err.status_code(), 400);
        assert!(err.is_client_error());
    }

    #[test]
    fn test_store_errors_are_server_side() {
        let err = QueryError::from(StoreError::Unavailable("down".into()));
        assert_eq!(err.code(), "DRAFT_STORE_FAILED");
        assert_eq!(err.status_code(), 500);
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_not_found_code() {
        let err = QueryError::NotFound(Uuid::nil());
        assert_eq!(err.code(), "DRAFT_NOT_FOUND");
        assert_eq!(err.status_code(), 404);
    }
}
