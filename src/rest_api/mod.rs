//! # Draft Issue REST API
//!
//! HTTP endpoints for listing, retrieving and writing draft issues, with
//! the permission gate applied before every operation.

pub mod errors;
pub mod server;

pub use errors::{ErrorResponse, RestError, RestResult};
pub use server::{DraftIssueApi, ACTOR_HEADER, DRAFT_ISSUES_PATH, ORIGIN_HEADER};
