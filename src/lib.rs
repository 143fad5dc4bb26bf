//! draftq - query service for draft issues
//!
//! Lists, groups, paginates and shapes draft issues for one project at a
//! time. Client filter parameters compile to a typed predicate; ordering,
//! grouping and pagination run over a pluggable record store, and every
//! page is materialized with its annotations and associations batch-loaded.

pub mod activity;
pub mod annotate;
pub mod auth;
pub mod cli;
pub mod engine;
pub mod error;
pub mod filter;
pub mod grouping;
pub mod http_server;
pub mod materialize;
pub mod model;
pub mod observability;
pub mod ordering;
pub mod paginate;
pub mod rest_api;
pub mod store;

pub use engine::{DraftInput, DraftPatch, DraftQueryEngine, ListRequest, ListResponse};
pub use error::{QueryError, QueryResult};
