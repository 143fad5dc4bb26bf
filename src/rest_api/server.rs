//! # Draft Issue HTTP Endpoints
//!
//! Axum routes over [`DraftQueryEngine`]. Every handler authorizes the actor
//! through the permission gate before the engine runs. Listings are
//! gzip-compressed for clients that accept it.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    handler::Handler,
    http::{HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tower_http::compression::CompressionLayer;
use uuid::Uuid;

use crate::auth::{Action, PermissionGate};
use crate::engine::{DraftInput, DraftPatch, DraftQueryEngine, ListRequest, ListResponse};
use crate::error::QueryError;
use crate::materialize::{DraftIssue, DraftIssueDetail};
use crate::model::ProjectScope;
use crate::observability::{Event, Logger};
use crate::store::RecordStore;

use super::errors::{RestError, RestResult};

/// Header carrying the authenticated actor id
pub const ACTOR_HEADER: &str = "x-actor-id";

/// Header carrying the client origin recorded on activity events
pub const ORIGIN_HEADER: &str = "origin";

/// Base path of the draft-issue resource
pub const DRAFT_ISSUES_PATH: &str = "/api/workspaces/:workspace_id/projects/:project_id/draft-issues";

/// Draft issue API state
pub struct DraftIssueApi<S: RecordStore + ?Sized> {
    engine: Arc<DraftQueryEngine<S>>,
    gate: Arc<dyn PermissionGate>,
}

impl<S: RecordStore + ?Sized + 'static> DraftIssueApi<S> {
    pub fn new(engine: Arc<DraftQueryEngine<S>>, gate: Arc<dyn PermissionGate>) -> Self {
        Self { engine, gate }
    }

    /// Build the Axum router
    pub fn router(self) -> Router {
        let state = Arc::new(self);
        let item_path = format!("{}/:issue_id", DRAFT_ISSUES_PATH);

        Router::new()
            .route(
                DRAFT_ISSUES_PATH,
                get(list_handler::<S>.layer(CompressionLayer::new()))
                    .post(create_handler::<S>),
            )
            .route(
                &item_path,
                get(retrieve_handler::<S>)
                    .patch(update_handler::<S>)
                    .delete(delete_handler::<S>),
            )
            .with_state(state)
    }

    fn authorize(&self, scope: &ProjectScope, actor: Uuid, action: Action) -> RestResult<()> {
        self.gate.authorize(scope, actor, action).map_err(|err| {
            if let QueryError::Forbidden(_) = err {
                let project = scope.project_id.to_string();
                let actor = actor.to_string();
                Logger::warn(
                    Event::AccessDenied.as_str(),
                    &[
                        ("project_id", project.as_str()),
                        ("actor_id", actor.as_str()),
                        ("action", action.as_str()),
                    ],
                );
            }
            RestError::from(err)
        })
    }
}

/// Shared state type
type ApiState<S> = Arc<DraftIssueApi<S>>;

fn parse_id(name: &'static str, raw: &str) -> RestResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| RestError::InvalidPath(name, raw.to_string()))
}

fn scope_of(workspace_id: &str, project_id: &str) -> RestResult<ProjectScope> {
    Ok(ProjectScope::new(
        parse_id("workspace_id", workspace_id)?,
        parse_id("project_id", project_id)?,
    ))
}

/// Actor id from the request headers
fn extract_actor(headers: &HeaderMap) -> RestResult<Uuid> {
    let raw = headers
        .get(ACTOR_HEADER)
        .ok_or(RestError::MissingHeader(ACTOR_HEADER))?
        .to_str()
        .map_err(|e| RestError::InvalidHeader(ACTOR_HEADER, e.to_string()))?;
    Uuid::parse_str(raw.trim()).map_err(|_| RestError::InvalidHeader(ACTOR_HEADER, raw.to_string()))
}

fn extract_origin(headers: &HeaderMap) -> Option<String> {
    headers
        .get(ORIGIN_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Decodes a JSON body; shape errors are validation errors on `body`
fn parse_body<T: DeserializeOwned>(body: Result<Json<Value>, JsonRejection>) -> RestResult<T> {
    let Json(value) = body.map_err(|e| RestError::InvalidBody(e.body_text()))?;
    serde_json::from_value(value)
        .map_err(|e| RestError::from(QueryError::validation("body", e.to_string())))
}

/// List handler
async fn list_handler<S: RecordStore + ?Sized + 'static>(
    State(api): State<ApiState<S>>,
    Path((workspace_id, project_id)): Path<(String, String)>,
    Query(pairs): Query<Vec<(String, String)>>,
    headers: HeaderMap,
) -> RestResult<Json<ListResponse>> {
    let scope = scope_of(&workspace_id, &project_id)?;
    let actor = extract_actor(&headers)?;
    api.authorize(&scope, actor, Action::List)?;

    let request = ListRequest::from_pairs(pairs);
    Ok(Json(api.engine.list(&scope, &request)?))
}

/// Create handler
async fn create_handler<S: RecordStore + ?Sized + 'static>(
    State(api): State<ApiState<S>>,
    Path((workspace_id, project_id)): Path<(String, String)>,
    headers: HeaderMap,
    body: Result<Json<Value>, JsonRejection>,
) -> RestResult<(StatusCode, Json<DraftIssue>)> {
    let scope = scope_of(&workspace_id, &project_id)?;
    let actor = extract_actor(&headers)?;
    api.authorize(&scope, actor, Action::Create)?;

    let input: DraftInput = parse_body(body)?;
    let created = api
        .engine
        .create(&scope, actor, input, extract_origin(&headers))?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Retrieve handler
async fn retrieve_handler<S: RecordStore + ?Sized + 'static>(
    State(api): State<ApiState<S>>,
    Path((workspace_id, project_id, issue_id)): Path<(String, String, String)>,
    headers: HeaderMap,
) -> RestResult<Json<DraftIssueDetail>> {
    let scope = scope_of(&workspace_id, &project_id)?;
    let id = parse_id("issue_id", &issue_id)?;
    let actor = extract_actor(&headers)?;
    api.authorize(&scope, actor, Action::Retrieve)?;

    Ok(Json(api.engine.fetch_one(&scope, actor, id)?))
}

/// Partial update handler
async fn update_handler<S: RecordStore + ?Sized + 'static>(
    State(api): State<ApiState<S>>,
    Path((workspace_id, project_id, issue_id)): Path<(String, String, String)>,
    headers: HeaderMap,
    body: Result<Json<Value>, JsonRejection>,
) -> RestResult<StatusCode> {
    let scope = scope_of(&workspace_id, &project_id)?;
    let id = parse_id("issue_id", &issue_id)?;
    let actor = extract_actor(&headers)?;
    api.authorize(&scope, actor, Action::Update)?;

    let patch: DraftPatch = parse_body(body)?;
    api.engine
        .update(&scope, actor, id, patch, extract_origin(&headers))?;
    Ok(StatusCode::NO_CONTENT)
}

/// Delete handler
async fn delete_handler<S: RecordStore + ?Sized + 'static>(
    State(api): State<ApiState<S>>,
    Path((workspace_id, project_id, issue_id)): Path<(String, String, String)>,
    headers: HeaderMap,
) -> RestResult<StatusCode> {
    let scope = scope_of(&workspace_id, &project_id)?;
    let id = parse_id("issue_id", &issue_id)?;
    let actor = extract_actor(&headers)?;
    api.authorize(&scope, actor, Action::Delete)?;

    api.engine.delete(&scope, actor, id, extract_origin(&headers))?;
    Ok(StatusCode::NO_CONTENT)
}
