//! CLI command implementations
//!
//! `serve` and `query` share one boot sequence: load and validate the
//! config, seed the store, build the engine. Nothing is served if any step
//! fails.

use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::{AllowAll, PermissionGate, ProjectMemberGate};
use crate::engine::{DraftQueryEngine, ListRequest};
use crate::error::QueryError;
use crate::http_server::HttpServer;
use crate::model::ProjectScope;
use crate::observability::{log_event, log_event_with_fields, Event, Logger};
use crate::rest_api::DraftIssueApi;
use crate::store::MemoryStore;

use super::args::Command;
use super::config::{Config, PermissionMode};
use super::errors::{CliError, CliResult};
use super::io::{error_envelope, ok_envelope, read_request, write_envelope, write_response};

/// One request accepted by `query`
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum QueryRequest {
    List {
        workspace_id: Uuid,
        project_id: Uuid,
        #[serde(default)]
        params: ListRequest,
    },
    Fetch {
        workspace_id: Uuid,
        project_id: Uuid,
        actor_id: Uuid,
        issue_id: Uuid,
    },
}

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Init { config } => init(&config),
        Command::Serve { config, port } => serve(&config, port),
        Command::Query { config } => query(&config),
    }
}

/// Write a default configuration file. Refuses to overwrite.
pub fn init(config_path: &Path) -> CliResult<()> {
    if config_path.exists() {
        return Err(CliError::already_initialized(config_path.display()));
    }

    let body = Config::default().to_json_pretty()?;
    fs::write(config_path, body).map_err(|e| {
        CliError::config_error(format!("Failed to write {}: {}", config_path.display(), e))
    })?;

    write_response(json!({
        "initialized": true,
        "config": config_path.display().to_string(),
    }))
}

/// Boot and serve the HTTP API until ctrl-c
pub fn serve(config_path: &Path, port: Option<u16>) -> CliResult<()> {
    let mut config = Config::load(config_path)?;
    if let Some(port) = port {
        config.server.port = port;
    }

    let (store, engine) = boot(config_path, &config)?;

    let gate: Arc<dyn PermissionGate> = match config.permissions {
        PermissionMode::ProjectMembers => Arc::new(ProjectMemberGate::new(store)),
        PermissionMode::AllowAll => Arc::new(AllowAll),
    };
    let api = DraftIssueApi::new(Arc::new(engine), gate).router();
    let server = HttpServer::new(config.server.clone(), api);

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::boot_failed(format!("Failed to create tokio runtime: {}", e)))?;

    rt.block_on(async {
        server
            .start()
            .await
            .map_err(|e| CliError::boot_failed(format!("HTTP server failed: {}", e)))
    })
}

/// Execute one request from stdin and print the result envelope
pub fn query(config_path: &Path) -> CliResult<()> {
    let config = Config::load(config_path)?;
    let (_store, engine) = boot(config_path, &config)?;

    let request: QueryRequest = read_request(&mut io::stdin().lock())?;
    let envelope = execute_query(&engine, request);
    write_envelope(&mut io::stdout(), &envelope)
}

/// Runs a query request. Engine errors become error envelopes.
pub fn execute_query(engine: &DraftQueryEngine<MemoryStore>, request: QueryRequest) -> Value {
    let result: Result<Value, QueryError> = match request {
        QueryRequest::List {
            workspace_id,
            project_id,
            params,
        } => {
            let scope = ProjectScope::new(workspace_id, project_id);
            engine
                .list(&scope, &params)
                .map(|page| serde_json::to_value(page).unwrap_or(Value::Null))
        }
        QueryRequest::Fetch {
            workspace_id,
            project_id,
            actor_id,
            issue_id,
        } => {
            let scope = ProjectScope::new(workspace_id, project_id);
            engine
                .fetch_one(&scope, actor_id, issue_id)
                .map(|detail| serde_json::to_value(detail).unwrap_or(Value::Null))
        }
    };

    match result {
        Ok(data) => ok_envelope(data),
        Err(e) => error_envelope(e.code(), &e.to_string()),
    }
}

/// Seeds the store and builds the engine from a validated config
fn boot(
    config_path: &Path,
    config: &Config,
) -> CliResult<(Arc<MemoryStore>, DraftQueryEngine<MemoryStore>)> {
    Logger::set_min_severity(config.log_level);
    log_event(Event::BootStart);

    let path = config_path.display().to_string();
    log_event_with_fields(Event::ConfigLoaded, &[("path", path.as_str())]);

    let store = match &config.data_file {
        Some(data_file) => MemoryStore::load(data_file),
        None => Ok(MemoryStore::new()),
    }
    .map_err(|e| {
        let reason = e.to_string();
        log_event_with_fields(Event::BootFailed, &[("reason", reason.as_str())]);
        CliError::boot_failed(format!("Failed to seed store: {}", reason))
    })?;

    let issues = store
        .len()
        .map_err(|e| CliError::boot_failed(e.to_string()))?
        .to_string();
    log_event_with_fields(Event::StoreSeeded, &[("issues", issues.as_str())]);

    let store = Arc::new(store);
    let engine = DraftQueryEngine::new(Arc::clone(&store))
        .with_pagination(config.pagination)
        .with_sub_count(config.sub_count_predicate()?);

    Ok((store, engine))
}
