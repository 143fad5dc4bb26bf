//! Draft activity events
//!
//! Writes emit one event each through an [`ActivitySink`]. Sinks are
//! fire-and-forget: a sink failure never fails the write.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::model::ProjectScope;
use crate::observability::Logger;

/// Kind of change recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ActivityKind {
    #[serde(rename = "issue_draft.activity.created")]
    Created,
    #[serde(rename = "issue_draft.activity.updated")]
    Updated,
    #[serde(rename = "issue_draft.activity.deleted")]
    Deleted,
}

impl ActivityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityKind::Created => "issue_draft.activity.created",
            ActivityKind::Updated => "issue_draft.activity.updated",
            ActivityKind::Deleted => "issue_draft.activity.deleted",
        }
    }
}

/// One recorded change to a draft issue
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityEvent {
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    pub actor_id: Uuid,
    pub issue_id: Uuid,
    pub project_id: Uuid,
    pub workspace_id: Uuid,
    /// Record as it was before the change; absent on create
    pub previous_state: Option<Value>,
    pub requested_data: Option<Value>,
    /// Unix seconds
    pub epoch: i64,
    pub origin: Option<String>,
}

impl ActivityEvent {
    pub fn new(
        kind: ActivityKind,
        scope: &ProjectScope,
        actor_id: Uuid,
        issue_id: Uuid,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            kind,
            actor_id,
            issue_id,
            project_id: scope.project_id,
            workspace_id: scope.workspace_id,
            previous_state: None,
            requested_data: None,
            epoch: at.timestamp(),
            origin: None,
        }
    }

    pub fn with_previous_state(mut self, state: Value) -> Self {
        self.previous_state = Some(state);
        self
    }

    pub fn with_requested_data(mut self, data: Value) -> Self {
        self.requested_data = Some(data);
        self
    }

    pub fn with_origin(mut self, origin: Option<String>) -> Self {
        self.origin = origin;
        self
    }
}

/// Receives activity events
pub trait ActivitySink: Send + Sync {
    fn record(&self, event: &ActivityEvent);
}

/// Writes each event as one structured log line
#[derive(Debug, Default, Clone, Copy)]
pub struct LogActivitySink;

impl ActivitySink for LogActivitySink {
    fn record(&self, event: &ActivityEvent) {
        let actor = event.actor_id.to_string();
        let issue = event.issue_id.to_string();
        let project = event.project_id.to_string();
        let epoch = event.epoch.to_string();
        let mut fields = vec![
            ("type", event.kind.as_str()),
            ("actor_id", actor.as_str()),
            ("issue_id", issue.as_str()),
            ("project_id", project.as_str()),
            ("epoch", epoch.as_str()),
        ];
        if let Some(origin) = &event.origin {
            fields.push(("origin", origin.as_str()));
        }
        Logger::info("DRAFT_ACTIVITY", &fields);
    }
}

/// Keeps events in memory
#[derive(Debug, Default, Clone)]
pub struct MemoryActivitySink {
    events: Arc<Mutex<Vec<ActivityEvent>>>,
}

impl MemoryActivitySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ActivityEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ActivitySink for MemoryActivitySink {
    fn record(&self, event: &ActivityEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }
}
