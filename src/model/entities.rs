//! Project entities and related collections
//!
//! Only the fields needed for counts, memberships, group keys and
//! name-based ordering are modelled here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::issue::StateGroup;

/// Project settings the write path consults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub workspace_id: Uuid,
    #[serde(default)]
    pub default_assignee_id: Option<Uuid>,
}

/// Workflow state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct State {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    pub group: StateGroup,
    #[serde(default)]
    pub sequence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub sort_order: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cycle {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
}

/// Project member (assignee / creator candidates)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub id: Uuid,
    pub project_id: Uuid,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueLink {
    pub id: Uuid,
    pub issue_id: Uuid,
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueAttachment {
    pub id: Uuid,
    pub issue_id: Uuid,
    pub asset: String,
    #[serde(default)]
    pub size: u64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueReaction {
    pub id: Uuid,
    pub issue_id: Uuid,
    pub actor_id: Uuid,
    pub reaction: String,
}
