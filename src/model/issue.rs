//! Draft issue rows and their ranked enumerations

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default manual sort position for new issues.
pub const DEFAULT_SORT_ORDER: f64 = 65535.0;

/// Workspace/project pair every query is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectScope {
    pub workspace_id: Uuid,
    pub project_id: Uuid,
}

impl ProjectScope {
    pub fn new(workspace_id: Uuid, project_id: Uuid) -> Self {
        Self {
            workspace_id,
            project_id,
        }
    }

    /// Returns true if the issue lives in this scope
    pub fn contains(&self, issue: &Issue) -> bool {
        issue.workspace_id == self.workspace_id && issue.project_id == self.project_id
    }
}

/// Issue priority
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Urgent,
    High,
    Medium,
    Low,
    #[default]
    None,
}

impl Priority {
    /// All priorities, most pressing first
    pub const ALL: [Priority; 5] = [
        Priority::Urgent,
        Priority::High,
        Priority::Medium,
        Priority::Low,
        Priority::None,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Urgent => "urgent",
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
            Priority::None => "none",
        }
    }

    /// Rank used for ordering; lower is more pressing.
    pub fn rank(&self) -> u8 {
        match self {
            Priority::Urgent => 0,
            Priority::High => 1,
            Priority::Medium => 2,
            Priority::Low => 3,
            Priority::None => 4,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Priority {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Priority::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or(())
    }
}

/// Workflow group a state belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateGroup {
    Backlog,
    Unstarted,
    Started,
    Completed,
    Cancelled,
}

impl StateGroup {
    /// All groups in workflow order
    pub const ALL: [StateGroup; 5] = [
        StateGroup::Backlog,
        StateGroup::Unstarted,
        StateGroup::Started,
        StateGroup::Completed,
        StateGroup::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StateGroup::Backlog => "backlog",
            StateGroup::Unstarted => "unstarted",
            StateGroup::Started => "started",
            StateGroup::Completed => "completed",
            StateGroup::Cancelled => "cancelled",
        }
    }

    pub fn rank(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for StateGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for StateGroup {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StateGroup::ALL
            .into_iter()
            .find(|g| g.as_str() == s)
            .ok_or(())
    }
}

/// Intake triage status of an issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InboxStatus {
    Pending,
    Declined,
    Snoozed,
    Accepted,
    Duplicate,
}

impl InboxStatus {
    pub const ALL: [InboxStatus; 5] = [
        InboxStatus::Pending,
        InboxStatus::Declined,
        InboxStatus::Snoozed,
        InboxStatus::Accepted,
        InboxStatus::Duplicate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InboxStatus::Pending => "pending",
            InboxStatus::Declined => "declined",
            InboxStatus::Snoozed => "snoozed",
            InboxStatus::Accepted => "accepted",
            InboxStatus::Duplicate => "duplicate",
        }
    }
}

impl FromStr for InboxStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        InboxStatus::ALL
            .into_iter()
            .find(|st| st.as_str() == s)
            .ok_or(())
    }
}

/// Scalar row of a draft issue.
///
/// Multi-valued associations (assignees, labels, modules) live in the
/// store and are attached by the materializer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub project_id: Uuid,
    #[serde(default)]
    pub sequence_id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub state_id: Option<Uuid>,
    #[serde(default)]
    pub parent_id: Option<Uuid>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub target_date: Option<NaiveDate>,
    #[serde(default = "default_sort_order")]
    pub sort_order: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub created_by: Option<Uuid>,
    #[serde(default)]
    pub archived_at: Option<DateTime<Utc>>,
    #[serde(default = "default_is_draft")]
    pub is_draft: bool,
    #[serde(default)]
    pub inbox_status: Option<InboxStatus>,
}

fn default_sort_order() -> f64 {
    DEFAULT_SORT_ORDER
}

fn default_is_draft() -> bool {
    true
}

impl Issue {
    /// Creates a draft with the given name, stamped at `now`
    pub fn draft(scope: ProjectScope, name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            workspace_id: scope.workspace_id,
            project_id: scope.project_id,
            sequence_id: 0,
            name: name.into(),
            description: None,
            priority: Priority::None,
            state_id: None,
            parent_id: None,
            start_date: None,
            target_date: None,
            sort_order: DEFAULT_SORT_ORDER,
            created_at: now,
            updated_at: now,
            created_by: None,
            archived_at: None,
            is_draft: true,
            inbox_status: None,
        }
    }

    pub fn is_archived(&self) -> bool {
        self.archived_at.is_some()
    }
}

/// Derived per-record values computed at query time
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Annotations {
    pub link_count: u64,
    pub attachment_count: u64,
    pub sub_issues_count: u64,
    pub cycle_id: Option<Uuid>,
    /// Only present when the plan asked for it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_subscribed: Option<bool>,
}

/// An issue row paired with its annotations
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedIssue {
    pub issue: Issue,
    pub annotations: Annotations,
}

impl AnnotatedIssue {
    /// Wraps a row with zeroed annotations
    pub fn bare(issue: Issue) -> Self {
        Self {
            issue,
            annotations: Annotations::default(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.issue.id
    }
}
