//! Record store
//!
//! The engine never touches storage directly. Everything it needs from the
//! backing collection goes through [`RecordStore`]: predicate filtering,
//! annotation over an id set, ordering, counts, and batched association
//! lookups keyed by record id.
//!
//! Each call observes a consistent snapshot. Nothing is cached between
//! calls.

mod dataset;
mod errors;
mod memory;

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::annotate::AnnotationPlan;
use crate::filter::Predicate;
use crate::grouping::{GroupField, GroupKey};
use crate::model::{
    AnnotatedIssue, Annotations, Issue, IssueAttachment, IssueLink, IssueReaction, Project,
    ProjectScope, State,
};
use crate::ordering::OrderingSpec;

pub use dataset::{Dataset, Membership};
pub use errors::{StoreError, StoreResult};
pub use memory::MemoryStore;

/// A related collection reachable from an issue id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relation {
    Assignees,
    Labels,
    Modules,
    /// At most one cycle per issue
    CycleLinks,
    Subscriptions,
    State,
    Links,
    Attachments,
    Reactions,
    /// Live children: not drafts, not archived
    SubIssues,
}

impl Relation {
    pub fn name(&self) -> &'static str {
        match self {
            Relation::Assignees => "assignees",
            Relation::Labels => "labels",
            Relation::Modules => "modules",
            Relation::CycleLinks => "cycle_links",
            Relation::Subscriptions => "subscriptions",
            Relation::State => "state",
            Relation::Links => "links",
            Relation::Attachments => "attachments",
            Relation::Reactions => "reactions",
            Relation::SubIssues => "sub_issues",
        }
    }
}

/// One related row returned by [`RecordStore::batch_load`]
#[derive(Debug, Clone, PartialEq)]
pub enum Related {
    /// Membership rows and child ids
    Id(Uuid),
    State(State),
    Link(IssueLink),
    Attachment(IssueAttachment),
    Reaction(IssueReaction),
}

impl Related {
    pub fn as_id(&self) -> Option<Uuid> {
        match self {
            Related::Id(id) => Some(*id),
            _ => None,
        }
    }
}

/// Association sets written alongside an issue. `None` leaves a set untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Associations {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee_ids: Option<BTreeSet<Uuid>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_ids: Option<BTreeSet<Uuid>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_ids: Option<BTreeSet<Uuid>>,
}

impl Associations {
    pub fn is_empty(&self) -> bool {
        self.assignee_ids.is_none() && self.label_ids.is_none() && self.module_ids.is_none()
    }
}

/// Backing collection of draft issues and their related rows
pub trait RecordStore: Send + Sync {
    /// Rows in `scope` matching `predicate`, in unspecified order
    fn filter(&self, scope: &ProjectScope, predicate: &Predicate) -> StoreResult<Vec<Issue>>;

    /// Evaluates `plan` for every id in one pass per relation
    fn annotate(
        &self,
        ids: &[Uuid],
        plan: &AnnotationPlan,
    ) -> StoreResult<HashMap<Uuid, Annotations>>;

    /// Sorts rows by `spec`. Count keys read the rows' annotations.
    fn order(
        &self,
        rows: Vec<AnnotatedIssue>,
        spec: &OrderingSpec,
    ) -> StoreResult<Vec<AnnotatedIssue>>;

    fn count(&self, scope: &ProjectScope, predicate: &Predicate) -> StoreResult<usize>;

    /// Related rows for each id. Every requested id has an entry.
    fn batch_load(
        &self,
        relation: Relation,
        ids: &[Uuid],
    ) -> StoreResult<HashMap<Uuid, Vec<Related>>>;

    /// Project entity ids usable as group keys, in creation order.
    /// Enum-valued fields have no entity universe and return nothing.
    fn group_keys(&self, scope: &ProjectScope, field: GroupField) -> StoreResult<Vec<GroupKey>>;

    fn project(&self, scope: &ProjectScope) -> StoreResult<Option<Project>>;

    fn is_member(&self, scope: &ProjectScope, actor: Uuid) -> StoreResult<bool>;

    /// Sequence id the next insert into `scope` receives
    fn next_sequence_id(&self, scope: &ProjectScope) -> StoreResult<i64>;

    /// Inserts a row, assigning its sequence id. Returns the stored row.
    fn insert(&self, issue: Issue, associations: &Associations) -> StoreResult<Issue>;

    /// Replaces an existing row and any association set given
    fn update(&self, issue: Issue, associations: &Associations) -> StoreResult<()>;

    /// Permanently removes a row and its related rows. False when absent.
    fn delete(&self, scope: &ProjectScope, id: Uuid) -> StoreResult<bool>;
}
