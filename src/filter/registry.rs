//! Filter field registry
//!
//! The fixed set of fields a predicate may reference. Client requests may
//! only use `Public` entries; `Internal` entries exist for server-side
//! predicates (draft scope, sub-count badges, id lookups).

/// A filterable field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FilterField {
    Id,
    Draft,
    Archived,
    InboxStatus,
    State,
    StateGroup,
    Priority,
    Labels,
    Assignees,
    Modules,
    Cycle,
    CreatedBy,
    Parent,
    Subscriber,
    StartDate,
    TargetDate,
    CreatedAt,
    UpdatedAt,
    SubIssue,
}

/// Value type accepted by a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// UUID membership; `nullable` admits the `null` token
    Id { nullable: bool },
    Priority,
    StateGroup { nullable: bool },
    InboxStatus { nullable: bool },
    /// Inclusive calendar-date range
    Date,
    Flag,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exposure {
    Public,
    Internal,
}

/// Registry entry
#[derive(Debug)]
pub struct FieldSpec {
    pub name: &'static str,
    pub field: FilterField,
    pub kind: ValueKind,
    pub exposure: Exposure,
    /// Field holds a set of values rather than one
    pub multi_valued: bool,
    /// Storage path the predicate targets
    pub path: &'static str,
}

const fn spec(
    name: &'static str,
    field: FilterField,
    kind: ValueKind,
    exposure: Exposure,
    multi_valued: bool,
    path: &'static str,
) -> FieldSpec {
    FieldSpec {
        name,
        field,
        kind,
        exposure,
        multi_valued,
        path,
    }
}

use Exposure::{Internal, Public};

/// All known fields, in evaluation order
pub static REGISTRY: &[FieldSpec] = &[
    spec("id", FilterField::Id, ValueKind::Id { nullable: false }, Internal, false, "issue.id"),
    spec("draft", FilterField::Draft, ValueKind::Flag, Internal, false, "issue.is_draft"),
    spec("archived", FilterField::Archived, ValueKind::Flag, Internal, false, "issue.archived_at"),
    spec(
        "inbox_status",
        FilterField::InboxStatus,
        ValueKind::InboxStatus { nullable: true },
        Internal,
        false,
        "issue_inbox.status",
    ),
    spec("state", FilterField::State, ValueKind::Id { nullable: true }, Public, false, "issue.state_id"),
    spec(
        "state_group",
        FilterField::StateGroup,
        ValueKind::StateGroup { nullable: true },
        Public,
        false,
        "state.group",
    ),
    spec("priority", FilterField::Priority, ValueKind::Priority, Public, false, "issue.priority"),
    spec("labels", FilterField::Labels, ValueKind::Id { nullable: true }, Public, true, "issue_label.label_id"),
    spec(
        "assignees",
        FilterField::Assignees,
        ValueKind::Id { nullable: true },
        Public,
        true,
        "issue_assignee.assignee_id",
    ),
    spec("modules", FilterField::Modules, ValueKind::Id { nullable: true }, Public, true, "module_issue.module_id"),
    spec("cycle", FilterField::Cycle, ValueKind::Id { nullable: true }, Public, false, "cycle_issue.cycle_id"),
    spec("created_by", FilterField::CreatedBy, ValueKind::Id { nullable: false }, Public, false, "issue.created_by"),
    spec("parent", FilterField::Parent, ValueKind::Id { nullable: false }, Public, false, "issue.parent_id"),
    spec(
        "subscriber",
        FilterField::Subscriber,
        ValueKind::Id { nullable: false },
        Public,
        true,
        "issue_subscriber.subscriber_id",
    ),
    spec("start_date", FilterField::StartDate, ValueKind::Date, Public, false, "issue.start_date"),
    spec("target_date", FilterField::TargetDate, ValueKind::Date, Public, false, "issue.target_date"),
    spec("created_at", FilterField::CreatedAt, ValueKind::Date, Public, false, "issue.created_at"),
    spec("updated_at", FilterField::UpdatedAt, ValueKind::Date, Public, false, "issue.updated_at"),
    spec("sub_issue", FilterField::SubIssue, ValueKind::Flag, Public, false, "issue.parent_id"),
];

/// Looks up a field by its request name
pub fn lookup(name: &str) -> Option<&'static FieldSpec> {
    REGISTRY.iter().find(|s| s.name == name)
}

/// Names a client may filter on
pub fn public_names() -> impl Iterator<Item = &'static str> {
    REGISTRY
        .iter()
        .filter(|s| s.exposure == Exposure::Public)
        .map(|s| s.name)
}

impl FilterField {
    /// Registry entry for this field
    pub fn spec(&self) -> &'static FieldSpec {
        REGISTRY
            .iter()
            .find(|s| s.field == *self)
            .unwrap_or(&REGISTRY[0])
    }

    pub fn name(&self) -> &'static str {
        self.spec().name
    }

    pub fn is_multi_valued(&self) -> bool {
        self.spec().multi_valued
    }
}
