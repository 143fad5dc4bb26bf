//! Order key resolution
//!
//! Maps a requested `order_by` value to a list of sort terms that always
//! ends with `id ASC`.

use crate::error::{QueryError, QueryResult};

/// Used when the request carries no `order_by`
pub const DEFAULT_ORDER: &str = "-created_at";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

/// An underlying sortable quantity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortKey {
    CreatedAt,
    UpdatedAt,
    StartDate,
    TargetDate,
    SortOrder,
    SequenceId,
    Name,
    /// urgent first
    PriorityRank,
    StateName,
    /// backlog first
    StateGroupRank,
    /// min label name ascending, max descending
    LabelName,
    AssigneeName,
    LinkCount,
    AttachmentCount,
    SubIssuesCount,
    Id,
}

impl SortKey {
    /// Keys whose values come from annotations
    pub fn needs_annotations(&self) -> bool {
        matches!(
            self,
            SortKey::LinkCount | SortKey::AttachmentCount | SortKey::SubIssuesCount
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortTerm {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl SortTerm {
    pub fn new(key: SortKey, direction: SortDirection) -> Self {
        Self { key, direction }
    }
}

/// Resolved, fully tie-broken ordering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderingSpec {
    requested: String,
    terms: Vec<SortTerm>,
}

impl OrderingSpec {
    /// The `order_by` value as requested, e.g. `-priority`
    pub fn requested(&self) -> &str {
        &self.requested
    }

    pub fn terms(&self) -> &[SortTerm] {
        &self.terms
    }

    pub fn needs_annotations(&self) -> bool {
        self.terms.iter().any(|t| t.key.needs_annotations())
    }
}

struct OrderKey {
    name: &'static str,
    key: SortKey,
    /// Composite keys fall back to newest-first before the id
    created_tie_break: bool,
}

const fn key(name: &'static str, key: SortKey, created_tie_break: bool) -> OrderKey {
    OrderKey {
        name,
        key,
        created_tie_break,
    }
}

static ORDER_KEYS: &[OrderKey] = &[
    key("created_at", SortKey::CreatedAt, false),
    key("updated_at", SortKey::UpdatedAt, false),
    key("start_date", SortKey::StartDate, false),
    key("target_date", SortKey::TargetDate, false),
    key("sort_order", SortKey::SortOrder, false),
    key("sequence_id", SortKey::SequenceId, false),
    key("name", SortKey::Name, false),
    key("priority", SortKey::PriorityRank, true),
    key("state__name", SortKey::StateName, true),
    key("state__group", SortKey::StateGroupRank, true),
    key("labels__name", SortKey::LabelName, true),
    key("assignees__display_name", SortKey::AssigneeName, true),
    key("link_count", SortKey::LinkCount, false),
    key("attachment_count", SortKey::AttachmentCount, false),
    key("sub_issues_count", SortKey::SubIssuesCount, false),
];

/// Order keys a client may request, without direction prefix
pub fn order_key_names() -> impl Iterator<Item = &'static str> {
    ORDER_KEYS.iter().map(|k| k.name)
}

/// Resolves `order_by`, defaulting to newest first
pub fn resolve_ordering(raw: Option<&str>) -> QueryResult<OrderingSpec> {
    let requested = match raw.map(str::trim) {
        Some(s) if !s.is_empty() => s,
        _ => DEFAULT_ORDER,
    };

    let (name, direction) = match requested.strip_prefix('-') {
        Some(rest) => (rest, SortDirection::Desc),
        None => (requested, SortDirection::Asc),
    };

    let entry = ORDER_KEYS
        .iter()
        .find(|k| k.name == name)
        .ok_or_else(|| QueryError::validation("order_by", format!("unknown order key: {}", requested)))?;

    let mut terms = vec![SortTerm::new(entry.key, direction)];
    if entry.created_tie_break {
        terms.push(SortTerm::new(SortKey::CreatedAt, SortDirection::Desc));
    }
    terms.push(SortTerm::new(SortKey::Id, SortDirection::Asc));

    Ok(OrderingSpec {
        requested: requested.to_string(),
        terms,
    })
}
