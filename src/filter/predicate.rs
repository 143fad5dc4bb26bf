//! Structured predicate tree
//!
//! A `Predicate` is a conjunction of clauses; each clause is a disjunction
//! of typed operands over a single field. Predicates are storage-agnostic:
//! a store either translates them or evaluates them against an
//! [`IssueFacts`] view of a row.

use chrono::NaiveDate;
use uuid::Uuid;

use crate::model::{InboxStatus, Issue, Priority, StateGroup};

use super::registry::FilterField;

/// Inclusive calendar-date interval; open ends are unbounded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn between(from: NaiveDate, to: NaiveDate) -> Self {
        Self {
            from: Some(from),
            to: Some(to),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from.map_or(true, |f| date >= f) && self.to.map_or(true, |t| date <= t)
    }
}

/// One accepted value of a clause
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Id(Uuid),
    /// Matches an absent value or an empty set
    Null,
    Priority(Priority),
    StateGroup(StateGroup),
    InboxStatus(InboxStatus),
    Range(DateRange),
    Flag(bool),
}

/// Row view a predicate is evaluated against.
///
/// Scalar fields come from the issue row; the rest are joins the store
/// resolves.
pub trait IssueFacts {
    fn issue(&self) -> &Issue;

    fn state_group(&self) -> Option<StateGroup>;

    fn cycle_id(&self) -> Option<Uuid>;

    /// Members of a multi-valued field (labels, assignees, modules, subscribers)
    fn members(&self, field: FilterField) -> Vec<Uuid>;
}

/// Disjunction of operands over one field
#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    pub field: FilterField,
    pub operands: Vec<Operand>,
}

impl Clause {
    pub fn new(field: FilterField, operands: Vec<Operand>) -> Self {
        Self { field, operands }
    }

    pub fn flag(field: FilterField, value: bool) -> Self {
        Self::new(field, vec![Operand::Flag(value)])
    }

    /// True if any operand matches
    pub fn matches<F: IssueFacts + ?Sized>(&self, facts: &F) -> bool {
        self.operands
            .iter()
            .any(|op| operand_matches(self.field, op, facts))
    }
}

fn single_id<F: IssueFacts + ?Sized>(field: FilterField, facts: &F) -> Option<Option<Uuid>> {
    let issue = facts.issue();
    match field {
        FilterField::Id => Some(Some(issue.id)),
        FilterField::State => Some(issue.state_id),
        FilterField::Cycle => Some(facts.cycle_id()),
        FilterField::CreatedBy => Some(issue.created_by),
        FilterField::Parent => Some(issue.parent_id),
        _ => None,
    }
}

fn date_of<F: IssueFacts + ?Sized>(field: FilterField, facts: &F) -> Option<NaiveDate> {
    let issue = facts.issue();
    match field {
        FilterField::StartDate => issue.start_date,
        FilterField::TargetDate => issue.target_date,
        FilterField::CreatedAt => Some(issue.created_at.date_naive()),
        FilterField::UpdatedAt => Some(issue.updated_at.date_naive()),
        _ => None,
    }
}

fn flag_of<F: IssueFacts + ?Sized>(field: FilterField, facts: &F) -> Option<bool> {
    let issue = facts.issue();
    match field {
        FilterField::Draft => Some(issue.is_draft),
        FilterField::Archived => Some(issue.is_archived()),
        FilterField::SubIssue => Some(issue.parent_id.is_some()),
        _ => None,
    }
}

fn operand_matches<F: IssueFacts + ?Sized>(field: FilterField, op: &Operand, facts: &F) -> bool {
    match op {
        Operand::Id(id) => {
            if field.is_multi_valued() {
                facts.members(field).contains(id)
            } else {
                single_id(field, facts) == Some(Some(*id))
            }
        }
        Operand::Null => match field {
            FilterField::StateGroup => facts.state_group().is_none(),
            FilterField::InboxStatus => facts.issue().inbox_status.is_none(),
            f if f.is_multi_valued() => facts.members(f).is_empty(),
            f => single_id(f, facts) == Some(None),
        },
        Operand::Priority(p) => field == FilterField::Priority && facts.issue().priority == *p,
        Operand::StateGroup(g) => {
            field == FilterField::StateGroup && facts.state_group() == Some(*g)
        }
        Operand::InboxStatus(s) => {
            field == FilterField::InboxStatus && facts.issue().inbox_status == Some(*s)
        }
        Operand::Range(range) => date_of(field, facts).is_some_and(|d| range.contains(d)),
        Operand::Flag(expected) => flag_of(field, facts) == Some(*expected),
    }
}

/// Conjunction of clauses
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    clauses: Vec<Clause>,
}

impl Predicate {
    /// The implicit draft scope every client query starts from
    pub fn draft_scope() -> Self {
        Self {
            clauses: vec![Clause::flag(FilterField::Draft, true)],
        }
    }

    /// Matches every issue in scope, drafts or not. Write-path lookups only.
    pub(crate) fn any_issue() -> Self {
        Self {
            clauses: Vec::new(),
        }
    }

    /// Draft-scoped lookup of a single id
    pub fn by_id(id: Uuid) -> Self {
        Self::draft_scope().and(Clause::new(FilterField::Id, vec![Operand::Id(id)]))
    }

    /// Adds a clause. A second clause on the same field narrows further.
    pub fn and(mut self, clause: Clause) -> Self {
        self.clauses.push(clause);
        self
    }

    /// Copy without any clause on `field`. The draft scope is never removed.
    pub fn without(&self, field: FilterField) -> Self {
        Self {
            clauses: self
                .clauses
                .iter()
                .filter(|c| c.field != field || c.field == FilterField::Draft)
                .cloned()
                .collect(),
        }
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    pub fn constrains(&self, field: FilterField) -> bool {
        self.clauses.iter().any(|c| c.field == field)
    }

    /// Field names referenced, for logging
    pub fn fields(&self) -> Vec<&'static str> {
        self.clauses.iter().map(|c| c.field.name()).collect()
    }

    pub fn matches<F: IssueFacts + ?Sized>(&self, facts: &F) -> bool {
        self.clauses.iter().all(|c| c.matches(facts))
    }
}
