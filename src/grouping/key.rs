//! Group fields and group keys

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};
use uuid::Uuid;

use crate::error::{QueryError, QueryResult};
use crate::filter::{Clause, FilterField, Operand};
use crate::model::{Issue, Priority, StateGroup};
use crate::store::{Related, Relation};

/// Rendering of the sentinel group for records without a value
pub const NONE_KEY: &str = "None";

/// A field records can be grouped by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupField {
    State,
    Priority,
    StateGroup,
    Labels,
    Assignees,
    Modules,
    Cycle,
    CreatedBy,
}

impl GroupField {
    pub const ALL: [GroupField; 8] = [
        GroupField::State,
        GroupField::Priority,
        GroupField::StateGroup,
        GroupField::Labels,
        GroupField::Assignees,
        GroupField::Modules,
        GroupField::Cycle,
        GroupField::CreatedBy,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            GroupField::State => "state",
            GroupField::Priority => "priority",
            GroupField::StateGroup => "state_group",
            GroupField::Labels => "labels",
            GroupField::Assignees => "assignees",
            GroupField::Modules => "modules",
            GroupField::Cycle => "cycle",
            GroupField::CreatedBy => "created_by",
        }
    }

    /// Parses a `group_by` value. Accepts the `state__group` alias too.
    pub fn parse(raw: &str) -> QueryResult<Self> {
        let name = match raw.trim() {
            "state__group" => "state_group",
            other => other,
        };
        Self::ALL
            .into_iter()
            .find(|f| f.name() == name)
            .ok_or_else(|| QueryError::validation("group_by", format!("unknown group field: {}", raw)))
    }

    /// A record may land in several groups
    pub fn is_multi_valued(&self) -> bool {
        matches!(
            self,
            GroupField::Labels | GroupField::Assignees | GroupField::Modules
        )
    }

    /// Records can lack a value and fall into the `None` group
    pub fn is_nullable(&self) -> bool {
        !matches!(self, GroupField::Priority)
    }

    /// Filter field carrying the same membership
    pub fn filter_field(&self) -> FilterField {
        match self {
            GroupField::State => FilterField::State,
            GroupField::Priority => FilterField::Priority,
            GroupField::StateGroup => FilterField::StateGroup,
            GroupField::Labels => FilterField::Labels,
            GroupField::Assignees => FilterField::Assignees,
            GroupField::Modules => FilterField::Modules,
            GroupField::Cycle => FilterField::Cycle,
            GroupField::CreatedBy => FilterField::CreatedBy,
        }
    }

    /// Relation to batch-load for keys not stored on the issue row
    pub fn relation(&self) -> Option<Relation> {
        match self {
            GroupField::StateGroup => Some(Relation::State),
            GroupField::Labels => Some(Relation::Labels),
            GroupField::Assignees => Some(Relation::Assignees),
            GroupField::Modules => Some(Relation::Modules),
            GroupField::Cycle => Some(Relation::CycleLinks),
            GroupField::State | GroupField::Priority | GroupField::CreatedBy => None,
        }
    }

    /// Keys in fixed enum order, for enum-valued fields
    pub fn fixed_keys(&self) -> Vec<GroupKey> {
        match self {
            GroupField::Priority => Priority::ALL.into_iter().map(GroupKey::Priority).collect(),
            GroupField::StateGroup => {
                StateGroup::ALL.into_iter().map(GroupKey::StateGroup).collect()
            }
            _ => Vec::new(),
        }
    }

    /// Parses a `group_key` value for this field
    pub fn parse_key(&self, raw: &str) -> QueryResult<GroupKey> {
        let raw = raw.trim();
        if raw == NONE_KEY || raw.eq_ignore_ascii_case("null") {
            return if self.is_nullable() {
                Ok(GroupKey::None)
            } else {
                Err(QueryError::validation("group_key", format!("{} has no None group", self.name())))
            };
        }

        let invalid = || QueryError::validation("group_key", format!("invalid {} key: {}", self.name(), raw));
        match self {
            GroupField::Priority => Priority::from_str(raw)
                .map(GroupKey::Priority)
                .map_err(|_| invalid()),
            GroupField::StateGroup => StateGroup::from_str(raw)
                .map(GroupKey::StateGroup)
                .map_err(|_| invalid()),
            _ => Uuid::parse_str(raw).map(GroupKey::Id).map_err(|_| invalid()),
        }
    }

    /// Membership clause selecting exactly the records of one group
    pub fn clause_for(&self, key: &GroupKey) -> Clause {
        let operand = match key {
            GroupKey::Id(id) => Operand::Id(*id),
            GroupKey::Priority(p) => Operand::Priority(*p),
            GroupKey::StateGroup(g) => Operand::StateGroup(*g),
            GroupKey::None => Operand::Null,
        };
        Clause::new(self.filter_field(), vec![operand])
    }

    /// Keys one record belongs to, given its rows of [`Self::relation`]
    pub fn keys_of(&self, issue: &Issue, related: &[Related]) -> Vec<GroupKey> {
        let single = |id: Option<Uuid>| vec![id.map_or(GroupKey::None, GroupKey::Id)];

        match self {
            GroupField::State => single(issue.state_id),
            GroupField::CreatedBy => single(issue.created_by),
            GroupField::Priority => vec![GroupKey::Priority(issue.priority)],
            GroupField::StateGroup => {
                let group = related.iter().find_map(|r| match r {
                    Related::State(state) => Some(state.group),
                    _ => None,
                });
                vec![group.map_or(GroupKey::None, GroupKey::StateGroup)]
            }
            GroupField::Cycle => single(related.iter().find_map(Related::as_id)),
            GroupField::Labels | GroupField::Assignees | GroupField::Modules => {
                let keys: Vec<GroupKey> =
                    related.iter().filter_map(Related::as_id).map(GroupKey::Id).collect();
                if keys.is_empty() {
                    vec![GroupKey::None]
                } else {
                    keys
                }
            }
        }
    }
}

/// Identity of one group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GroupKey {
    Id(Uuid),
    Priority(Priority),
    StateGroup(StateGroup),
    /// Records with no value for the group field
    None,
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKey::Id(id) => write!(f, "{}", id),
            GroupKey::Priority(p) => write!(f, "{}", p),
            GroupKey::StateGroup(g) => write!(f, "{}", g),
            GroupKey::None => f.write_str(NONE_KEY),
        }
    }
}

impl Serialize for GroupKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
