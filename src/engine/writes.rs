//! Create, update and delete of draft issues
//!
//! Writes validate their payload and every referenced entity, store the
//! change, then emit one activity event. Parent links must stay a tree
//! inside the project.

use std::collections::{BTreeSet, HashSet};

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::activity::{ActivityEvent, ActivityKind};
use crate::annotate::AnnotationPlan;
use crate::error::{QueryError, QueryResult};
use crate::filter::{Clause, FilterField, Operand, Predicate};
use crate::grouping::{GroupField, GroupKey};
use crate::materialize::{DraftIssue, Materializer};
use crate::model::{AnnotatedIssue, Issue, Priority, ProjectScope};
use crate::observability::{Event, Logger};
use crate::store::{Associations, RecordStore};

use super::DraftQueryEngine;

/// Longest accepted issue name, in characters
pub const MAX_NAME_LEN: usize = 255;

/// Payload of a create
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DraftInput {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<f64>,
    #[serde(flatten)]
    pub associations: Associations,
}

impl DraftInput {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Payload of a partial update. Absent fields stay untouched; an explicit
/// `null` clears a nullable field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DraftPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub state_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub start_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub target_date: Option<Option<NaiveDate>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<f64>,
    #[serde(flatten)]
    pub associations: Associations,
}

/// Marks a field present, keeping an explicit `null` as `Some(None)`
fn present<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

impl DraftPatch {
    fn apply(&self, issue: &mut Issue) {
        if let Some(name) = &self.name {
            issue.name = name.clone();
        }
        if let Some(description) = &self.description {
            issue.description = description.clone();
        }
        if let Some(priority) = self.priority {
            issue.priority = priority;
        }
        if let Some(state_id) = self.state_id {
            issue.state_id = state_id;
        }
        if let Some(parent_id) = self.parent_id {
            issue.parent_id = parent_id;
        }
        if let Some(start_date) = self.start_date {
            issue.start_date = start_date;
        }
        if let Some(target_date) = self.target_date {
            issue.target_date = target_date;
        }
        if let Some(sort_order) = self.sort_order {
            issue.sort_order = sort_order;
        }
    }
}

fn check_name(name: &str) -> QueryResult<()> {
    if name.trim().is_empty() {
        return Err(QueryError::validation("name", "must not be empty"));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(QueryError::validation(
            "name",
            format!("longer than {} characters", MAX_NAME_LEN),
        ));
    }
    Ok(())
}

fn check_dates(issue: &Issue) -> QueryResult<()> {
    match (issue.start_date, issue.target_date) {
        (Some(start), Some(target)) if start > target => Err(QueryError::validation(
            "start_date",
            "start date cannot exceed target date",
        )),
        _ => Ok(()),
    }
}

fn to_json<T: Serialize>(value: &T) -> Option<Value> {
    serde_json::to_value(value).ok()
}

impl<S: RecordStore + ?Sized> DraftQueryEngine<S> {
    /// Creates a draft owned by `actor`.
    ///
    /// Without explicit assignees the project's default assignee is used.
    pub fn create(
        &self,
        scope: &ProjectScope,
        actor: Uuid,
        input: DraftInput,
        origin: Option<String>,
    ) -> QueryResult<DraftIssue> {
        check_name(&input.name)?;
        let project = self
            .store
            .project(scope)?
            .ok_or(QueryError::ProjectNotFound(scope.project_id))?;

        let now = Utc::now();
        let mut issue = Issue::draft(*scope, input.name.trim(), now);
        issue.description = input.description.clone();
        issue.priority = input.priority;
        issue.state_id = input.state_id;
        issue.parent_id = input.parent_id;
        issue.start_date = input.start_date;
        issue.target_date = input.target_date;
        issue.created_by = Some(actor);
        if let Some(sort_order) = input.sort_order {
            issue.sort_order = sort_order;
        }
        check_dates(&issue)?;

        let mut associations = input.associations.clone();
        let no_assignees = associations.assignee_ids.as_ref().map_or(true, BTreeSet::is_empty);
        if let (true, Some(default)) = (no_assignees, project.default_assignee_id) {
            associations.assignee_ids = Some(BTreeSet::from([default]));
        }
        self.check_references(scope, &issue, &associations)?;

        let stored = self.store.insert(issue, &associations)?;
        let shaped = self.shape(&stored)?;

        self.activity.record(
            &ActivityEvent::new(ActivityKind::Created, scope, actor, stored.id, now)
                .with_requested_data(to_json(&input).unwrap_or(Value::Null))
                .with_origin(origin),
        );
        log_write(Event::DraftCreated, scope, &stored);
        Ok(shaped)
    }

    /// Applies a partial update to an existing draft
    pub fn update(
        &self,
        scope: &ProjectScope,
        actor: Uuid,
        id: Uuid,
        patch: DraftPatch,
        origin: Option<String>,
    ) -> QueryResult<()> {
        if let Some(name) = &patch.name {
            check_name(name)?;
        }
        let current = self.find(scope, id)?;
        let previous = self.shape(&current)?;

        let mut updated = current.clone();
        patch.apply(&mut updated);
        updated.name = updated.name.trim().to_string();
        updated.updated_at = Utc::now();
        check_dates(&updated)?;
        self.check_references(scope, &updated, &patch.associations)?;

        self.store.update(updated.clone(), &patch.associations)?;

        let mut event =
            ActivityEvent::new(ActivityKind::Updated, scope, actor, id, updated.updated_at)
                .with_requested_data(to_json(&patch).unwrap_or(Value::Null))
                .with_origin(origin);
        if let Some(state) = to_json(&previous) {
            event = event.with_previous_state(state);
        }
        self.activity.record(&event);
        log_write(Event::DraftUpdated, scope, &updated);
        Ok(())
    }

    /// Permanently deletes a draft
    pub fn delete(
        &self,
        scope: &ProjectScope,
        actor: Uuid,
        id: Uuid,
        origin: Option<String>,
    ) -> QueryResult<()> {
        let current = self.find(scope, id)?;
        let previous = self.shape(&current)?;

        if !self.store.delete(scope, id)? {
            return Err(QueryError::NotFound(id));
        }

        let mut event = ActivityEvent::new(ActivityKind::Deleted, scope, actor, id, Utc::now())
            .with_origin(origin);
        if let Some(state) = to_json(&previous) {
            event = event.with_previous_state(state);
        }
        self.activity.record(&event);
        log_write(Event::DraftDeleted, scope, &current);
        Ok(())
    }

    fn shape(&self, issue: &Issue) -> QueryResult<DraftIssue> {
        let plan = AnnotationPlan::list();
        let row = AnnotatedIssue::bare(issue.clone());
        let batch = Materializer::new(&*self.store).load(&[issue.id], Some(&plan))?;
        Ok(batch.shape(&row))
    }

    /// Every referenced state, member, label and module must belong to the project
    fn check_references(
        &self,
        scope: &ProjectScope,
        issue: &Issue,
        associations: &Associations,
    ) -> QueryResult<()> {
        if let Some(state_id) = issue.state_id {
            self.check_universe(scope, GroupField::State, "state_id", [state_id].iter())?;
        }
        if let Some(ids) = &associations.assignee_ids {
            self.check_universe(scope, GroupField::Assignees, "assignee_ids", ids.iter())?;
        }
        if let Some(ids) = &associations.label_ids {
            self.check_universe(scope, GroupField::Labels, "label_ids", ids.iter())?;
        }
        if let Some(ids) = &associations.module_ids {
            self.check_universe(scope, GroupField::Modules, "module_ids", ids.iter())?;
        }
        if let Some(parent_id) = issue.parent_id {
            self.check_parent(scope, issue.id, parent_id)?;
        }
        Ok(())
    }

    fn check_universe<'i>(
        &self,
        scope: &ProjectScope,
        field: GroupField,
        param: &str,
        ids: impl Iterator<Item = &'i Uuid>,
    ) -> QueryResult<()> {
        let known: HashSet<GroupKey> = self.store.group_keys(scope, field)?.into_iter().collect();
        for id in ids {
            if !known.contains(&GroupKey::Id(*id)) {
                return Err(QueryError::validation(param, format!("not in this project: {}", id)));
            }
        }
        Ok(())
    }

    /// Rejects a parent outside the project, the issue itself, or any
    /// descendant of the issue
    fn check_parent(&self, scope: &ProjectScope, id: Uuid, parent_id: Uuid) -> QueryResult<()> {
        if parent_id == id {
            return Err(QueryError::validation("parent_id", "an issue cannot be its own parent"));
        }

        let mut visited = HashSet::new();
        let mut cursor = Some(parent_id);
        while let Some(current) = cursor {
            if !visited.insert(current) {
                break;
            }
            let lookup = Predicate::any_issue()
                .and(Clause::new(FilterField::Id, vec![Operand::Id(current)]));
            let Some(row) = self.store.filter(scope, &lookup)?.into_iter().next() else {
                if current == parent_id {
                    return Err(QueryError::validation(
                        "parent_id",
                        format!("not in this project: {}", parent_id),
                    ));
                }
                break;
            };
            if row.parent_id == Some(id) {
                return Err(QueryError::validation("parent_id", "parent would create a cycle"));
            }
            cursor = row.parent_id;
        }
        Ok(())
    }
}

fn log_write(event: Event, scope: &ProjectScope, issue: &Issue) {
    let project = scope.project_id.to_string();
    let id = issue.id.to_string();
    let sequence = issue.sequence_id.to_string();
    Logger::info(
        event.as_str(),
        &[
            ("project_id", project.as_str()),
            ("issue_id", id.as_str()),
            ("sequence_id", sequence.as_str()),
        ],
    );
}
