//! Projection of an ordered row set into groups

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use uuid::Uuid;

use crate::error::QueryResult;
use crate::filter::Predicate;
use crate::model::{AnnotatedIssue, Issue, ProjectScope};
use crate::store::{RecordStore, Related};

use super::key::{GroupField, GroupKey};

/// Ordered group keys mapped to shared references of their records.
///
/// Each group preserves the input ordering. A record in several groups is
/// the same `Arc` in each.
#[derive(Debug, Clone)]
pub struct GroupProjection {
    field: GroupField,
    groups: Vec<(GroupKey, Vec<Arc<AnnotatedIssue>>)>,
    distinct: usize,
}

impl GroupProjection {
    fn empty(field: GroupField) -> Self {
        Self {
            field,
            groups: Vec::new(),
            distinct: 0,
        }
    }

    pub fn field(&self) -> GroupField {
        self.field
    }

    pub fn into_groups(self) -> Vec<(GroupKey, Vec<Arc<AnnotatedIssue>>)> {
        self.groups
    }

    /// Number of distinct records across all groups
    pub fn distinct_count(&self) -> usize {
        self.distinct
    }
}

/// Builds group projections, loading memberships through the store
pub struct GroupingProjector<'a, S: RecordStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: RecordStore + ?Sized> GroupingProjector<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Projects `rows` (already filtered by `predicate` and ordered) by `field`.
    ///
    /// Key order: fixed enum keys, the project's entity universe, the `None`
    /// group, then any other key seen on records matching `predicate`
    /// without its own clause on `field`. No rows means no groups.
    pub fn project(
        &self,
        scope: &ProjectScope,
        predicate: &Predicate,
        field: GroupField,
        rows: Vec<Arc<AnnotatedIssue>>,
    ) -> QueryResult<GroupProjection> {
        if rows.is_empty() {
            return Ok(GroupProjection::empty(field));
        }

        let issues: Vec<&Issue> = rows.iter().map(|r| &r.issue).collect();
        let row_keys = self.keys_for(field, &issues)?;

        let mut members: HashMap<GroupKey, Vec<Arc<AnnotatedIssue>>> = HashMap::new();
        for row in &rows {
            for key in row_keys.get(&row.id()).into_iter().flatten() {
                members.entry(*key).or_default().push(Arc::clone(row));
            }
        }

        let observed: BTreeSet<GroupKey> = if predicate.constrains(field.filter_field()) {
            let widened = self
                .store
                .filter(scope, &predicate.without(field.filter_field()))?;
            let widened_refs: Vec<&Issue> = widened.iter().collect();
            self.keys_for(field, &widened_refs)?
                .into_values()
                .flatten()
                .collect()
        } else {
            members.keys().copied().collect()
        };

        let mut order = field.fixed_keys();
        order.extend(self.store.group_keys(scope, field)?);
        if field.is_nullable() {
            order.push(GroupKey::None);
        }
        let mut seen: HashSet<GroupKey> = HashSet::with_capacity(order.len());
        order.retain(|k| seen.insert(*k));
        let extras: Vec<GroupKey> = observed.into_iter().filter(|k| !seen.contains(k)).collect();
        order.extend(extras);

        let groups = order
            .into_iter()
            .map(|key| {
                let rows = members.remove(&key).unwrap_or_default();
                (key, rows)
            })
            .collect();

        Ok(GroupProjection {
            field,
            groups,
            distinct: rows.len(),
        })
    }

    /// Group keys per record id, with one batch load for the field's relation
    fn keys_for(
        &self,
        field: GroupField,
        issues: &[&Issue],
    ) -> QueryResult<HashMap<Uuid, Vec<GroupKey>>> {
        let related: HashMap<Uuid, Vec<Related>> = match field.relation() {
            Some(relation) => {
                let ids: Vec<Uuid> = issues.iter().map(|i| i.id).collect();
                self.store.batch_load(relation, &ids)?
            }
            None => HashMap::new(),
        };

        Ok(issues
            .iter()
            .map(|issue| {
                let rows = related.get(&issue.id).map(Vec::as_slice).unwrap_or(&[]);
                (issue.id, field.keys_of(issue, rows))
            })
            .collect())
    }
}
