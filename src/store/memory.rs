//! In-memory record store
//!
//! Tables live behind one `RwLock`. Reads hold the read lock for exactly one
//! store call, so each call sees a consistent snapshot; writes take the
//! write lock.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::Path;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use uuid::Uuid;

use crate::annotate::{AnnotationPlan, AnnotationValue, Computation, ForeignKey};
use crate::filter::{FilterField, IssueFacts, Predicate};
use crate::grouping::{GroupField, GroupKey};
use crate::model::{
    AnnotatedIssue, Annotations, Cycle, Issue, IssueAttachment, IssueLink, IssueReaction, Label,
    Member, Module, Project, ProjectScope, State, StateGroup,
};
use crate::ordering::{OrderingSpec, SortDirection, SortKey, SortTerm, SortValue};

use super::dataset::{Dataset, Membership};
use super::errors::{StoreError, StoreResult};
use super::{Associations, RecordStore, Related, Relation};

#[derive(Debug, Default)]
struct Tables {
    projects: Vec<Project>,
    members: Vec<Member>,
    states: Vec<State>,
    labels: Vec<Label>,
    modules: Vec<Module>,
    cycles: Vec<Cycle>,
    issues: BTreeMap<Uuid, Issue>,
    assignees: HashMap<Uuid, BTreeSet<Uuid>>,
    issue_labels: HashMap<Uuid, BTreeSet<Uuid>>,
    issue_modules: HashMap<Uuid, BTreeSet<Uuid>>,
    cycle_links: HashMap<Uuid, Uuid>,
    subscriptions: HashMap<Uuid, BTreeSet<Uuid>>,
    links: Vec<IssueLink>,
    attachments: Vec<IssueAttachment>,
    reactions: Vec<IssueReaction>,
}

impl Tables {
    fn project(&self, scope: &ProjectScope) -> Option<&Project> {
        self.projects
            .iter()
            .find(|p| p.id == scope.project_id && p.workspace_id == scope.workspace_id)
    }

    fn state(&self, id: Option<Uuid>) -> Option<&State> {
        id.and_then(|id| self.states.iter().find(|s| s.id == id))
    }

    fn set_of(&self, map: &HashMap<Uuid, BTreeSet<Uuid>>, issue_id: Uuid) -> Vec<Uuid> {
        map.get(&issue_id)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    fn is_live_child(issue: &Issue, parent: Uuid) -> bool {
        issue.parent_id == Some(parent) && !issue.is_draft && !issue.is_archived()
    }

    fn view<'a>(&'a self, issue: &'a Issue) -> IssueView<'a> {
        IssueView {
            issue,
            tables: self,
        }
    }

    fn matching<'a>(
        &'a self,
        scope: &'a ProjectScope,
        predicate: &'a Predicate,
    ) -> impl Iterator<Item = &'a Issue> + 'a {
        self.issues
            .values()
            .filter(move |issue| scope.contains(issue) && predicate.matches(&self.view(issue)))
    }

    fn apply_associations(&mut self, issue_id: Uuid, associations: &Associations) {
        if let Some(ids) = &associations.assignee_ids {
            self.assignees.insert(issue_id, ids.clone());
        }
        if let Some(ids) = &associations.label_ids {
            self.issue_labels.insert(issue_id, ids.clone());
        }
        if let Some(ids) = &associations.module_ids {
            self.issue_modules.insert(issue_id, ids.clone());
        }
    }

    fn add_membership(map: &mut HashMap<Uuid, BTreeSet<Uuid>>, rows: &[Membership]) {
        for row in rows {
            map.entry(row.issue_id).or_default().insert(row.target_id);
        }
    }

    fn extend(&mut self, dataset: Dataset) -> StoreResult<()> {
        self.projects.extend(dataset.projects);
        self.members.extend(dataset.members);
        self.states.extend(dataset.states);
        self.labels.extend(dataset.labels);
        self.modules.extend(dataset.modules);
        self.cycles.extend(dataset.cycles);

        for issue in dataset.issues {
            let scope = ProjectScope::new(issue.workspace_id, issue.project_id);
            if self.project(&scope).is_none() {
                return Err(StoreError::UnknownProject(issue.project_id));
            }
            if self.issues.contains_key(&issue.id) {
                return Err(StoreError::Duplicate(issue.id));
            }
            self.issues.insert(issue.id, issue);
        }

        Self::add_membership(&mut self.assignees, &dataset.issue_assignees);
        Self::add_membership(&mut self.issue_labels, &dataset.issue_labels);
        Self::add_membership(&mut self.issue_modules, &dataset.issue_modules);
        Self::add_membership(&mut self.subscriptions, &dataset.subscriptions);
        for row in dataset.cycle_issues {
            self.cycle_links.insert(row.issue_id, row.target_id);
        }

        self.links.extend(dataset.links);
        self.attachments.extend(dataset.attachments);
        self.reactions.extend(dataset.reactions);
        Ok(())
    }

    fn count_by(&self, relation: Relation, key: ForeignKey, ids: &HashSet<Uuid>) -> HashMap<Uuid, u64> {
        let mut counts: HashMap<Uuid, u64> = HashMap::new();
        let mut bump = |id: Uuid| {
            if ids.contains(&id) {
                *counts.entry(id).or_insert(0) += 1;
            }
        };

        match (relation, key) {
            (Relation::Links, ForeignKey::IssueId) => self.links.iter().for_each(|l| bump(l.issue_id)),
            (Relation::Attachments, ForeignKey::IssueId) => {
                self.attachments.iter().for_each(|a| bump(a.issue_id))
            }
            (Relation::Reactions, ForeignKey::IssueId) => {
                self.reactions.iter().for_each(|r| bump(r.issue_id))
            }
            (Relation::SubIssues, ForeignKey::ParentId) => {
                for issue in self.issues.values() {
                    if let Some(parent) = issue.parent_id {
                        if Self::is_live_child(issue, parent) {
                            bump(parent);
                        }
                    }
                }
            }
            (relation, _) => {
                let map = match relation {
                    Relation::Assignees => &self.assignees,
                    Relation::Labels => &self.issue_labels,
                    Relation::Modules => &self.issue_modules,
                    Relation::Subscriptions => &self.subscriptions,
                    _ => return counts,
                };
                for (issue_id, set) in map {
                    if ids.contains(issue_id) {
                        counts.insert(*issue_id, set.len() as u64);
                    }
                }
            }
        }
        counts
    }

    fn sort_value(&self, row: &AnnotatedIssue, term: &SortTerm) -> SortValue {
        let issue = &row.issue;
        let extreme = |names: Vec<String>| -> SortValue {
            let picked = match term.direction {
                SortDirection::Asc => names.into_iter().min(),
                SortDirection::Desc => names.into_iter().max(),
            };
            picked.into()
        };

        match term.key {
            SortKey::CreatedAt => SortValue::Time(issue.created_at),
            SortKey::UpdatedAt => SortValue::Time(issue.updated_at),
            SortKey::StartDate => issue.start_date.into(),
            SortKey::TargetDate => issue.target_date.into(),
            SortKey::SortOrder => SortValue::Float(issue.sort_order),
            SortKey::SequenceId => SortValue::Int(issue.sequence_id),
            SortKey::Name => SortValue::Text(issue.name.clone()),
            SortKey::PriorityRank => SortValue::Int(i64::from(issue.priority.rank())),
            SortKey::StateName => self.state(issue.state_id).map(|s| s.name.clone()).into(),
            SortKey::StateGroupRank => self
                .state(issue.state_id)
                .map_or(SortValue::Null, |s| SortValue::Int(i64::from(s.group.rank()))),
            SortKey::LabelName => extreme(
                self.set_of(&self.issue_labels, issue.id)
                    .into_iter()
                    .filter_map(|id| self.labels.iter().find(|l| l.id == id))
                    .map(|l| l.name.clone())
                    .collect(),
            ),
            SortKey::AssigneeName => extreme(
                self.set_of(&self.assignees, issue.id)
                    .into_iter()
                    .filter_map(|id| self.members.iter().find(|m| m.id == id))
                    .map(|m| m.display_name.clone())
                    .collect(),
            ),
            SortKey::LinkCount => SortValue::Int(row.annotations.link_count as i64),
            SortKey::AttachmentCount => SortValue::Int(row.annotations.attachment_count as i64),
            SortKey::SubIssuesCount => SortValue::Int(row.annotations.sub_issues_count as i64),
            SortKey::Id => SortValue::Id(issue.id),
        }
    }
}

/// Join view of one row for predicate evaluation
struct IssueView<'a> {
    issue: &'a Issue,
    tables: &'a Tables,
}

impl IssueFacts for IssueView<'_> {
    fn issue(&self) -> &Issue {
        self.issue
    }

    fn state_group(&self) -> Option<StateGroup> {
        self.tables.state(self.issue.state_id).map(|s| s.group)
    }

    fn cycle_id(&self) -> Option<Uuid> {
        self.tables.cycle_links.get(&self.issue.id).copied()
    }

    fn members(&self, field: FilterField) -> Vec<Uuid> {
        let map = match field {
            FilterField::Labels => &self.tables.issue_labels,
            FilterField::Assignees => &self.tables.assignees,
            FilterField::Modules => &self.tables.issue_modules,
            FilterField::Subscriber => &self.tables.subscriptions,
            _ => return Vec::new(),
        };
        self.tables.set_of(map, self.issue.id)
    }
}

/// Thread-safe in-memory [`RecordStore`]
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_dataset(dataset: Dataset) -> StoreResult<Self> {
        let store = Self::new();
        store.extend(dataset)?;
        Ok(store)
    }

    /// Seeds a store from a JSON dataset file
    pub fn load(path: &Path) -> StoreResult<Self> {
        Self::from_dataset(Dataset::load(path)?)
    }

    /// Appends every table of `dataset`
    pub fn extend(&self, dataset: Dataset) -> StoreResult<()> {
        self.write()?.extend(dataset)
    }

    pub fn add_link(&self, link: IssueLink) -> StoreResult<()> {
        self.write()?.links.push(link);
        Ok(())
    }

    pub fn add_attachment(&self, attachment: IssueAttachment) -> StoreResult<()> {
        self.write()?.attachments.push(attachment);
        Ok(())
    }

    pub fn subscribe(&self, issue_id: Uuid, subscriber_id: Uuid) -> StoreResult<()> {
        self.write()?
            .subscriptions
            .entry(issue_id)
            .or_default()
            .insert(subscriber_id);
        Ok(())
    }

    pub fn link_cycle(&self, issue_id: Uuid, cycle_id: Uuid) -> StoreResult<()> {
        self.write()?.cycle_links.insert(issue_id, cycle_id);
        Ok(())
    }

    /// Number of rows across all projects, drafts or not
    pub fn len(&self) -> StoreResult<usize> {
        Ok(self.read()?.issues.len())
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Tables>> {
        self.tables.read().map_err(|_| StoreError::LockPoisoned)
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Tables>> {
        self.tables.write().map_err(|_| StoreError::LockPoisoned)
    }
}

impl RecordStore for MemoryStore {
    fn filter(&self, scope: &ProjectScope, predicate: &Predicate) -> StoreResult<Vec<Issue>> {
        let tables = self.read()?;
        Ok(tables.matching(scope, predicate).cloned().collect())
    }

    fn annotate(
        &self,
        ids: &[Uuid],
        plan: &AnnotationPlan,
    ) -> StoreResult<HashMap<Uuid, Annotations>> {
        let tables = self.read()?;
        let wanted: HashSet<Uuid> = ids.iter().copied().collect();
        let mut out: HashMap<Uuid, Annotations> =
            ids.iter().map(|id| (*id, Annotations::default())).collect();

        for spec in plan.specs() {
            match spec.computation {
                Computation::Count { relation, key } => {
                    let counts = tables.count_by(relation, key, &wanted);
                    for (id, annotations) in out.iter_mut() {
                        let n = counts.get(id).copied().unwrap_or(0);
                        annotations.set(spec.annotation, AnnotationValue::Count(n));
                    }
                }
                Computation::Lookup { relation } => {
                    for (id, annotations) in out.iter_mut() {
                        let value = match relation {
                            Relation::CycleLinks => tables.cycle_links.get(id).copied(),
                            _ => None,
                        };
                        annotations.set(spec.annotation, AnnotationValue::Id(value));
                    }
                }
                Computation::Exists { relation, actor } => {
                    for (id, annotations) in out.iter_mut() {
                        let found = match relation {
                            Relation::Subscriptions => tables
                                .subscriptions
                                .get(id)
                                .is_some_and(|set| set.contains(&actor)),
                            _ => false,
                        };
                        annotations.set(spec.annotation, AnnotationValue::Flag(found));
                    }
                }
            }
        }

        Ok(out)
    }

    fn order(
        &self,
        rows: Vec<AnnotatedIssue>,
        spec: &OrderingSpec,
    ) -> StoreResult<Vec<AnnotatedIssue>> {
        let tables = self.read()?;
        Ok(spec.sort_rows(rows, |row, term| tables.sort_value(row, term)))
    }

    fn count(&self, scope: &ProjectScope, predicate: &Predicate) -> StoreResult<usize> {
        let tables = self.read()?;
        Ok(tables.matching(scope, predicate).count())
    }

    fn batch_load(
        &self,
        relation: Relation,
        ids: &[Uuid],
    ) -> StoreResult<HashMap<Uuid, Vec<Related>>> {
        let tables = self.read()?;
        let mut out: HashMap<Uuid, Vec<Related>> =
            ids.iter().map(|id| (*id, Vec::new())).collect();

        let ids_of = |map: &HashMap<Uuid, BTreeSet<Uuid>>, out: &mut HashMap<Uuid, Vec<Related>>| {
            for (id, rows) in out.iter_mut() {
                rows.extend(tables.set_of(map, *id).into_iter().map(Related::Id));
            }
        };

        match relation {
            Relation::Assignees => ids_of(&tables.assignees, &mut out),
            Relation::Labels => ids_of(&tables.issue_labels, &mut out),
            Relation::Modules => ids_of(&tables.issue_modules, &mut out),
            Relation::Subscriptions => ids_of(&tables.subscriptions, &mut out),
            Relation::CycleLinks => {
                for (id, rows) in out.iter_mut() {
                    rows.extend(tables.cycle_links.get(id).copied().map(Related::Id));
                }
            }
            Relation::State => {
                for (id, rows) in out.iter_mut() {
                    let state = tables.issues.get(id).and_then(|i| tables.state(i.state_id));
                    rows.extend(state.cloned().map(Related::State));
                }
            }
            Relation::Links => {
                for link in &tables.links {
                    if let Some(rows) = out.get_mut(&link.issue_id) {
                        rows.push(Related::Link(link.clone()));
                    }
                }
            }
            Relation::Attachments => {
                for attachment in &tables.attachments {
                    if let Some(rows) = out.get_mut(&attachment.issue_id) {
                        rows.push(Related::Attachment(attachment.clone()));
                    }
                }
            }
            Relation::Reactions => {
                for reaction in &tables.reactions {
                    if let Some(rows) = out.get_mut(&reaction.issue_id) {
                        rows.push(Related::Reaction(reaction.clone()));
                    }
                }
            }
            Relation::SubIssues => {
                for issue in tables.issues.values() {
                    if let Some(parent) = issue.parent_id {
                        if !Tables::is_live_child(issue, parent) {
                            continue;
                        }
                        if let Some(rows) = out.get_mut(&parent) {
                            rows.push(Related::Id(issue.id));
                        }
                    }
                }
            }
        }

        Ok(out)
    }

    fn group_keys(&self, scope: &ProjectScope, field: GroupField) -> StoreResult<Vec<GroupKey>> {
        let tables = self.read()?;
        let project_id = scope.project_id;
        let keys = match field {
            GroupField::State => tables
                .states
                .iter()
                .filter(|s| s.project_id == project_id)
                .map(|s| GroupKey::Id(s.id))
                .collect(),
            GroupField::Labels => tables
                .labels
                .iter()
                .filter(|l| l.project_id == project_id)
                .map(|l| GroupKey::Id(l.id))
                .collect(),
            GroupField::Modules => tables
                .modules
                .iter()
                .filter(|m| m.project_id == project_id)
                .map(|m| GroupKey::Id(m.id))
                .collect(),
            GroupField::Cycle => tables
                .cycles
                .iter()
                .filter(|c| c.project_id == project_id)
                .map(|c| GroupKey::Id(c.id))
                .collect(),
            GroupField::Assignees | GroupField::CreatedBy => tables
                .members
                .iter()
                .filter(|m| m.project_id == project_id)
                .map(|m| GroupKey::Id(m.id))
                .collect(),
            GroupField::Priority | GroupField::StateGroup => Vec::new(),
        };
        Ok(keys)
    }

    fn project(&self, scope: &ProjectScope) -> StoreResult<Option<Project>> {
        Ok(self.read()?.project(scope).cloned())
    }

    fn is_member(&self, scope: &ProjectScope, actor: Uuid) -> StoreResult<bool> {
        let tables = self.read()?;
        if tables.project(scope).is_none() {
            return Ok(false);
        }
        Ok(tables
            .members
            .iter()
            .any(|m| m.project_id == scope.project_id && m.id == actor))
    }

    fn next_sequence_id(&self, scope: &ProjectScope) -> StoreResult<i64> {
        let tables = self.read()?;
        Ok(next_sequence(&tables, scope))
    }

    fn insert(&self, mut issue: Issue, associations: &Associations) -> StoreResult<Issue> {
        let mut tables = self.write()?;
        let scope = ProjectScope::new(issue.workspace_id, issue.project_id);
        if tables.project(&scope).is_none() {
            return Err(StoreError::UnknownProject(issue.project_id));
        }
        if tables.issues.contains_key(&issue.id) {
            return Err(StoreError::Duplicate(issue.id));
        }

        issue.sequence_id = next_sequence(&tables, &scope);
        tables.apply_associations(issue.id, associations);
        tables.issues.insert(issue.id, issue.clone());
        Ok(issue)
    }

    fn update(&self, issue: Issue, associations: &Associations) -> StoreResult<()> {
        let mut tables = self.write()?;
        match tables.issues.get_mut(&issue.id) {
            Some(slot) => *slot = issue.clone(),
            None => return Err(StoreError::Missing(issue.id)),
        }
        tables.apply_associations(issue.id, associations);
        Ok(())
    }

    fn delete(&self, scope: &ProjectScope, id: Uuid) -> StoreResult<bool> {
        let mut tables = self.write()?;
        let owned = tables.issues.get(&id).is_some_and(|i| scope.contains(i));
        if !owned {
            return Ok(false);
        }

        tables.issues.remove(&id);
        tables.assignees.remove(&id);
        tables.issue_labels.remove(&id);
        tables.issue_modules.remove(&id);
        tables.cycle_links.remove(&id);
        tables.subscriptions.remove(&id);
        tables.links.retain(|l| l.issue_id != id);
        tables.attachments.retain(|a| a.issue_id != id);
        tables.reactions.retain(|r| r.issue_id != id);
        for child in tables.issues.values_mut() {
            if child.parent_id == Some(id) {
                child.parent_id = None;
            }
        }
        Ok(true)
    }
}

fn next_sequence(tables: &Tables, scope: &ProjectScope) -> i64 {
    tables
        .issues
        .values()
        .filter(|i| i.project_id == scope.project_id)
        .map(|i| i.sequence_id)
        .max()
        .unwrap_or(0)
        + 1
}
