//! Shared fixture for integration tests
//!
//! One workspace, one project, three members, three states, two labels,
//! one module and one cycle. Issues are added with a minute offset so
//! creation order is explicit.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use uuid::Uuid;

use draftq::engine::{DraftQueryEngine, ListRequest, ListResponse};
use draftq::materialize::DraftIssue;
use draftq::model::{
    Cycle, Issue, IssueLink, Label, Member, Module, Project, ProjectScope, State, StateGroup,
};
use draftq::paginate::{FlatPage, GroupedPage};
use draftq::store::{Dataset, MemoryStore, Membership};

pub fn at(minute: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap() + Duration::minutes(minute)
}

pub fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
}

pub struct World {
    pub scope: ProjectScope,
    pub alice: Uuid,
    pub bob: Uuid,
    pub carol: Uuid,
    pub backlog: Uuid,
    pub started: Uuid,
    pub done: Uuid,
    pub bug: Uuid,
    pub feature: Uuid,
    pub module: Uuid,
    pub cycle: Uuid,
    pub dataset: Dataset,
}

impl World {
    pub fn new() -> Self {
        let scope = ProjectScope::new(Uuid::new_v4(), Uuid::new_v4());
        let project_id = scope.project_id;
        let member = |name: &str| Member {
            id: Uuid::new_v4(),
            project_id,
            display_name: name.to_string(),
        };
        let state = |name: &str, group: StateGroup, sequence: f64| State {
            id: Uuid::new_v4(),
            project_id,
            name: name.to_string(),
            group,
            sequence,
        };
        let label = |name: &str, sort_order: f64| Label {
            id: Uuid::new_v4(),
            project_id,
            name: name.to_string(),
            sort_order,
        };

        let members = vec![member("Alice"), member("Bob"), member("Carol")];
        let states = vec![
            state("Backlog", StateGroup::Backlog, 1.0),
            state("In Progress", StateGroup::Started, 2.0),
            state("Done", StateGroup::Completed, 3.0),
        ];
        let labels = vec![label("bug", 1.0), label("feature", 2.0)];
        let module = Module {
            id: Uuid::new_v4(),
            project_id,
            name: "Onboarding".into(),
        };
        let cycle = Cycle {
            id: Uuid::new_v4(),
            project_id,
            name: "Sprint 1".into(),
        };

        Self {
            scope,
            alice: members[0].id,
            bob: members[1].id,
            carol: members[2].id,
            backlog: states[0].id,
            started: states[1].id,
            done: states[2].id,
            bug: labels[0].id,
            feature: labels[1].id,
            module: module.id,
            cycle: cycle.id,
            dataset: Dataset {
                projects: vec![Project {
                    id: project_id,
                    workspace_id: scope.workspace_id,
                    default_assignee_id: None,
                }],
                members,
                states,
                labels,
                modules: vec![module],
                cycles: vec![cycle],
                ..Dataset::default()
            },
        }
    }

    /// Adds a draft created `minute` minutes after the epoch of the fixture
    pub fn add(&mut self, name: &str, minute: i64, edit: impl FnOnce(&mut Issue)) -> Uuid {
        let mut issue = Issue::draft(self.scope, name, at(minute));
        issue.sequence_id = self.dataset.issues.len() as i64 + 1;
        edit(&mut issue);
        let id = issue.id;
        self.dataset.issues.push(issue);
        id
    }

    pub fn draft(&mut self, name: &str, minute: i64) -> Uuid {
        self.add(name, minute, |_| {})
    }

    pub fn assign(&mut self, issue: Uuid, member: Uuid) {
        self.dataset.issue_assignees.push(Membership::new(issue, member));
    }

    pub fn label(&mut self, issue: Uuid, label: Uuid) {
        self.dataset.issue_labels.push(Membership::new(issue, label));
    }

    pub fn in_cycle(&mut self, issue: Uuid, cycle: Uuid) {
        self.dataset.cycle_issues.push(Membership::new(issue, cycle));
    }

    pub fn link(&mut self, issue: Uuid, url: &str) {
        self.dataset.links.push(IssueLink {
            id: Uuid::new_v4(),
            issue_id: issue,
            url: url.to_string(),
            title: None,
            created_by: None,
            created_at: at(0),
        });
    }

    pub fn store(&self) -> Arc<MemoryStore> {
        Arc::new(MemoryStore::from_dataset(self.dataset.clone()).unwrap())
    }

    pub fn engine(&self) -> DraftQueryEngine<MemoryStore> {
        DraftQueryEngine::new(self.store())
    }
}

pub fn flat(response: ListResponse) -> FlatPage<DraftIssue> {
    match response {
        ListResponse::Flat(page) => page,
        ListResponse::Grouped(_) => panic!("expected a flat page"),
    }
}

pub fn grouped(response: ListResponse) -> GroupedPage<DraftIssue> {
    match response {
        ListResponse::Grouped(page) => page,
        ListResponse::Flat(_) => panic!("expected a grouped page"),
    }
}

pub fn ids(results: &[DraftIssue]) -> Vec<Uuid> {
    results.iter().map(DraftIssue::id).collect()
}

/// Ids of one flat listing
pub fn list_ids(
    engine: &DraftQueryEngine<MemoryStore>,
    scope: &ProjectScope,
    request: &ListRequest,
) -> Vec<Uuid> {
    ids(&flat(engine.list(scope, request).unwrap()).results)
}
