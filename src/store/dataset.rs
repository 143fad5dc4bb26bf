//! JSON dataset used to seed a [`MemoryStore`](super::MemoryStore)

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{
    Cycle, Issue, IssueAttachment, IssueLink, IssueReaction, Label, Member, Module, Project, State,
};

use super::errors::{StoreError, StoreResult};

/// A row of an issue-to-entity association table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub issue_id: Uuid,
    pub target_id: Uuid,
}

impl Membership {
    pub fn new(issue_id: Uuid, target_id: Uuid) -> Self {
        Self {
            issue_id,
            target_id,
        }
    }
}

/// Every table of the store in plain serde form
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Dataset {
    pub projects: Vec<Project>,
    pub members: Vec<Member>,
    pub states: Vec<State>,
    pub labels: Vec<Label>,
    pub modules: Vec<Module>,
    pub cycles: Vec<Cycle>,
    pub issues: Vec<Issue>,
    pub issue_assignees: Vec<Membership>,
    pub issue_labels: Vec<Membership>,
    pub issue_modules: Vec<Membership>,
    pub cycle_issues: Vec<Membership>,
    pub subscriptions: Vec<Membership>,
    pub links: Vec<IssueLink>,
    pub attachments: Vec<IssueAttachment>,
    pub reactions: Vec<IssueReaction>,
}

impl Dataset {
    /// Reads a dataset from a JSON file
    pub fn load(path: &Path) -> StoreResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| StoreError::Dataset(format!("{}: {}", path.display(), e)))?;
        serde_json::from_str(&content)
            .map_err(|e| StoreError::Dataset(format!("{}: {}", path.display(), e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_tables_default_to_empty() {
        let dataset: Dataset = serde_json::from_str(r#"{"projects": []}"#).unwrap();
        assert!(dataset.issues.is_empty());
        assert!(dataset.subscriptions.is_empty());
    }

    #[test]
    fn test_load_reports_path_on_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        let err = Dataset::load(file.path()).unwrap_err();
        match err {
            StoreError::Dataset(msg) => assert!(msg.contains(&file.path().display().to_string())),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
