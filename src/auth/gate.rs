//! Permission gates

use std::fmt;
use std::sync::Arc;

use uuid::Uuid;

use crate::error::{QueryError, QueryResult};
use crate::model::ProjectScope;
use crate::store::RecordStore;

/// Operation being authorized
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    List,
    Retrieve,
    Create,
    Update,
    Delete,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::List => "list",
            Action::Retrieve => "retrieve",
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }

    pub fn is_write(&self) -> bool {
        matches!(self, Action::Create | Action::Update | Action::Delete)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Decides whether an actor may run an action in a project
pub trait PermissionGate: Send + Sync {
    /// Returns `QueryError::Forbidden` when the actor is refused
    fn authorize(&self, scope: &ProjectScope, actor: Uuid, action: Action) -> QueryResult<()>;
}

/// Admits any actor who is a member of the project
pub struct ProjectMemberGate<S: RecordStore + ?Sized> {
    store: Arc<S>,
}

impl<S: RecordStore + ?Sized> ProjectMemberGate<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }
}

impl<S: RecordStore + ?Sized> PermissionGate for ProjectMemberGate<S> {
    fn authorize(&self, scope: &ProjectScope, actor: Uuid, _action: Action) -> QueryResult<()> {
        if self.store.is_member(scope, actor)? {
            Ok(())
        } else {
            Err(QueryError::Forbidden(actor))
        }
    }
}

/// Admits everyone. For local tooling and tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAll;

impl PermissionGate for AllowAll {
    fn authorize(&self, _scope: &ProjectScope, _actor: Uuid, _action: Action) -> QueryResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Member, Project};
    use crate::store::{Dataset, MemoryStore};

    #[test]
    fn test_member_gate() {
        let scope = ProjectScope::new(Uuid::new_v4(), Uuid::new_v4());
        let member = Uuid::new_v4();
        let store = MemoryStore::from_dataset(Dataset {
            projects: vec![Project {
                id: scope.project_id,
                workspace_id: scope.workspace_id,
                default_assignee_id: None,
            }],
            members: vec![Member {
                id: member,
                project_id: scope.project_id,
                display_name: "Ada".into(),
            }],
            ..Dataset::default()
        })
        .unwrap();
        let gate = ProjectMemberGate::new(Arc::new(store));

        assert!(gate.authorize(&scope, member, Action::Create).is_ok());
        let stranger = Uuid::new_v4();
        let err = gate.authorize(&scope, stranger, Action::List).unwrap_err();
        assert_eq!(err.status_code(), 403);

        let other = ProjectScope::new(Uuid::new_v4(), scope.project_id);
        assert!(gate.authorize(&other, member, Action::List).is_err());
    }

    #[test]
    fn test_allow_all() {
        let scope = ProjectScope::new(Uuid::nil(), Uuid::nil());
        assert!(AllowAll.authorize(&scope, Uuid::new_v4(), Action::Delete).is_ok());
        assert!(Action::Delete.is_write());
        assert!(!Action::List.is_write());
    }
}
