//! Domain model for draft issues
//!
//! Scalar issue rows, the enumerations that filters and ordering rank by,
//! and the project entities used for group-key enumeration.

mod entities;
mod issue;

pub use entities::{
    Cycle, IssueAttachment, IssueLink, IssueReaction, Label, Member, Module, Project, State,
};
pub use issue::{
    AnnotatedIssue, Annotations, InboxStatus, Issue, Priority, ProjectScope, StateGroup,
    DEFAULT_SORT_ORDER,
};
