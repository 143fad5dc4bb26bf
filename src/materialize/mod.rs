//! Result materializer
//!
//! Shapes paginated rows into response records. Associations are loaded
//! with one `batch_load` per association type over the whole page id set,
//! never per record. Nested related collections are only shaped for
//! single-record retrieval.

use std::collections::HashMap;

use serde::Serialize;
use uuid::Uuid;

use crate::annotate::AnnotationPlan;
use crate::error::QueryResult;
use crate::model::{AnnotatedIssue, Annotations, Issue, IssueAttachment, IssueLink, IssueReaction};
use crate::store::{RecordStore, Related, Relation};

/// List-shaped draft issue
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DraftIssue {
    #[serde(flatten)]
    pub issue: Issue,
    #[serde(flatten)]
    pub annotations: Annotations,
    pub assignee_ids: Vec<Uuid>,
    pub label_ids: Vec<Uuid>,
    pub module_ids: Vec<Uuid>,
}

impl DraftIssue {
    pub fn id(&self) -> Uuid {
        self.issue.id
    }
}

/// Detail-shaped draft issue with nested related collections
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DraftIssueDetail {
    #[serde(flatten)]
    pub draft: DraftIssue,
    pub links: Vec<IssueLink>,
    pub attachments: Vec<IssueAttachment>,
    pub reactions: Vec<IssueReaction>,
}

/// Association data loaded once for a page
#[derive(Debug, Default)]
pub struct PageBatch {
    annotations: Option<HashMap<Uuid, Annotations>>,
    assignees: HashMap<Uuid, Vec<Related>>,
    labels: HashMap<Uuid, Vec<Related>>,
    modules: HashMap<Uuid, Vec<Related>>,
}

impl PageBatch {
    /// Shapes one row. Annotations loaded with the batch replace the row's own.
    pub fn shape(&self, row: &AnnotatedIssue) -> DraftIssue {
        let id = row.id();
        let ids = |map: &HashMap<Uuid, Vec<Related>>| -> Vec<Uuid> {
            map.get(&id)
                .map(|rows| rows.iter().filter_map(Related::as_id).collect())
                .unwrap_or_default()
        };

        let annotations = self
            .annotations
            .as_ref()
            .and_then(|loaded| loaded.get(&id).cloned())
            .unwrap_or_else(|| row.annotations.clone());

        DraftIssue {
            issue: row.issue.clone(),
            annotations,
            assignee_ids: ids(&self.assignees),
            label_ids: ids(&self.labels),
            module_ids: ids(&self.modules),
        }
    }
}

pub struct Materializer<'a, S: RecordStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: RecordStore + ?Sized> Materializer<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Loads associations for `ids`, annotating them with `plan` when given
    pub fn load(&self, ids: &[Uuid], plan: Option<&AnnotationPlan>) -> QueryResult<PageBatch> {
        if ids.is_empty() {
            return Ok(PageBatch::default());
        }

        let annotations = match plan {
            Some(plan) => Some(self.store.annotate(ids, plan)?),
            None => None,
        };

        Ok(PageBatch {
            annotations,
            assignees: self.store.batch_load(Relation::Assignees, ids)?,
            labels: self.store.batch_load(Relation::Labels, ids)?,
            modules: self.store.batch_load(Relation::Modules, ids)?,
        })
    }

    /// Detail shape of one already-annotated row
    pub fn detail(&self, row: &AnnotatedIssue) -> QueryResult<DraftIssueDetail> {
        let ids = [row.id()];
        let draft = self.load(&ids, None)?.shape(row);

        let mut links = self.store.batch_load(Relation::Links, &ids)?;
        let mut attachments = self.store.batch_load(Relation::Attachments, &ids)?;
        let mut reactions = self.store.batch_load(Relation::Reactions, &ids)?;

        Ok(DraftIssueDetail {
            draft,
            links: take(&mut links, row.id(), |r| match r {
                Related::Link(link) => Some(link),
                _ => None,
            }),
            attachments: take(&mut attachments, row.id(), |r| match r {
                Related::Attachment(attachment) => Some(attachment),
                _ => None,
            }),
            reactions: take(&mut reactions, row.id(), |r| match r {
                Related::Reaction(reaction) => Some(reaction),
                _ => None,
            }),
        })
    }
}

fn take<T>(
    loaded: &mut HashMap<Uuid, Vec<Related>>,
    id: Uuid,
    pick: impl FnMut(Related) -> Option<T>,
) -> Vec<T> {
    loaded
        .remove(&id)
        .unwrap_or_default()
        .into_iter()
        .filter_map(pick)
        .collect()
}
