//! Annotation planner
//!
//! Declares how each derived field is computed from a related collection.
//! A store executes a plan with one pass per relation over the rows keyed
//! by the requested id set; nothing is computed per record.
//!
//! `is_subscribed` is keyed by the requesting actor, so plans are built per
//! request and never shared.

use uuid::Uuid;

use crate::model::Annotations;
use crate::store::Relation;

/// A derived per-record field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Annotation {
    LinkCount,
    AttachmentCount,
    SubIssuesCount,
    CycleId,
    IsSubscribed,
}

impl Annotation {
    pub fn name(&self) -> &'static str {
        match self {
            Annotation::LinkCount => "link_count",
            Annotation::AttachmentCount => "attachment_count",
            Annotation::SubIssuesCount => "sub_issues_count",
            Annotation::CycleId => "cycle_id",
            Annotation::IsSubscribed => "is_subscribed",
        }
    }
}

/// Column of the related collection that points back at the issue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForeignKey {
    IssueId,
    ParentId,
}

/// How an annotation is evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Computation {
    /// Number of related rows whose key equals the record id
    Count { relation: Relation, key: ForeignKey },
    /// Id of the single related row, if any
    Lookup { relation: Relation },
    /// Whether a related row exists for this actor
    Exists { relation: Relation, actor: Uuid },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnnotationSpec {
    pub annotation: Annotation,
    pub computation: Computation,
}

/// Value produced by one computation for one record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationValue {
    Count(u64),
    Id(Option<Uuid>),
    Flag(bool),
}

/// Ordered set of annotation specs for one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationPlan {
    specs: Vec<AnnotationSpec>,
}

impl AnnotationPlan {
    /// Counts and cycle link, shared by list and detail shaping
    pub fn list() -> Self {
        Self {
            specs: vec![
                AnnotationSpec {
                    annotation: Annotation::CycleId,
                    computation: Computation::Lookup {
                        relation: Relation::CycleLinks,
                    },
                },
                AnnotationSpec {
                    annotation: Annotation::LinkCount,
                    computation: Computation::Count {
                        relation: Relation::Links,
                        key: ForeignKey::IssueId,
                    },
                },
                AnnotationSpec {
                    annotation: Annotation::AttachmentCount,
                    computation: Computation::Count {
                        relation: Relation::Attachments,
                        key: ForeignKey::IssueId,
                    },
                },
                AnnotationSpec {
                    annotation: Annotation::SubIssuesCount,
                    computation: Computation::Count {
                        relation: Relation::SubIssues,
                        key: ForeignKey::ParentId,
                    },
                },
            ],
        }
    }

    /// List annotations plus the actor's subscription flag
    pub fn detail(actor: Uuid) -> Self {
        let mut plan = Self::list();
        plan.specs.push(AnnotationSpec {
            annotation: Annotation::IsSubscribed,
            computation: Computation::Exists {
                relation: Relation::Subscriptions,
                actor,
            },
        });
        plan
    }

    pub fn specs(&self) -> &[AnnotationSpec] {
        &self.specs
    }

    pub fn contains(&self, annotation: Annotation) -> bool {
        self.specs.iter().any(|s| s.annotation == annotation)
    }
}

impl Annotations {
    /// Stores a computed value in its slot
    pub fn set(&mut self, annotation: Annotation, value: AnnotationValue) {
        match (annotation, value) {
            (Annotation::LinkCount, AnnotationValue::Count(n)) => self.link_count = n,
            (Annotation::AttachmentCount, AnnotationValue::Count(n)) => self.attachment_count = n,
            (Annotation::SubIssuesCount, AnnotationValue::Count(n)) => self.sub_issues_count = n,
            (Annotation::CycleId, AnnotationValue::Id(id)) => self.cycle_id = id,
            (Annotation::IsSubscribed, AnnotationValue::Flag(b)) => self.is_subscribed = Some(b),
            _ => {}
        }
    }
}
