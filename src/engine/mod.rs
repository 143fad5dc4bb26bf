//! Query engine facade
//!
//! Composes filter compilation, ordering, grouping, pagination and
//! materialization into `list` and `fetch_one`, and hosts the thin write
//! path. Calls are stateless: each one reads the store afresh and nothing
//! is cached between calls.
//!
//! Execution is two-phase. Matching rows are filtered, ordered and paged
//! first; annotations and associations are then loaded in batches keyed by
//! the page's id set. Orderings on counts annotate every matching row up
//! front instead.

mod request;
mod writes;

use std::collections::HashSet;
use std::sync::Arc;

use uuid::Uuid;

use crate::activity::{ActivitySink, LogActivitySink};
use crate::annotate::AnnotationPlan;
use crate::error::{QueryError, QueryResult};
use crate::filter::{Clause, FilterField, Operand, Predicate};
use crate::grouping::GroupingProjector;
use crate::materialize::{DraftIssueDetail, Materializer};
use crate::model::{AnnotatedIssue, InboxStatus, Issue, ProjectScope};
use crate::observability::{Event, Logger, ObservationScope};
use crate::paginate::{paginate_flat, GroupedPage, GroupedPaginator, PaginationConfig};
use crate::store::RecordStore;

pub use request::{ListRequest, ListResponse};
pub use writes::{DraftInput, DraftPatch, MAX_NAME_LEN};

use request::ListPlan;

/// Secondary predicate counted per group when none is configured:
/// triaged or not-in-intake, archived drafts.
pub fn default_sub_count() -> Predicate {
    Predicate::draft_scope()
        .and(Clause::new(
            FilterField::InboxStatus,
            vec![
                Operand::InboxStatus(InboxStatus::Accepted),
                Operand::InboxStatus(InboxStatus::Declined),
                Operand::InboxStatus(InboxStatus::Duplicate),
                Operand::Null,
            ],
        ))
        .and(Clause::flag(FilterField::Archived, true))
}

/// Draft issue query engine over a record store
pub struct DraftQueryEngine<S: RecordStore + ?Sized> {
    store: Arc<S>,
    pagination: PaginationConfig,
    sub_count: Predicate,
    activity: Arc<dyn ActivitySink>,
}

impl<S: RecordStore + ?Sized> DraftQueryEngine<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            pagination: PaginationConfig::default(),
            sub_count: default_sub_count(),
            activity: Arc::new(LogActivitySink),
        }
    }

    pub fn with_pagination(mut self, pagination: PaginationConfig) -> Self {
        self.pagination = pagination;
        self
    }

    /// Replaces the per-group secondary predicate
    pub fn with_sub_count(mut self, predicate: Predicate) -> Self {
        self.sub_count = predicate;
        self
    }

    pub fn with_activity(mut self, sink: Arc<dyn ActivitySink>) -> Self {
        self.activity = sink;
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn pagination(&self) -> &PaginationConfig {
        &self.pagination
    }

    /// Lists draft issues in `scope`.
    ///
    /// Every parameter is validated before the store is touched.
    pub fn list(&self, scope: &ProjectScope, request: &ListRequest) -> QueryResult<ListResponse> {
        let plan = ListPlan::compile(request, &self.pagination).inspect_err(log_rejection)?;

        let project = scope.project_id.to_string();
        let filters = plan.predicate.fields().join(",");
        let group = plan.group.map(|g| g.name()).unwrap_or("");
        let obs = ObservationScope::with_fields(
            "DRAFT_LIST",
            &[
                ("project_id", project.as_str()),
                ("filters", filters.as_str()),
                ("order_by", plan.ordering.requested()),
                ("group_by", group),
            ],
        );

        let result = self.run_list(scope, &plan);
        match &result {
            Ok(response) => {
                let total = response.total_count().to_string();
                obs.complete_with_fields(&[("total_count", total.as_str())]);
            }
            Err(e) => obs.fail(&e.to_string()),
        }
        result
    }

    fn run_list(&self, scope: &ProjectScope, plan: &ListPlan) -> QueryResult<ListResponse> {
        let store: &S = &self.store;

        let mut predicate = plan.predicate.clone();
        if let (Some(field), Some(key)) = (plan.group, plan.group_key) {
            predicate = predicate.and(field.clause_for(&key));
        }

        let rows = store.filter(scope, &predicate)?;
        let annotate_upfront = plan.ordering.needs_annotations();
        let rows = if annotate_upfront {
            let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
            let mut annotations = store.annotate(&ids, &AnnotationPlan::list())?;
            rows.into_iter()
                .map(|issue| AnnotatedIssue {
                    annotations: annotations.remove(&issue.id).unwrap_or_default(),
                    issue,
                })
                .collect()
        } else {
            rows.into_iter().map(AnnotatedIssue::bare).collect()
        };

        let ordered: Vec<Arc<AnnotatedIssue>> = store
            .order(rows, &plan.ordering)?
            .into_iter()
            .map(Arc::new)
            .collect();

        let page_plan = AnnotationPlan::list();
        let page_plan = (!annotate_upfront).then_some(&page_plan);
        let materializer = Materializer::new(store);

        let Some(field) = plan.group else {
            let page = paginate_flat(&ordered, &plan.cursor);
            let ids: Vec<Uuid> = page.results.iter().map(|r| r.id()).collect();
            let batch = materializer.load(&ids, page_plan)?;
            return Ok(ListResponse::Flat(page.map_results(|row| batch.shape(&row))));
        };

        let paginator = GroupedPaginator::new(store, &self.sub_count);
        let page = match plan.group_key {
            Some(key) => {
                // an empty group is only listed when something else matches
                if ordered.is_empty() && store.count(scope, &plan.predicate)? == 0 {
                    GroupedPage::empty(&plan.cursor)
                } else {
                    paginator.paginate_one(scope, field, key, &ordered, &plan.cursor)?
                }
            }
            None => {
                let projection =
                    GroupingProjector::new(store).project(scope, &plan.predicate, field, ordered)?;
                paginator.paginate(scope, projection, &plan.cursor)?
            }
        };

        let mut seen = HashSet::new();
        let ids: Vec<Uuid> = page
            .groups
            .iter()
            .flat_map(|g| g.results.iter().map(|r| r.id()))
            .filter(|id| seen.insert(*id))
            .collect();
        let batch = materializer.load(&ids, page_plan)?;
        Ok(ListResponse::Grouped(page.map_results(|row| batch.shape(&row))))
    }

    /// Detail view of one draft issue, with the actor's subscription flag
    pub fn fetch_one(
        &self,
        scope: &ProjectScope,
        actor: Uuid,
        id: Uuid,
    ) -> QueryResult<DraftIssueDetail> {
        let project = scope.project_id.to_string();
        let issue_id = id.to_string();
        let obs = ObservationScope::with_fields(
            "DRAFT_FETCH",
            &[("project_id", project.as_str()), ("issue_id", issue_id.as_str())],
        );

        let result = self.run_fetch(scope, actor, id);
        match &result {
            Ok(_) => obs.complete(),
            Err(e) if e.is_client_error() => obs.complete_with_fields(&[("outcome", e.code())]),
            Err(e) => obs.fail(&e.to_string()),
        }
        result
    }

    fn run_fetch(&self, scope: &ProjectScope, actor: Uuid, id: Uuid) -> QueryResult<DraftIssueDetail> {
        let row = self.find(scope, id)?;
        let mut annotations = self.store.annotate(&[id], &AnnotationPlan::detail(actor))?;
        let row = AnnotatedIssue {
            annotations: annotations.remove(&id).unwrap_or_default(),
            issue: row,
        };
        Materializer::new(&*self.store).detail(&row)
    }

    /// The draft with `id` in `scope`
    fn find(&self, scope: &ProjectScope, id: Uuid) -> QueryResult<Issue> {
        self.store
            .filter(scope, &Predicate::by_id(id))?
            .into_iter()
            .next()
            .ok_or(QueryError::NotFound(id))
    }
}

fn log_rejection(error: &QueryError) {
    let field = error.field().unwrap_or("");
    let reason = error.to_string();
    Logger::warn(
        Event::RequestRejected.as_str(),
        &[("field", field), ("reason", reason.as_str())],
    );
}
