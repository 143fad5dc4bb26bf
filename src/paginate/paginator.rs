//! Flat and grouped page assembly

use std::sync::Arc;

use serde::Serialize;

use crate::error::QueryResult;
use crate::filter::Predicate;
use crate::grouping::{GroupField, GroupKey, GroupProjection};
use crate::model::{AnnotatedIssue, ProjectScope};
use crate::store::RecordStore;

use super::cursor::Cursor;

/// One page of an ungrouped listing
#[derive(Debug, Clone, Serialize)]
pub struct FlatPage<T> {
    pub results: Vec<T>,
    pub total_count: usize,
    pub next_cursor: Option<String>,
    pub prev_cursor: Option<String>,
    pub total_pages: usize,
}

impl<T> FlatPage<T> {
    pub fn map_results<U, F: FnMut(T) -> U>(self, f: F) -> FlatPage<U> {
        FlatPage {
            results: self.results.into_iter().map(f).collect(),
            total_count: self.total_count,
            next_cursor: self.next_cursor,
            prev_cursor: self.prev_cursor,
            total_pages: self.total_pages,
        }
    }
}

/// One group's slice of a grouped page
#[derive(Debug, Clone, Serialize)]
pub struct GroupPage<T> {
    pub key: GroupKey,
    pub results: Vec<T>,
    pub total_count: usize,
    pub sub_count: usize,
    pub next_cursor: Option<String>,
}

/// Every group paginated with the same cursor
#[derive(Debug, Clone, Serialize)]
pub struct GroupedPage<T> {
    pub groups: Vec<GroupPage<T>>,
    /// Distinct matching records, not the fan-out sum
    pub total_count: usize,
    pub next_cursor: Option<String>,
    pub prev_cursor: Option<String>,
}

impl<T> GroupedPage<T> {
    /// No matching records: no groups, zero totals
    pub fn empty(cursor: &Cursor) -> Self {
        Self {
            groups: Vec::new(),
            total_count: 0,
            next_cursor: None,
            prev_cursor: cursor.prev().map(|c| c.to_string()),
        }
    }

    pub fn map_results<U, F: FnMut(T) -> U>(self, mut f: F) -> GroupedPage<U> {
        GroupedPage {
            groups: self
                .groups
                .into_iter()
                .map(|g| GroupPage {
                    key: g.key,
                    results: g.results.into_iter().map(&mut f).collect(),
                    total_count: g.total_count,
                    sub_count: g.sub_count,
                    next_cursor: g.next_cursor,
                })
                .collect(),
            total_count: self.total_count,
            next_cursor: self.next_cursor,
            prev_cursor: self.prev_cursor,
        }
    }
}

fn slice<T: Clone>(rows: &[T], cursor: &Cursor) -> Vec<T> {
    rows.iter()
        .skip(cursor.offset())
        .take(cursor.per_page)
        .cloned()
        .collect()
}

/// Cuts one page out of an ordered row set
pub fn paginate_flat<T: Clone>(rows: &[T], cursor: &Cursor) -> FlatPage<T> {
    let total = rows.len();
    FlatPage {
        results: slice(rows, cursor),
        total_count: total,
        next_cursor: cursor.next(total).map(|c| c.to_string()),
        prev_cursor: cursor.prev().map(|c| c.to_string()),
        total_pages: total.div_ceil(cursor.per_page),
    }
}

/// Paginates groups and computes each group's sub-count
pub struct GroupedPaginator<'a, S: RecordStore + ?Sized> {
    store: &'a S,
    sub_predicate: &'a Predicate,
}

impl<'a, S: RecordStore + ?Sized> GroupedPaginator<'a, S> {
    pub fn new(store: &'a S, sub_predicate: &'a Predicate) -> Self {
        Self {
            store,
            sub_predicate,
        }
    }

    /// Applies `cursor` to every group independently, in enumeration order.
    ///
    /// Any sub-count failure fails the whole page.
    pub fn paginate(
        &self,
        scope: &ProjectScope,
        projection: GroupProjection,
        cursor: &Cursor,
    ) -> QueryResult<GroupedPage<Arc<AnnotatedIssue>>> {
        let field = projection.field();
        let distinct = projection.distinct_count();
        let mut has_more = false;

        let mut groups = Vec::new();
        for (key, rows) in projection.into_groups() {
            let page = self.group_page(scope, field, key, &rows, cursor)?;
            has_more |= page.next_cursor.is_some();
            groups.push(page);
        }

        Ok(GroupedPage {
            groups,
            total_count: distinct,
            next_cursor: has_more.then(|| cursor.following().to_string()),
            prev_cursor: cursor.prev().map(|c| c.to_string()),
        })
    }

    /// Page of a single group whose rows are already scoped to `key`
    pub fn paginate_one(
        &self,
        scope: &ProjectScope,
        field: GroupField,
        key: GroupKey,
        rows: &[Arc<AnnotatedIssue>],
        cursor: &Cursor,
    ) -> QueryResult<GroupedPage<Arc<AnnotatedIssue>>> {
        let page = self.group_page(scope, field, key, rows, cursor)?;
        Ok(GroupedPage {
            next_cursor: page.next_cursor.clone(),
            prev_cursor: cursor.prev().map(|c| c.to_string()),
            total_count: rows.len(),
            groups: vec![page],
        })
    }

    fn group_page(
        &self,
        scope: &ProjectScope,
        field: GroupField,
        key: GroupKey,
        rows: &[Arc<AnnotatedIssue>],
        cursor: &Cursor,
    ) -> QueryResult<GroupPage<Arc<AnnotatedIssue>>> {
        let sub_predicate = self.sub_predicate.clone().and(field.clause_for(&key));
        let sub_count = self.store.count(scope, &sub_predicate)?;

        Ok(GroupPage {
            key,
            results: slice(rows, cursor),
            total_count: rows.len(),
            sub_count,
            next_cursor: cursor.next(rows.len()).map(|c| c.to_string()),
        })
    }
}
