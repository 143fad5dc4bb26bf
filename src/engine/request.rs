//! List request and response shapes

use serde::{Deserialize, Serialize};

use crate::error::{QueryError, QueryResult};
use crate::filter::{compile_filters, Predicate, RawFilters};
use crate::grouping::{GroupField, GroupKey};
use crate::materialize::DraftIssue;
use crate::ordering::{resolve_ordering, OrderingSpec};
use crate::paginate::{resolve_cursor, Cursor, FlatPage, GroupedPage, PaginationConfig};

/// Raw list parameters as received from a client
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListRequest {
    #[serde(default)]
    pub filters: RawFilters,
    #[serde(default)]
    pub order_by: Option<String>,
    #[serde(default)]
    pub group_by: Option<String>,
    /// Fetch a single group; requires `group_by`
    #[serde(default)]
    pub group_key: Option<String>,
    #[serde(default)]
    pub cursor: Option<String>,
    #[serde(default)]
    pub per_page: Option<String>,
}

impl ListRequest {
    /// Builds a request from flat query pairs.
    ///
    /// Reserved keys set their parameter; every other key is a filter whose
    /// comma-separated values accumulate across repeats.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut request = ListRequest::default();
        for (key, value) in pairs {
            let value = value.as_ref();
            let slot = match key.as_ref() {
                "order_by" => &mut request.order_by,
                "group_by" => &mut request.group_by,
                "group_key" => &mut request.group_key,
                "cursor" => &mut request.cursor,
                "per_page" => &mut request.per_page,
                field => {
                    request
                        .filters
                        .entry(field.to_string())
                        .or_default()
                        .extend(value.split(',').map(str::to_string));
                    continue;
                }
            };
            *slot = Some(value.to_string());
        }
        request
    }

    pub fn with_filter(mut self, field: &str, values: &[&str]) -> Self {
        self.filters
            .entry(field.to_string())
            .or_default()
            .extend(values.iter().map(|v| v.to_string()));
        self
    }

    pub fn order_by(mut self, key: &str) -> Self {
        self.order_by = Some(key.to_string());
        self
    }

    pub fn group_by(mut self, field: &str) -> Self {
        self.group_by = Some(field.to_string());
        self
    }

    pub fn group_key(mut self, key: &str) -> Self {
        self.group_key = Some(key.to_string());
        self
    }

    pub fn cursor(mut self, cursor: &str) -> Self {
        self.cursor = Some(cursor.to_string());
        self
    }

    pub fn per_page(mut self, per_page: usize) -> Self {
        self.per_page = Some(per_page.to_string());
        self
    }
}

/// A list request after validation. Built before any store access.
#[derive(Debug, Clone)]
pub(crate) struct ListPlan {
    pub predicate: Predicate,
    pub ordering: OrderingSpec,
    pub group: Option<GroupField>,
    pub group_key: Option<GroupKey>,
    pub cursor: Cursor,
}

impl ListPlan {
    pub fn compile(request: &ListRequest, pagination: &PaginationConfig) -> QueryResult<Self> {
        let predicate = compile_filters(&request.filters)?;
        let ordering = resolve_ordering(request.order_by.as_deref())?;

        let group = request
            .group_by
            .as_deref()
            .map(str::trim)
            .filter(|g| !g.is_empty())
            .map(GroupField::parse)
            .transpose()?;

        let group_key = match (group, request.group_key.as_deref().map(str::trim)) {
            (_, None) | (_, Some("")) => None,
            (Some(field), Some(raw)) => Some(field.parse_key(raw)?),
            (None, Some(_)) => {
                return Err(QueryError::validation("group_key", "group_key requires group_by"))
            }
        };

        let cursor = resolve_cursor(
            pagination,
            request.cursor.as_deref(),
            request.per_page.as_deref(),
        )?;

        Ok(Self {
            predicate,
            ordering,
            group,
            group_key,
            cursor,
        })
    }
}

/// Result of a list call
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ListResponse {
    Flat(FlatPage<DraftIssue>),
    Grouped(GroupedPage<DraftIssue>),
}

impl ListResponse {
    pub fn total_count(&self) -> usize {
        match self {
            ListResponse::Flat(page) => page.total_count,
            ListResponse::Grouped(page) => page.total_count,
        }
    }

    pub fn as_flat(&self) -> Option<&FlatPage<DraftIssue>> {
        match self {
            ListResponse::Flat(page) => Some(page),
            ListResponse::Grouped(_) => None,
        }
    }

    pub fn as_grouped(&self) -> Option<&GroupedPage<DraftIssue>> {
        match self {
            ListResponse::Grouped(page) => Some(page),
            ListResponse::Flat(_) => None,
        }
    }
}
