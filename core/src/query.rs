//! Per-request query context.
//!
//! A [`QueryContext`] is the parsed form of the request's filter / sort /
//! include / fields / page parameters. The engine consumes it as-is; the
//! grammar that produces it lives with the hosting layer (`apiary-web`
//! parses the conventional JSON:API query string). Syntax is the parser's
//! concern — semantic validation (unknown field names, unknown includes)
//! stays with the schema adapter.
//!
//! A context is immutable once built and owned by the request that built
//! it; nothing here is shared across requests.

use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Comparison operator of a filter clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOp {
    /// Equality.
    Eq,
    /// Inequality.
    Ne,
    /// Strictly less than.
    Lt,
    /// Less than or equal.
    Le,
    /// Strictly greater than.
    Gt,
    /// Greater than or equal.
    Ge,
    /// Substring or membership containment.
    Contains,
}

/// One filter clause: `{name, op, val}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FilterClause {
    /// Attribute the clause applies to.
    pub name: String,
    /// Comparison operator.
    pub op: FilterOp,
    /// Comparison operand.
    pub val: Value,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Ascending (the default).
    Asc,
    /// Descending (`-` prefix in the query string).
    Desc,
}

/// One sort criterion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortField {
    /// Attribute to sort by.
    pub field: String,
    /// Direction.
    pub order: SortOrder,
}

/// Pagination parameters as supplied by the client.
///
/// Absent members fall back to the engine defaults (page 1, size 30) at
/// the point of use; a size of zero disables paging links.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageParams {
    /// Requested page number, 1-based.
    pub number: Option<u64>,
    /// Requested page size.
    pub size: Option<u64>,
}

/// Default page size when the client supplies none.
pub const DEFAULT_PAGE_SIZE: u64 = 30;

impl PageParams {
    /// Effective 1-based page number.
    #[must_use]
    pub fn number(&self) -> u64 {
        self.number.unwrap_or(1).max(1)
    }

    /// Effective page size.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.size.unwrap_or(DEFAULT_PAGE_SIZE)
    }
}

/// Parsed representation of a request's query parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryContext {
    filters: Vec<FilterClause>,
    sort: Vec<SortField>,
    include: Vec<String>,
    fields: BTreeMap<String, Vec<String>>,
    page: PageParams,
}

impl QueryContext {
    /// An empty context: no filters, no sort, no includes, default paging.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the filter clauses.
    #[must_use]
    pub fn with_filters(mut self, filters: Vec<FilterClause>) -> Self {
        self.filters = filters;
        self
    }

    /// Replace the sort criteria.
    #[must_use]
    pub fn with_sort(mut self, sort: Vec<SortField>) -> Self {
        self.sort = sort;
        self
    }

    /// Replace the include paths (dot-separated relation paths).
    #[must_use]
    pub fn with_include(mut self, include: Vec<String>) -> Self {
        self.include = include;
        self
    }

    /// Add a sparse fieldset for one type.
    #[must_use]
    pub fn with_fields(mut self, type_name: impl Into<String>, fields: Vec<String>) -> Self {
        self.fields.insert(type_name.into(), fields);
        self
    }

    /// Set the page parameters.
    #[must_use]
    pub fn with_page(mut self, page: PageParams) -> Self {
        self.page = page;
        self
    }

    /// Filter clauses, in request order.
    #[must_use]
    pub fn filters(&self) -> &[FilterClause] {
        &self.filters
    }

    /// Sort criteria, in request order.
    #[must_use]
    pub fn sort(&self) -> &[SortField] {
        &self.sort
    }

    /// Requested include paths, in request order.
    #[must_use]
    pub fn include(&self) -> &[String] {
        &self.include
    }

    /// Sparse fieldset for a type, when the client requested one.
    #[must_use]
    pub fn fields_for(&self, type_name: &str) -> Option<&[String]> {
        self.fields.get(type_name).map(Vec::as_slice)
    }

    /// All sparse fieldsets, keyed by type.
    #[must_use]
    pub fn fields(&self) -> &BTreeMap<String, Vec<String>> {
        &self.fields
    }

    /// Page parameters.
    #[must_use]
    pub const fn page(&self) -> &PageParams {
        &self.page
    }
}
