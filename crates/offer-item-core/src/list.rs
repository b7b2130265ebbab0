//! Paging and sorting vocabulary shared by list queries.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// One sort key of a list query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sort {
    /// Column or attribute to order by.
    pub order_by: String,
    /// Whether to sort descending.
    pub desc: bool,
}

/// Offset/limit paging plus an ordered list of sort keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListCondition {
    offset: u32,
    limit: u32,
    sorts: Vec<Sort>,
}

impl ListCondition {
    /// Builds a list condition.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if any sort key is blank.
    pub fn new(offset: u32, limit: u32, sorts: Vec<Sort>) -> Result<Self, DomainError> {
        if sorts.iter().any(|s| s.order_by.trim().is_empty()) {
            return Err(DomainError::validation("sort order_by must not be empty"));
        }
        Ok(Self {
            offset,
            limit,
            sorts,
        })
    }

    #[must_use]
    pub fn offset(&self) -> u32 {
        self.offset
    }

    #[must_use]
    pub fn limit(&self) -> u32 {
        self.limit
    }

    #[must_use]
    pub fn sorts(&self) -> &[Sort] {
        &self.sorts
    }
}

/// Counts returned alongside a page of results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ListResult {
    /// Number of rows in this page.
    pub count: u64,
    /// Number of rows matching the query, ignoring paging.
    pub total_count: u64,
}
