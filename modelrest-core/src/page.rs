//! Pagination parameters and result windows for list queries.
//!
//! Pages are 1-based. A page past the end of the result set is not an error;
//! it simply yields no items.

use serde::{Deserialize, Serialize};

/// Page size used when a request selects a page without giving a size.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// One window of a query result.
///
/// `count` is the number of documents the filter matched before the window was applied,
/// so an empty `items` with a non-zero `count` is a page past the end.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Page<T> {
    /// Items inside the requested window.
    pub items: Vec<T>,
    /// Total matches across all pages.
    pub count: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, count: u64) -> Self {
        Self { items, count }
    }
}

/// Parameters selecting one window of an ordered result set.
///
/// # Example
///
/// ```ignore
/// use modelrest::page::PaginationParams;
///
/// let params = PaginationParams::new(3, 10);
/// assert_eq!(params.offset(), 20);
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationParams {
    /// The page number (1-indexed).
    pub page: usize,
    /// The number of items per page.
    pub per_page: usize,
}

impl PaginationParams {
    pub fn new(page: usize, per_page: usize) -> Self {
        Self { page, per_page }
    }

    /// Number of items skipped before this page starts.
    pub fn offset(&self) -> usize {
        self.page.saturating_sub(1).saturating_mul(self.per_page)
    }

    /// Maximum number of items on this page.
    pub fn limit(&self) -> usize {
        self.per_page
    }
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self { page: 1, per_page: DEFAULT_PAGE_SIZE }
    }
}
