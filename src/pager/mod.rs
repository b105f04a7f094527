//! Paginated reads over log segments
//!
//! Translates `(segment name, page, page_size)` into a bounded slice of lines
//! plus totals. Out-of-range page numbers clamp instead of failing; only a
//! missing segment is an error. Lines that parse as JSON are re-encoded in
//! canonical form so viewers get a uniform representation; anything else
//! passes through trimmed.

use crate::store::{RotationStore, StoreError};
use serde::Serialize;

/// Largest allowed page size
pub const MAX_PAGE_SIZE: usize = 1000;

/// One page of log lines. Derived value, never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct PageResult {
    /// Lines on this page, in file order
    pub lines: Vec<String>,
    /// Total line count of the segment
    pub total: usize,
    /// ceil(total / page_size); 0 for an empty segment
    pub total_pages: usize,
    /// The page actually served, after clamping
    pub current_page: usize,
    /// The page size actually used, after clamping
    pub page_size: usize,
}

/// Pagination service over a [`RotationStore`]
#[derive(Debug, Clone)]
pub struct Paginator {
    store: RotationStore,
}

impl Paginator {
    pub fn new(store: RotationStore) -> Self {
        Paginator { store }
    }

    /// Fetch one page of `name`, clamping `page` into `[1, total_pages]` and
    /// `page_size` into `[1, MAX_PAGE_SIZE]`.
    pub fn paginate(
        &self,
        name: &str,
        page: usize,
        page_size: usize,
    ) -> Result<PageResult, StoreError> {
        let page_size = page_size.clamp(1, MAX_PAGE_SIZE);

        // One read yields both the window and the total, with past-the-end
        // starts already clamped to the final page. A rotation racing with
        // the read can therefore never leave lines and totals disagreeing.
        let start = page.saturating_sub(1).saturating_mul(page_size);
        let (lines, total) = self.store.read_segment_page(name, start, page_size)?;

        let total_pages = (total + page_size - 1) / page_size;
        let current_page = page.min(total_pages).max(1);

        let lines = lines.iter().map(|line| canonicalize(line)).collect();

        Ok(PageResult {
            lines,
            total,
            total_pages,
            current_page,
            page_size,
        })
    }
}

/// Re-encode a JSON line canonically; pass anything else through trimmed.
fn canonicalize(line: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(line) {
        Ok(value) => serde_json::to_string(&value).unwrap_or_else(|_| line.trim().to_string()),
        Err(_) => line.trim().to_string(),
    }
}
