//! Pagination position for the current search.
//!
//! The cursor follows the catalogue's continuation token: after a page is
//! loaded, the next page to request is whatever the response's `next` link
//! names, and there is no next page once a response carries no `next`.

use tracing::trace;

use crate::cache::PageResult;

/// Current page and the page that follows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationCursor {
    current: u32,
    next: Option<u32>,
}

impl Default for PaginationCursor {
    fn default() -> Self {
        Self::new()
    }
}

impl PaginationCursor {
    /// A cursor before anything is loaded: page 1 comes next.
    #[must_use]
    pub fn new() -> Self {
        Self {
            current: 0,
            next: Some(1),
        }
    }

    /// Highest page loaded so far, 0 before the first page.
    #[must_use]
    pub fn current(&self) -> u32 {
        self.current
    }

    /// Whether the catalogue reported another page.
    #[must_use]
    pub fn has_next(&self) -> bool {
        self.next.is_some()
    }

    /// Page to request next, if any.
    #[must_use]
    pub fn next(&self) -> Option<u32> {
        self.next
    }

    /// Moves past a loaded page.
    ///
    /// Pages older than the current one leave the cursor where it is, so an
    /// earlier page arriving late cannot move it backwards.
    pub fn advance(&mut self, page: &PageResult) {
        if page.page_number < self.current {
            trace!(page = page.page_number, current = self.current, "cursor ignores older page");
            return;
        }
        self.current = page.page_number;
        self.next = if page.has_next { page.next_page } else { None };
        trace!(current = self.current, next = ?self.next, "cursor advanced");
    }

    /// Back to the state before the first page.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Starts from `page` (a page number restored from the address bar).
    ///
    /// Nothing is known to be loaded yet, so `page` itself is requested next.
    pub fn restore(&mut self, page: u32) {
        let page = page.max(1);
        self.current = page - 1;
        self.next = Some(page);
    }
}
