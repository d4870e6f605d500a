//! Per-search cache entries.

use std::sync::Arc;

use futures_util::future::{BoxFuture, Shared};

use crate::catalogue::{BookSummary, FetchError, ListResponse};
use crate::filter::QueryKey;

/// Pending page request shared by every caller that joins it.
pub(crate) type SharedPage = Shared<BoxFuture<'static, Result<Arc<PageResult>, FetchError>>>;

/// One fetched page. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageResult {
    /// Page number this result was requested as.
    pub page_number: u32,
    /// Books on the page, in service order.
    pub items: Vec<BookSummary>,
    /// Total matches reported by the service.
    pub total_count: u64,
    /// Whether the service reported a continuation.
    pub has_next: bool,
    /// Page number named by the continuation, when `has_next`.
    pub next_page: Option<u32>,
}

impl PageResult {
    /// Builds a page result from a listing response.
    ///
    /// `has_next` follows the response's continuation indicator, never the
    /// total count. When a continuation exists but names no page, the next
    /// page is assumed to be `page_number + 1`.
    #[must_use]
    pub fn from_response(page_number: u32, response: &ListResponse) -> Self {
        let has_next = response.next.is_some();
        let next_page = if has_next {
            response
                .next_page()
                .or_else(|| page_number.checked_add(1))
        } else {
            None
        };
        Self {
            page_number,
            items: response.results.iter().map(BookSummary::from).collect(),
            total_count: response.count,
            has_next,
            next_page,
        }
    }
}

#[derive(Clone)]
pub(crate) struct InFlight {
    pub(crate) id: u64,
    pub(crate) page: u32,
    pub(crate) future: SharedPage,
}

/// Everything cached for one [`QueryKey`].
#[derive(Clone)]
pub struct CacheEntry {
    key: QueryKey,
    pages: Vec<Arc<PageResult>>,
    next_page_token: Option<u32>,
    pub(crate) in_flight: Option<InFlight>,
    last_error: Option<FetchError>,
}

impl CacheEntry {
    /// Creates an empty entry; its first page to fetch is page 1.
    #[must_use]
    pub fn new(key: QueryKey) -> Self {
        Self {
            key,
            pages: Vec::new(),
            next_page_token: Some(1),
            in_flight: None,
            last_error: None,
        }
    }

    /// The search this entry belongs to.
    #[must_use]
    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    /// Stored pages in ascending page-number order.
    #[must_use]
    pub fn pages(&self) -> &[Arc<PageResult>] {
        &self.pages
    }

    /// Page numbers currently stored.
    #[must_use]
    pub fn page_numbers(&self) -> Vec<u32> {
        self.pages.iter().map(|page| page.page_number).collect()
    }

    /// Looks up a stored page.
    #[must_use]
    pub fn page(&self, page_number: u32) -> Option<&Arc<PageResult>> {
        self.pages
            .binary_search_by_key(&page_number, |page| page.page_number)
            .ok()
            .map(|index| &self.pages[index])
    }

    /// All stored books, page by page.
    pub fn items(&self) -> impl Iterator<Item = &BookSummary> {
        self.pages.iter().flat_map(|page| page.items.iter())
    }

    /// Next page to request, from the latest page's continuation.
    #[must_use]
    pub fn next_page_token(&self) -> Option<u32> {
        self.next_page_token
    }

    /// Whether the service reported more pages.
    #[must_use]
    pub fn has_next(&self) -> bool {
        self.next_page_token.is_some()
    }

    /// Total matches reported by the latest stored page.
    #[must_use]
    pub fn total_count(&self) -> Option<u64> {
        self.pages.last().map(|page| page.total_count)
    }

    /// Whether a request for this key is outstanding.
    #[must_use]
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Page number of the outstanding request, if any.
    #[must_use]
    pub fn in_flight_page(&self) -> Option<u32> {
        self.in_flight.as_ref().map(|in_flight| in_flight.page)
    }

    /// Error of the most recent failed request, cleared by the next success.
    #[must_use]
    pub fn last_error(&self) -> Option<&FetchError> {
        self.last_error.as_ref()
    }

    /// Inserts a page at its page-number position.
    ///
    /// Pages may arrive out of order; the sequence stays sorted and the
    /// continuation is taken from the highest page stored.
    pub(crate) fn insert_page(&mut self, page: Arc<PageResult>) {
        match self
            .pages
            .binary_search_by_key(&page.page_number, |stored| stored.page_number)
        {
            // Results are immutable once stored.
            Ok(_) => {}
            Err(index) => self.pages.insert(index, page),
        }
        if let Some(last) = self.pages.last() {
            self.next_page_token = if last.has_next { last.next_page } else { None };
        }
        self.last_error = None;
    }

    pub(crate) fn record_error(&mut self, error: FetchError) {
        self.last_error = Some(error);
    }
}

impl std::fmt::Debug for CacheEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheEntry")
            .field("key", &self.key.to_string())
            .field("pages", &self.page_numbers())
            .field("next_page_token", &self.next_page_token)
            .field("in_flight_page", &self.in_flight_page())
            .field("last_error", &self.last_error)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalogue::Book;

    fn page(page_number: u32, next_page: Option<u32>) -> Arc<PageResult> {
        Arc::new(PageResult {
            page_number,
            items: Vec::new(),
            total_count: 100,
            has_next: next_page.is_some(),
            next_page,
        })
    }

    fn response(ids: &[u64], next: Option<&str>) -> ListResponse {
        ListResponse {
            count: 45,
            next: next.map(str::to_string),
            previous: None,
            results: ids
                .iter()
                .map(|id| Book {
                    id: *id,
                    title: format!("Book {id}"),
                    authors: Vec::new(),
                    translators: Vec::new(),
                    subjects: Vec::new(),
                    bookshelves: Vec::new(),
                    languages: vec!["en".to_string()],
                    copyright: Some(false),
                    media_type: "Text".to_string(),
                    formats: Default::default(),
                    download_count: 1,
                })
                .collect(),
        }
    }

    #[test]
    fn test_new_entry_starts_at_page_one() {
        let entry = CacheEntry::new(QueryKey::default());
        assert_eq!(entry.next_page_token(), Some(1));
        assert!(entry.has_next());
        assert!(entry.pages().is_empty());
        assert!(!entry.is_in_flight());
    }

    #[test]
    fn test_reverse_arrival_is_stored_in_page_order() {
        let mut entry = CacheEntry::new(QueryKey::default());
        entry.insert_page(page(2, Some(3)));
        entry.insert_page(page(1, Some(2)));
        assert_eq!(entry.page_numbers(), vec![1, 2]);
        assert_eq!(entry.next_page_token(), Some(3));
    }

    #[test]
    fn test_insert_keeps_first_result_for_a_page() {
        let mut entry = CacheEntry::new(QueryKey::default());
        let first = page(1, Some(2));
        entry.insert_page(Arc::clone(&first));
        entry.insert_page(page(1, None));
        assert!(Arc::ptr_eq(entry.page(1).unwrap_or(&first), &first));
        assert_eq!(entry.pages().len(), 1);
    }

    #[test]
    fn test_last_page_clears_token() {
        let mut entry = CacheEntry::new(QueryKey::default());
        entry.insert_page(page(1, Some(2)));
        entry.insert_page(page(2, None));
        assert!(!entry.has_next());
    }

    #[test]
    fn test_success_clears_last_error() {
        let mut entry = CacheEntry::new(QueryKey::default());
        entry.record_error(FetchError::http_status("https://x.test/books/", 500));
        assert!(entry.last_error().is_some());
        entry.insert_page(page(1, None));
        assert!(entry.last_error().is_none());
    }

    #[test]
    fn test_page_result_uses_continuation_not_count() {
        let result = PageResult::from_response(
            1,
            &response(&[1, 2], Some("https://gutendex.com/books/?page=2&search=dickens")),
        );
        assert!(result.has_next);
        assert_eq!(result.next_page, Some(2));
        assert_eq!(result.items.len(), 2);

        // Count says more exist, but the service truncated: no continuation.
        let truncated = PageResult::from_response(3, &response(&[5], None));
        assert!(!truncated.has_next);
        assert_eq!(truncated.next_page, None);
    }

    #[test]
    fn test_page_result_falls_back_to_next_number() {
        let result =
            PageResult::from_response(4, &response(&[1], Some("https://gutendex.com/books/")));
        assert_eq!(result.next_page, Some(5));
    }
}
