//! Scripted in-memory catalogue for unit tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Semaphore;

use crate::catalogue::{Book, CatalogueService, FetchError, ListRequest, ListResponse, Person};

type PageKey = (String, u32);

/// Yields to spawned tasks until `condition` holds.
#[allow(clippy::expect_used)]
pub(crate) async fn wait_for(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("condition not reached in time");
}

/// Catalogue whose answers are scripted per `(search terms, page)`.
///
/// Requests for an unscripted page fail with a 500. A gated page blocks
/// until [`ScriptedCatalogue::release`] is called for it.
#[derive(Default)]
pub(crate) struct ScriptedCatalogue {
    pages: Mutex<HashMap<PageKey, Result<ListResponse, FetchError>>>,
    gates: Mutex<HashMap<PageKey, Arc<Semaphore>>>,
    books: Mutex<HashMap<u64, Book>>,
    active: Mutex<HashMap<String, (usize, usize)>>,
    list_calls: AtomicUsize,
    book_calls: AtomicUsize,
}

#[allow(clippy::unwrap_used)]
impl ScriptedCatalogue {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn respond(&self, terms: &str, page: u32, response: ListResponse) {
        self.pages
            .lock()
            .unwrap()
            .insert((terms.to_string(), page), Ok(response));
    }

    pub(crate) fn fail(&self, terms: &str, page: u32, error: FetchError) {
        self.pages
            .lock()
            .unwrap()
            .insert((terms.to_string(), page), Err(error));
    }

    /// Holds requests for `(terms, page)` until released.
    ///
    /// Gating the same page again replaces the gate for later requests;
    /// requests already waiting stay on the returned one.
    pub(crate) fn gate(&self, terms: &str, page: u32) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        self.gates
            .lock()
            .unwrap()
            .insert((terms.to_string(), page), Arc::clone(&gate));
        gate
    }

    pub(crate) fn release(&self, terms: &str, page: u32) {
        if let Some(gate) = self.gates.lock().unwrap().get(&(terms.to_string(), page)) {
            // Closing wakes every waiter and lets later requests straight through.
            gate.close();
        }
    }

    pub(crate) fn add_book(&self, book: Book) {
        self.books.lock().unwrap().insert(book.id, book);
    }

    pub(crate) fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn book_calls(&self) -> usize {
        self.book_calls.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneous listing requests seen for `terms`.
    pub(crate) fn max_concurrent(&self, terms: &str) -> usize {
        self.active
            .lock()
            .unwrap()
            .get(terms)
            .map_or(0, |(_, max)| *max)
    }

    pub(crate) fn book(id: u64, title: &str) -> Book {
        Book {
            id,
            title: title.to_string(),
            authors: vec![Person {
                name: "Author, Test".to_string(),
                birth_year: Some(1800),
                death_year: Some(1870),
            }],
            translators: Vec::new(),
            subjects: Vec::new(),
            bookshelves: Vec::new(),
            languages: vec!["en".to_string()],
            copyright: Some(false),
            media_type: "Text".to_string(),
            formats: std::iter::once((
                crate::catalogue::COVER_FORMAT.to_string(),
                format!("https://covers.test/{id}.jpg"),
            ))
            .collect(),
            download_count: id * 10,
        }
    }

    /// A listing page of `items` books out of `total`, ids `page * 1000 + i`.
    pub(crate) fn page_of(page: u32, items: u64, total: u64, has_next: bool) -> ListResponse {
        ListResponse {
            count: total,
            next: has_next.then(|| format!("https://gutendex.test/books/?page={}", page + 1)),
            previous: (page > 1).then(|| format!("https://gutendex.test/books/?page={}", page - 1)),
            results: (0..items)
                .map(|i| Self::book(u64::from(page) * 1000 + i, &format!("Book {page}.{i}")))
                .collect(),
        }
    }

    fn enter(&self, terms: &str) {
        let mut active = self.active.lock().unwrap();
        let (now, max) = active.entry(terms.to_string()).or_insert((0, 0));
        *now += 1;
        *max = (*max).max(*now);
    }

    fn leave(&self, terms: &str) {
        if let Some((now, _)) = self.active.lock().unwrap().get_mut(terms) {
            *now -= 1;
        }
    }
}

#[async_trait]
#[allow(clippy::unwrap_used)]
impl CatalogueService for ScriptedCatalogue {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn list_books(&self, request: &ListRequest) -> Result<ListResponse, FetchError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let terms = request.search.clone().unwrap_or_default();
        let key = (terms.clone(), request.page);

        self.enter(&terms);
        let gate = self.gates.lock().unwrap().get(&key).cloned();
        if let Some(gate) = gate {
            let _ = gate.acquire().await;
        }
        let scripted = self.pages.lock().unwrap().get(&key).cloned();
        self.leave(&terms);

        scripted.unwrap_or_else(|| {
            Err(FetchError::http_status(
                format!("https://gutendex.test/books/?page={}", request.page),
                500,
            ))
        })
    }

    async fn get_book(&self, id: u64) -> Result<Book, FetchError> {
        self.book_calls.fetch_add(1, Ordering::SeqCst);
        self.books
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or_else(|| FetchError::not_found(id))
    }
}
