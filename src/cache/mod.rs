//! Session-scoped request cache for catalogue pages and book lookups.
//!
//! [`RequestCache`] answers `fetch_page(key, page)` from memory when it can
//! and otherwise issues exactly one outbound request per [`QueryKey`] at a
//! time. Callers asking for a page that is already being fetched join the
//! pending request instead of issuing a duplicate; callers asking for another
//! page of a busy key wait for it to finish first.
//!
//! # Concurrency
//!
//! Entries live in a `DashMap`. Shard locks are only held inside synchronous
//! sections and never across an `.await`: the pending request is a
//! [`Shared`] future that is cloned out of the entry before anyone awaits it.
//! Registration happens when [`RequestCache::fetch_page`] is called, not when
//! the returned future is first polled, so an event handler can start a fetch
//! and know it is in flight before yielding.
//!
//! Outbound requests run on their own Tokio task, so they complete and are
//! stored even if every caller drops its future. A result is stored only
//! while its request still owns the entry; after [`RequestCache::invalidate`]
//! late results go back to their callers and nowhere else.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use gutenscroll_core::cache::RequestCache;
//! use gutenscroll_core::catalogue::GutendexClient;
//! use gutenscroll_core::filter::FilterState;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let cache = RequestCache::new(Arc::new(GutendexClient::new()?));
//! let mut filter = FilterState::new();
//! filter.set_title("dickens");
//!
//! let outcome = cache.fetch_page(&filter.query_key(), 1).await;
//! let page = outcome.result?;
//! println!("{} books on page {}", page.items.len(), page.page_number);
//! # Ok(())
//! # }
//! ```

mod entry;

pub use entry::{CacheEntry, PageResult};

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};

use dashmap::DashMap;
use futures_util::future::{self, BoxFuture, FutureExt, Shared};
use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn};

use crate::catalogue::{Book, CatalogueService, FetchError, ListRequest};
use crate::filter::QueryKey;
use entry::{InFlight, SharedPage};

type SharedBook = Shared<BoxFuture<'static, Result<Arc<Book>, FetchError>>>;

/// Completed page fetch, tagged with the key and page it was issued for.
#[derive(Debug, Clone)]
pub struct PageOutcome {
    /// Search the request belonged to.
    pub key: QueryKey,
    /// Requested page.
    pub page: u32,
    /// The page or the error that prevented it.
    pub result: Result<Arc<PageResult>, FetchError>,
}

/// A page fetch that has been registered with the cache.
///
/// Resolves to a [`PageOutcome`]. Dropping it does not cancel the request:
/// the page is still fetched and stored.
#[must_use = "a page fetch does nothing unless awaited"]
pub struct PageFetch {
    key: QueryKey,
    page: u32,
    future: BoxFuture<'static, Result<Arc<PageResult>, FetchError>>,
}

impl PageFetch {
    /// Search this fetch belongs to.
    #[must_use]
    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    /// Requested page.
    #[must_use]
    pub fn page(&self) -> u32 {
        self.page
    }
}

impl Future for PageFetch {
    type Output = PageOutcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = &mut *self;
        this.future.as_mut().poll(cx).map(|result| PageOutcome {
            key: this.key.clone(),
            page: this.page,
            result,
        })
    }
}

impl std::fmt::Debug for PageFetch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageFetch")
            .field("key", &self.key.to_string())
            .field("page", &self.page)
            .finish_non_exhaustive()
    }
}

enum Begin {
    Hit(Arc<PageResult>),
    Join(SharedPage),
    After(SharedPage),
}

enum BookSlot {
    Loaded(Arc<Book>),
    Pending { id: u64, future: SharedBook },
}

/// Cache of catalogue results for one browsing session.
///
/// Cloning is cheap and every clone shares the same entries.
#[derive(Clone)]
pub struct RequestCache {
    service: Arc<dyn CatalogueService>,
    entries: Arc<DashMap<QueryKey, CacheEntry>>,
    books: Arc<DashMap<u64, BookSlot>>,
    next_request_id: Arc<AtomicU64>,
}

impl RequestCache {
    /// Creates an empty cache in front of `service`.
    #[must_use]
    pub fn new(service: Arc<dyn CatalogueService>) -> Self {
        debug!(service = service.name(), "creating request cache");
        Self {
            service,
            entries: Arc::new(DashMap::new()),
            books: Arc::new(DashMap::new()),
            next_request_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Fetches page `page` of the search `key`.
    ///
    /// Cached pages resolve without a network call. If a request for the
    /// same key and page is pending, the returned future joins it. If a
    /// request for another page of the key is pending, the returned future
    /// waits for it and then re-evaluates. Otherwise a new request is marked
    /// in flight before this method returns.
    ///
    /// On failure the entry's `last_error` is set and stored pages are left
    /// untouched; the page can be requested again.
    ///
    /// Must be called from within a Tokio runtime: new requests are spawned.
    pub fn fetch_page(&self, key: &QueryKey, page: u32) -> PageFetch {
        let future = match self.begin(key, page) {
            Begin::Hit(result) => future::ready(Ok(result)).boxed(),
            Begin::Join(shared) => shared.boxed(),
            Begin::After(shared) => {
                let cache = self.clone();
                let key = key.clone();
                async move {
                    // The other page's outcome belongs to its own caller.
                    let _ = shared.await;
                    cache.fetch_page(&key, page).await.result
                }
                .boxed()
            }
        };
        PageFetch {
            key: key.clone(),
            page,
            future,
        }
    }

    fn begin(&self, key: &QueryKey, page: u32) -> Begin {
        let mut entry = self
            .entries
            .entry(key.clone())
            .or_insert_with(|| CacheEntry::new(key.clone()));

        if let Some(hit) = entry.page(page) {
            debug!(key = %key, page, "page cache hit");
            return Begin::Hit(Arc::clone(hit));
        }

        if let Some(in_flight) = &entry.in_flight {
            if in_flight.page == page {
                debug!(key = %key, page, "joining in-flight request");
                return Begin::Join(in_flight.future.clone());
            }
            debug!(key = %key, page, busy_page = in_flight.page, "waiting for in-flight request");
            return Begin::After(in_flight.future.clone());
        }

        let id = self.next_request_id.fetch_add(1, Ordering::Relaxed);
        let future = self.request_page(id, key.clone(), page);
        entry.in_flight = Some(InFlight {
            id,
            page,
            future: future.clone(),
        });
        debug!(key = %key, page, request_id = id, "page request in flight");
        Begin::Join(future)
    }

    fn request_page(&self, id: u64, key: QueryKey, page: u32) -> SharedPage {
        let service = Arc::clone(&self.service);
        let entries = Arc::clone(&self.entries);
        let request = ListRequest::for_key(&key, page);
        let label = format!("{key} page {page}");

        let task = tokio::spawn(async move {
            let result = service.list_books(&request).await;

            let owned = entries.get_mut(&key).filter(|entry| {
                entry
                    .in_flight
                    .as_ref()
                    .is_some_and(|in_flight| in_flight.id == id)
            });
            let Some(mut entry) = owned else {
                debug!(key = %key, page, request_id = id, "entry replaced while request was in flight, result not stored");
                return result.map(|response| Arc::new(PageResult::from_response(page, &response)));
            };
            entry.in_flight = None;

            match result {
                Ok(response) => {
                    let page_result = Arc::new(PageResult::from_response(page, &response));
                    entry.insert_page(Arc::clone(&page_result));
                    debug!(
                        key = %key,
                        page,
                        items = page_result.items.len(),
                        has_next = page_result.has_next,
                        "page stored"
                    );
                    Ok(page_result)
                }
                Err(error) => {
                    warn!(key = %key, page, error = %error, "page request failed");
                    entry.record_error(error.clone());
                    Err(error)
                }
            }
        });
        joined(task, label)
    }

    /// Looks up a single book, caching the record for the session.
    ///
    /// Concurrent lookups of the same id share one request. Failures are not
    /// cached, so a later lookup retries.
    #[instrument(skip(self))]
    pub fn fetch_book(&self, id: u64) -> BoxFuture<'static, Result<Arc<Book>, FetchError>> {
        let shared = {
            let slot = self.books.entry(id).or_insert_with(|| {
                let request_id = self.next_request_id.fetch_add(1, Ordering::Relaxed);
                debug!(id, request_id, "book request in flight");
                BookSlot::Pending {
                    id: request_id,
                    future: self.request_book(request_id, id),
                }
            });
            match &*slot {
                BookSlot::Loaded(book) => {
                    debug!(id, "book cache hit");
                    return future::ready(Ok(Arc::clone(book))).boxed();
                }
                BookSlot::Pending { future: pending, .. } => pending.clone(),
            }
        };
        shared.boxed()
    }

    fn request_book(&self, request_id: u64, id: u64) -> SharedBook {
        let service = Arc::clone(&self.service);
        let books = Arc::clone(&self.books);
        let task = tokio::spawn(async move {
            let result = service.get_book(id).await.map(Arc::new);

            let owned = books.get_mut(&id).filter(|slot| {
                matches!(&**slot, BookSlot::Pending { id: pending, .. } if *pending == request_id)
            });
            let Some(mut slot) = owned else {
                debug!(id, request_id, "book slot replaced while request was in flight, result not stored");
                return result;
            };
            match &result {
                Ok(book) => *slot = BookSlot::Loaded(Arc::clone(book)),
                Err(error) => {
                    warn!(id, error = %error, "book lookup failed");
                    drop(slot);
                    books.remove(&id);
                }
            }
            result
        });
        joined(task, format!("book {id}"))
    }

    /// Returns whether the detail record of `id` has been loaded this session.
    #[must_use]
    pub fn is_visited(&self, id: u64) -> bool {
        self.books
            .get(&id)
            .is_some_and(|slot| matches!(*slot, BookSlot::Loaded(_)))
    }

    /// Returns a copy of the entry for `key`, if one exists.
    #[must_use]
    pub fn entry(&self, key: &QueryKey) -> Option<CacheEntry> {
        self.entries.get(key).map(|entry| entry.clone())
    }

    /// Whether a page request for `key` is outstanding.
    #[must_use]
    pub fn is_in_flight(&self, key: &QueryKey) -> bool {
        self.entries
            .get(key)
            .is_some_and(|entry| entry.is_in_flight())
    }

    /// Number of searches with an entry.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether no search has an entry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every cached page and book.
    ///
    /// Requests still in flight complete for their callers but are not stored.
    pub fn invalidate(&self) {
        debug!(entries = self.entries.len(), books = self.books.len(), "invalidating request cache");
        self.entries.clear();
        self.books.clear();
    }
}

/// Wraps a spawned request so every caller can await its result.
fn joined<T>(
    task: JoinHandle<Result<T, FetchError>>,
    label: String,
) -> Shared<BoxFuture<'static, Result<T, FetchError>>>
where
    T: Clone + Send + Sync + 'static,
{
    async move {
        task.await.unwrap_or_else(|join_error| {
            Err(FetchError::network(label, format!("request task failed: {join_error}")))
        })
    }
    .boxed()
    .shared()
}

impl std::fmt::Debug for RequestCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestCache")
            .field("service", &self.service.name())
            .field("entries", &self.entries.len())
            .field("books", &self.books.len())
            .finish_non_exhaustive()
    }
}
