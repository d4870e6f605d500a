//! Browsing session: one list view's filter, address bar, cache and cursor.
//!
//! [`BrowseSession`] owns one of each engine component and routes events
//! between them. Handlers take `&mut self` and never await. Network work is
//! handed back to the caller as a [`PageFetch`]; when it resolves, the
//! caller feeds the [`PageOutcome`] to [`BrowseSession::on_page_loaded`].
//! Outcomes for a search that is no longer current, or from a request that
//! a refresh superseded, are reported as [`PageDisposition::Stale`] and leave
//! the view untouched.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use gutenscroll_core::catalogue::GutendexClient;
//! use gutenscroll_core::session::{BrowseSession, SessionOptions};
//! use gutenscroll_core::url_sync::MemoryLocation;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let service = Arc::new(GutendexClient::new()?);
//! let location = MemoryLocation::new("title=dickens");
//! let mut session = BrowseSession::new(service, location, SessionOptions::default());
//!
//! if let Some(fetch) = session.load_initial() {
//!     let outcome = fetch.await;
//!     session.on_page_loaded(outcome);
//! }
//! for book in session.view().items {
//!     println!("{}", book.title);
//! }
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use tracing::{debug, info, warn};

use crate::cache::{PageFetch, PageOutcome, RequestCache};
use crate::catalogue::{Book, BookSummary, CatalogueService, FetchError};
use crate::cursor::PaginationCursor;
use crate::debounce::{DEFAULT_DEBOUNCE, Debouncer};
use crate::filter::{FilterSnapshot, FilterState, QueryKey};
use crate::scroll::{DEFAULT_SCROLL_THRESHOLD, ScrollMetrics, ScrollTrigger};
use crate::url_sync::{self, Location, UrlApply, UrlSync};

/// Tunables for a [`BrowseSession`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionOptions {
    /// Quiet period before typed title/author text is applied.
    pub debounce: Duration,
    /// Near-bottom distance that triggers the next page.
    pub scroll_threshold: f64,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            scroll_threshold: DEFAULT_SCROLL_THRESHOLD,
        }
    }
}

/// What [`BrowseSession::on_page_loaded`] did with an outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageDisposition {
    /// The page belongs to the current search and is now visible.
    Applied,
    /// The outcome belongs to a search the user has since left, or to a
    /// request whose result was not stored.
    Stale,
    /// The request failed; earlier pages stay visible.
    Failed(FetchError),
}

/// Everything a renderer needs to draw the list view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewSnapshot {
    /// Applied filter values.
    pub filter: FilterSnapshot,
    /// Raw title text, including input still being debounced.
    pub title_input: String,
    /// Raw author text, including input still being debounced.
    pub author_input: String,
    /// Loaded books of the current search, in page order.
    pub items: Vec<BookSummary>,
    /// Total matches, once a page has loaded.
    pub total_count: Option<u64>,
    /// Whether scrolling further can load more.
    pub has_next: bool,
    /// Whether a request for the current search is outstanding.
    pub loading: bool,
    /// Most recent failure for the current search.
    pub last_error: Option<FetchError>,
    /// Increases on every change a renderer could observe.
    pub revision: u64,
    /// Current address-bar query.
    pub query: String,
}

/// Engine state for one list view.
pub struct BrowseSession<L> {
    filter: FilterState,
    title: Debouncer<String>,
    author: Debouncer<String>,
    url: UrlSync,
    location: L,
    cache: RequestCache,
    cursor: PaginationCursor,
    scroll: ScrollTrigger,
    revision: u64,
}

impl<L: Location> BrowseSession<L> {
    /// Creates a session whose initial filter comes from `location`.
    ///
    /// A `page` in the query is where loading resumes. The address bar is
    /// rewritten to its canonical form.
    pub fn new(service: Arc<dyn CatalogueService>, location: L, options: SessionOptions) -> Self {
        Self::with_cache(RequestCache::new(service), location, options)
    }

    /// Like [`BrowseSession::new`] but reusing an existing cache.
    pub fn with_cache(cache: RequestCache, mut location: L, options: SessionOptions) -> Self {
        let snapshot = url_sync::parse_query(&location.query());
        let mut cursor = PaginationCursor::new();
        cursor.restore(snapshot.page);

        let title = Debouncer::new(snapshot.title.clone(), options.debounce);
        let author = Debouncer::new(snapshot.author.clone(), options.debounce);
        let filter = FilterState::from_snapshot(snapshot);

        let mut url = UrlSync::new();
        url.write(&filter.snapshot(), &mut location);
        info!(key = %filter.query_key(), page = filter.current().page, "browse session started");

        Self {
            filter,
            title,
            author,
            url,
            location,
            cache,
            cursor,
            scroll: ScrollTrigger::new(options.scroll_threshold),
            revision: 0,
        }
    }

    /// Applied filter state.
    #[must_use]
    pub fn filter(&self) -> &FilterState {
        &self.filter
    }

    /// Key of the current search.
    #[must_use]
    pub fn query_key(&self) -> QueryKey {
        self.filter.query_key()
    }

    /// Pagination position of the current search.
    #[must_use]
    pub fn cursor(&self) -> &PaginationCursor {
        &self.cursor
    }

    /// The session's request cache.
    #[must_use]
    pub fn cache(&self) -> &RequestCache {
        &self.cache
    }

    /// The address bar.
    #[must_use]
    pub fn location(&self) -> &L {
        &self.location
    }

    /// Mutable access to the address bar, for simulating navigation.
    pub fn location_mut(&mut self) -> &mut L {
        &mut self.location
    }

    /// Session revision, see [`ViewSnapshot::revision`].
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Fetches the first page to show for the current search.
    ///
    /// Joins the request when one is already outstanding.
    pub fn load_initial(&mut self) -> Option<PageFetch> {
        let page = self.cursor.next()?;
        Some(self.cache.fetch_page(&self.filter.query_key(), page))
    }

    /// Title input changed. Takes effect after the debounce interval.
    pub fn set_title(&mut self, raw: impl Into<String>) {
        self.title.observe(raw.into());
        self.bump();
    }

    /// Author input changed. Takes effect after the debounce interval.
    pub fn set_author(&mut self, raw: impl Into<String>) {
        self.author.observe(raw.into());
        self.bump();
    }

    /// Applies title/author input whose debounce interval has elapsed.
    ///
    /// Returns the fetch for the new search when the filter changed.
    pub fn poll_debounced(&mut self) -> Option<PageFetch> {
        let mut changed = false;
        if let Some(title) = self.title.poll() {
            changed |= self.filter.set_title(title);
        }
        if let Some(author) = self.author.poll() {
            changed |= self.filter.set_author(author);
        }
        if changed {
            self.filter_changed()
        } else {
            None
        }
    }

    /// Waits until all pending input is due, then applies it.
    ///
    /// Returns `None` at once when nothing is pending.
    pub async fn settle(&mut self) -> Option<PageFetch> {
        let deadline = self
            .title
            .deadline()
            .into_iter()
            .chain(self.author.deadline())
            .max()?;
        tokio::time::sleep_until(deadline).await;
        self.poll_debounced()
    }

    /// Adds or removes a language code. Applies immediately.
    pub fn toggle_language(&mut self, code: &str) -> Option<PageFetch> {
        if self.filter.toggle_language(code) {
            self.filter_changed()
        } else {
            None
        }
    }

    /// Resets every filter, including input still being debounced.
    pub fn clear(&mut self) -> Option<PageFetch> {
        self.title.reset(String::new());
        self.author.reset(String::new());
        if self.filter.clear() {
            self.filter_changed()
        } else {
            self.bump();
            None
        }
    }

    /// The address bar reported a new query (reload, back/forward, edit).
    ///
    /// Our own writes echoing back and notifications the address bar has
    /// already moved past are ignored.
    pub fn apply_url_change(&mut self, observed: &str) -> Option<PageFetch> {
        let before = self.filter.query_key();
        let applied = self
            .url
            .apply_external(observed, &self.location, &mut self.filter);
        match applied {
            UrlApply::Applied { changed: true } => {}
            other => {
                debug!(observed, outcome = ?other, "location change not applied");
                return None;
            }
        }

        let snapshot = self.filter.snapshot();
        self.title.reset(snapshot.title.clone());
        self.author.reset(snapshot.author.clone());
        self.url.write(&snapshot, &mut self.location);
        self.bump();

        let key = self.filter.query_key();
        if key == before {
            // Same search; only a page beyond what is loaded needs a fetch.
            if snapshot.page <= self.cursor.current() {
                return None;
            }
            debug!(key = %key, page = snapshot.page, "jumping to page from location");
            self.cursor.restore(snapshot.page);
            return self.load_initial();
        }
        info!(key = %key, page = snapshot.page, "search restored from location");
        self.cursor.restore(snapshot.page);
        self.scroll.reset();
        self.load_initial()
    }

    /// Fetches the next page of the current search.
    ///
    /// No-op when the catalogue reported no further page or a request for
    /// the current search is already outstanding. After a failure this
    /// retries the failed page.
    pub fn request_more(&mut self) -> Option<PageFetch> {
        let key = self.filter.query_key();
        if self.cache.is_in_flight(&key) {
            debug!(key = %key, "request_more ignored, request in flight");
            return None;
        }
        let page = self.cursor.next()?;
        debug!(key = %key, page, "requesting next page");
        Some(self.cache.fetch_page(&key, page))
    }

    /// A scroll event; loads more when the list nears its end.
    pub fn on_scroll(&mut self, metrics: ScrollMetrics) -> Option<PageFetch> {
        if self.scroll.observe(metrics) {
            self.request_more()
        } else {
            None
        }
    }

    /// Feeds a completed fetch back into the session.
    pub fn on_page_loaded(&mut self, outcome: PageOutcome) -> PageDisposition {
        let key = self.filter.query_key();
        if outcome.key != key {
            debug!(stale = %outcome.key, current = %key, page = outcome.page, "discarding stale page");
            return PageDisposition::Stale;
        }

        match outcome.result {
            Ok(page) => {
                let Some(latest) = self.cache.entry(&key).and_then(|entry| {
                    entry.page(page.page_number)?;
                    entry.pages().last().cloned()
                }) else {
                    debug!(key = %key, page = outcome.page, "page was not stored, discarding");
                    return PageDisposition::Stale;
                };
                self.cursor.advance(&latest);

                let shown = self.cursor.current();
                if shown > self.filter.current().page && self.filter.set_page(shown) {
                    self.url.write(&self.filter.snapshot(), &mut self.location);
                }
                self.bump();
                debug!(key = %key, page = outcome.page, has_next = self.cursor.has_next(), "page applied");
                PageDisposition::Applied
            }
            Err(error) => {
                warn!(key = %key, page = outcome.page, error = %error, "page failed to load");
                // Nothing was appended, so scrolling back down is the retry.
                self.scroll.rearm();
                self.bump();
                PageDisposition::Failed(error)
            }
        }
    }

    /// Drops every cached result and reloads the current search.
    pub fn refresh(&mut self) -> Option<PageFetch> {
        self.cache.invalidate();
        self.cursor.reset();
        self.scroll.reset();
        self.bump();
        self.load_initial()
    }

    /// Looks up a book's full record; cached for the session.
    pub fn book(&self, id: u64) -> BoxFuture<'static, Result<Arc<Book>, FetchError>> {
        self.cache.fetch_book(id)
    }

    /// Whether a book's detail has been opened in this session.
    #[must_use]
    pub fn is_visited(&self, id: u64) -> bool {
        self.cache.is_visited(id)
    }

    /// Route of a book's detail view, carrying the current search.
    #[must_use]
    pub fn detail_path(&self, id: u64) -> String {
        url_sync::detail_path(id, &self.location.query())
    }

    /// Route back to the list with the current search.
    #[must_use]
    pub fn list_path(&self) -> String {
        url_sync::list_path(&self.location.query())
    }

    /// Snapshot of everything the list view shows.
    #[must_use]
    pub fn view(&self) -> ViewSnapshot {
        let entry = self.cache.entry(&self.filter.query_key());
        ViewSnapshot {
            filter: self.filter.snapshot(),
            title_input: self.title.latest().clone(),
            author_input: self.author.latest().clone(),
            items: entry
                .as_ref()
                .map(|entry| entry.items().cloned().collect())
                .unwrap_or_default(),
            total_count: entry.as_ref().and_then(|entry| entry.total_count()),
            has_next: self.cursor.has_next(),
            loading: entry.as_ref().is_some_and(|entry| entry.is_in_flight()),
            last_error: entry.as_ref().and_then(|entry| entry.last_error().cloned()),
            revision: self.revision,
            query: self.location.query(),
        }
    }

    fn filter_changed(&mut self) -> Option<PageFetch> {
        self.url.write(&self.filter.snapshot(), &mut self.location);
        self.cursor.reset();
        self.scroll.reset();
        self.bump();
        info!(key = %self.filter.query_key(), "filter changed");
        self.load_initial()
    }

    fn bump(&mut self) {
        self.revision += 1;
    }
}

impl<L> std::fmt::Debug for BrowseSession<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrowseSession")
            .field("filter", self.filter.current())
            .field("cursor", &self.cursor)
            .field("cache", &self.cache)
            .field("revision", &self.revision)
            .finish_non_exhaustive()
    }
}
