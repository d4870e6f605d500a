//! Synchronization between [`FilterState`] and the address bar.
//!
//! The query string schema is `title`, `author`, `language` (comma-joined
//! codes) and `page`. Keys holding a default value are omitted, so the
//! canonical URL for a cleared filter has no query at all.
//!
//! Both directions are idempotent:
//!
//! - [`UrlSync::write`] replaces the location's query (never pushing a
//!   history entry) only when the canonical query differs from it.
//! - [`UrlSync::apply_external`] copies an observed URL into the state, but
//!   ignores our own writes echoing back and notifications the address bar
//!   has already moved past. A user edit therefore always beats a stale
//!   URL-derived update.

use tracing::debug;
use url::form_urlencoded;

use crate::filter::{FilterSnapshot, FilterState};

/// Query key for title terms.
pub const TITLE_PARAM: &str = "title";
/// Query key for author terms.
pub const AUTHOR_PARAM: &str = "author";
/// Query key for comma-joined language codes.
pub const LANGUAGE_PARAM: &str = "language";
/// Query key for the current page.
pub const PAGE_PARAM: &str = "page";

/// Serializes a snapshot into its canonical query string (no leading `?`).
#[must_use]
pub fn to_query(snapshot: &FilterSnapshot) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    if !snapshot.title.is_empty() {
        serializer.append_pair(TITLE_PARAM, &snapshot.title);
    }
    if !snapshot.author.is_empty() {
        serializer.append_pair(AUTHOR_PARAM, &snapshot.author);
    }
    if !snapshot.languages.is_empty() {
        serializer.append_pair(LANGUAGE_PARAM, &snapshot.languages.joined());
    }
    if snapshot.page > 1 {
        serializer.append_pair(PAGE_PARAM, &snapshot.page.to_string());
    }
    serializer.finish()
}

/// Parses a query string into a snapshot.
///
/// A leading `?` is accepted. Unknown keys are ignored, missing keys take
/// their defaults, and a missing, zero or unparsable `page` means page 1.
#[must_use]
pub fn parse_query(query: &str) -> FilterSnapshot {
    let mut snapshot = FilterSnapshot::default();
    for (key, value) in form_urlencoded::parse(strip_question_mark(query).as_bytes()) {
        match key.as_ref() {
            TITLE_PARAM => snapshot.title = value.into_owned(),
            AUTHOR_PARAM => snapshot.author = value.into_owned(),
            LANGUAGE_PARAM => snapshot.languages = value.split(',').collect(),
            PAGE_PARAM => {
                snapshot.page = value
                    .trim()
                    .parse::<u32>()
                    .ok()
                    .filter(|page| *page >= 1)
                    .unwrap_or(1);
            }
            _ => {}
        }
    }
    snapshot
}

/// Path of the book detail route, carrying the list's query along.
#[must_use]
pub fn detail_path(id: u64, query: &str) -> String {
    with_query(&format!("/{id}"), query)
}

/// Path of the list route for `query`.
#[must_use]
pub fn list_path(query: &str) -> String {
    with_query("/", query)
}

fn with_query(path: &str, query: &str) -> String {
    let query = strip_question_mark(query);
    if query.is_empty() {
        path.to_string()
    } else {
        format!("{path}?{query}")
    }
}

fn strip_question_mark(query: &str) -> &str {
    query.strip_prefix('?').unwrap_or(query)
}

/// The address bar, as seen by the engine.
pub trait Location {
    /// Current query string, without the leading `?`.
    fn query(&self) -> String;

    /// Replaces the current history entry's query.
    fn replace_query(&mut self, query: &str);

    /// Navigates to a new history entry with `query`.
    fn push_query(&mut self, query: &str);
}

/// In-memory address bar with a history stack.
#[derive(Debug, Clone)]
pub struct MemoryLocation {
    entries: Vec<String>,
    index: usize,
}

impl Default for MemoryLocation {
    fn default() -> Self {
        Self::new("")
    }
}

impl MemoryLocation {
    /// Creates a history holding a single entry.
    #[must_use]
    pub fn new(query: &str) -> Self {
        Self {
            entries: vec![strip_question_mark(query).to_string()],
            index: 0,
        }
    }

    /// Number of history entries.
    #[must_use]
    pub fn history_len(&self) -> usize {
        self.entries.len()
    }

    /// Moves one entry back. Returns the new query, or `None` at the start.
    pub fn back(&mut self) -> Option<&str> {
        self.index = self.index.checked_sub(1)?;
        Some(&self.entries[self.index])
    }

    /// Moves one entry forward. Returns the new query, or `None` at the end.
    pub fn forward(&mut self) -> Option<&str> {
        if self.index + 1 >= self.entries.len() {
            return None;
        }
        self.index += 1;
        Some(&self.entries[self.index])
    }
}

impl Location for MemoryLocation {
    fn query(&self) -> String {
        self.entries[self.index].clone()
    }

    fn replace_query(&mut self, query: &str) {
        self.entries[self.index] = strip_question_mark(query).to_string();
    }

    fn push_query(&mut self, query: &str) {
        self.entries.truncate(self.index + 1);
        self.entries.push(strip_question_mark(query).to_string());
        self.index = self.entries.len() - 1;
    }
}

/// Result of feeding an observed URL to [`UrlSync::apply_external`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlApply {
    /// The query is the one we last wrote; nothing to do.
    OwnEcho,
    /// The address bar no longer shows this query.
    Stale,
    /// The query was already applied.
    AlreadyApplied,
    /// The query was applied; `changed` tells whether any field differed.
    Applied {
        /// Whether the filter state was modified.
        changed: bool,
    },
}

/// Remembers what each direction last produced, which is how loops and
/// stale updates are recognized.
#[derive(Debug, Clone, Default)]
pub struct UrlSync {
    last_written: Option<String>,
    last_applied: Option<String>,
}

impl UrlSync {
    /// Creates an adapter that has not written or applied anything yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Query most recently produced by the state side.
    #[must_use]
    pub fn last_written(&self) -> Option<&str> {
        self.last_written.as_deref()
    }

    /// Query most recently consumed from the address bar.
    #[must_use]
    pub fn last_applied(&self) -> Option<&str> {
        self.last_applied.as_deref()
    }

    /// State → URL. Returns `true` when the location was modified.
    pub fn write(&mut self, snapshot: &FilterSnapshot, location: &mut dyn Location) -> bool {
        let target = to_query(snapshot);
        let current = location.query();
        // The state has moved past what the address bar last gave us, so
        // seeing that query again is a fresh navigation.
        if self.last_applied.as_deref() != Some(target.as_str()) {
            self.last_applied = None;
        }
        self.last_written = Some(target.clone());
        if strip_question_mark(&current) == target {
            return false;
        }
        debug!(from = %current, to = %target, "replacing location query");
        location.replace_query(&target);
        true
    }

    /// URL → State for an observed query.
    ///
    /// `observed` is the query carried by the change notification; `location`
    /// is consulted to detect notifications that arrive after the address bar
    /// has already changed again.
    pub fn apply_external(
        &mut self,
        observed: &str,
        location: &dyn Location,
        state: &mut FilterState,
    ) -> UrlApply {
        let observed = strip_question_mark(observed);
        if self.last_written.as_deref() == Some(observed) {
            return UrlApply::OwnEcho;
        }
        if strip_question_mark(&location.query()) != observed {
            debug!(observed, "ignoring stale location change");
            return UrlApply::Stale;
        }
        if self.last_applied.as_deref() == Some(observed) {
            return UrlApply::AlreadyApplied;
        }

        let parsed = parse_query(observed);
        let changed = state.apply(&parsed);
        self.last_applied = Some(observed.to_string());
        debug!(query = observed, changed, "applied location change");
        UrlApply::Applied { changed }
    }
}
