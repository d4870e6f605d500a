//! In-memory filter state for a browsing session.
//!
//! [`FilterState`] is the canonical representation of what the user is
//! searching for. All mutations go through its methods so the page-reset
//! rule holds everywhere: changing `title`, `author` or `languages` always
//! sends the cursor back to page 1.
//!
//! [`QueryKey`] identifies a logical search (everything but the page) and is
//! what the request cache groups pages under.

use std::fmt;
use std::hash::{Hash, Hasher};

use tracing::trace;

/// Insertion-ordered set of language codes.
///
/// Order matches the order in which the user toggled the codes on. Each code
/// appears at most once. Toggling the same code twice in a row is a no-op:
/// a code switched back on right after being switched off returns to its
/// previous position.
#[derive(Debug, Clone, Default)]
pub struct LanguageSet {
    codes: Vec<String>,
    last_removed: Option<(String, usize)>,
}

impl PartialEq for LanguageSet {
    fn eq(&self, other: &Self) -> bool {
        self.codes == other.codes
    }
}

impl Eq for LanguageSet {}

impl Hash for LanguageSet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.codes.hash(state);
    }
}

impl LanguageSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether `code` is in the set.
    #[must_use]
    pub fn contains(&self, code: &str) -> bool {
        self.codes.iter().any(|c| c == code)
    }

    /// Adds `code` if absent, removes it if present.
    ///
    /// Returns `true` when the code is in the set afterwards.
    pub fn toggle(&mut self, code: &str) -> bool {
        if let Some(index) = self.codes.iter().position(|c| c == code) {
            let removed = self.codes.remove(index);
            self.last_removed = Some((removed, index));
            false
        } else {
            match self.last_removed.take() {
                Some((removed, index)) if removed == code => {
                    self.codes.insert(index.min(self.codes.len()), removed);
                }
                _ => self.codes.push(code.to_string()),
            }
            true
        }
    }

    /// Returns the number of codes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    /// Returns whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Iterates codes in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.codes.iter().map(String::as_str)
    }

    /// Joins the codes with commas, the form used by the URL and the catalogue.
    #[must_use]
    pub fn joined(&self) -> String {
        self.codes.join(",")
    }
}

impl<S: AsRef<str>> FromIterator<S> for LanguageSet {
    /// Builds a set keeping the first occurrence of each non-empty code.
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = Self::new();
        for code in iter {
            let code = code.as_ref().trim();
            if !code.is_empty() && !set.contains(code) {
                set.codes.push(code.to_string());
            }
        }
        set
    }
}

/// Immutable copy of the filter fields handed to renderers and the URL adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterSnapshot {
    /// Title search terms.
    pub title: String,
    /// Author search terms.
    pub author: String,
    /// Selected language codes.
    pub languages: LanguageSet,
    /// Current page, always >= 1.
    pub page: u32,
}

impl Default for FilterSnapshot {
    fn default() -> Self {
        Self {
            title: String::new(),
            author: String::new(),
            languages: LanguageSet::new(),
            page: 1,
        }
    }
}

impl FilterSnapshot {
    /// Returns the cache key for this snapshot (page excluded).
    #[must_use]
    pub fn query_key(&self) -> QueryKey {
        QueryKey {
            title: self.title.clone(),
            author: self.author.clone(),
            languages: self.languages.clone(),
        }
    }

    /// Returns whether every field holds its default value.
    #[must_use]
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

/// Identity of a logical search: `(title, author, languages)` without the page.
///
/// Two snapshots that differ only in `page` share a key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct QueryKey {
    title: String,
    author: String,
    languages: LanguageSet,
}

impl QueryKey {
    /// Builds a key from its parts.
    #[must_use]
    pub fn new(title: impl Into<String>, author: impl Into<String>, languages: LanguageSet) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            languages,
        }
    }

    /// Title terms.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Author terms.
    #[must_use]
    pub fn author(&self) -> &str {
        &self.author
    }

    /// Language codes.
    #[must_use]
    pub fn languages(&self) -> &LanguageSet {
        &self.languages
    }

    /// Space-joined title and author terms, `None` when both are empty.
    #[must_use]
    pub fn search_terms(&self) -> Option<String> {
        let terms: Vec<&str> = [self.title.as_str(), self.author.as_str()]
            .into_iter()
            .filter(|term| !term.is_empty())
            .collect();
        if terms.is_empty() {
            None
        } else {
            Some(terms.join(" "))
        }
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let snapshot = FilterSnapshot {
            title: self.title.clone(),
            author: self.author.clone(),
            languages: self.languages.clone(),
            page: 1,
        };
        f.write_str(&crate::url_sync::to_query(&snapshot))
    }
}

/// The canonical, mutable filter state of one browsing session.
#[derive(Debug, Clone, Default)]
pub struct FilterState {
    current: FilterSnapshot,
    revision: u64,
}

impl FilterState {
    /// Creates a state holding defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a state from an existing snapshot (e.g. one parsed from the URL).
    #[must_use]
    pub fn from_snapshot(mut snapshot: FilterSnapshot) -> Self {
        snapshot.page = snapshot.page.max(1);
        Self {
            current: snapshot,
            revision: 0,
        }
    }

    /// Returns a copy of the current fields.
    #[must_use]
    pub fn snapshot(&self) -> FilterSnapshot {
        self.current.clone()
    }

    /// Borrowing accessor for the current fields.
    #[must_use]
    pub fn current(&self) -> &FilterSnapshot {
        &self.current
    }

    /// Cache key of the current search.
    #[must_use]
    pub fn query_key(&self) -> QueryKey {
        self.current.query_key()
    }

    /// Monotonic counter bumped once per observable mutation.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Sets the title terms and resets the page.
    pub fn set_title(&mut self, title: impl Into<String>) -> bool {
        let title = title.into();
        let changed = self.current.title != title || self.current.page != 1;
        self.current.title = title;
        self.current.page = 1;
        self.touch(changed, "set_title")
    }

    /// Sets the author terms and resets the page.
    pub fn set_author(&mut self, author: impl Into<String>) -> bool {
        let author = author.into();
        let changed = self.current.author != author || self.current.page != 1;
        self.current.author = author;
        self.current.page = 1;
        self.touch(changed, "set_author")
    }

    /// Toggles a language code and resets the page.
    pub fn toggle_language(&mut self, code: &str) -> bool {
        let code = code.trim();
        if code.is_empty() {
            return false;
        }
        self.current.languages.toggle(code);
        self.current.page = 1;
        self.touch(true, "toggle_language")
    }

    /// Resets every field to its default in one update.
    pub fn clear(&mut self) -> bool {
        let changed = !self.current.is_default();
        self.current = FilterSnapshot::default();
        self.touch(changed, "clear")
    }

    /// Moves to page `page`. Zero is rejected.
    pub fn set_page(&mut self, page: u32) -> bool {
        if page == 0 || page == self.current.page {
            return false;
        }
        self.current.page = page;
        self.touch(true, "set_page")
    }

    /// Replaces the fields that differ from `snapshot` in one update.
    ///
    /// Unlike the individual setters this keeps `snapshot.page`; it is the
    /// entry point for state that arrives from the address bar.
    pub fn apply(&mut self, snapshot: &FilterSnapshot) -> bool {
        let mut changed = false;
        if self.current.title != snapshot.title {
            self.current.title.clone_from(&snapshot.title);
            changed = true;
        }
        if self.current.author != snapshot.author {
            self.current.author.clone_from(&snapshot.author);
            changed = true;
        }
        if self.current.languages != snapshot.languages {
            self.current.languages = snapshot.languages.clone();
            changed = true;
        }
        let page = snapshot.page.max(1);
        if self.current.page != page {
            self.current.page = page;
            changed = true;
        }
        self.touch(changed, "apply")
    }

    fn touch(&mut self, changed: bool, op: &'static str) -> bool {
        if changed {
            self.revision += 1;
            trace!(op, revision = self.revision, "filter state changed");
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn langs(codes: &[&str]) -> LanguageSet {
        codes.iter().collect()
    }

    #[test]
    fn test_every_filter_mutation_resets_page() {
        let mut state = FilterState::new();
        state.set_page(4);
        state.set_title("Dickens");
        assert_eq!(state.current().page, 1);

        state.set_page(3);
        state.set_author("Charles");
        assert_eq!(state.current().page, 1);

        state.set_page(7);
        state.toggle_language("en");
        assert_eq!(state.current().page, 1);

        state.set_page(2);
        state.toggle_language("en");
        assert_eq!(state.current().page, 1);
    }

    #[test]
    fn test_set_title_same_value_on_later_page_still_resets() {
        let mut state = FilterState::new();
        state.set_title("Twain");
        state.set_page(3);
        assert!(state.set_title("Twain"));
        assert_eq!(state.current().page, 1);
        assert!(!state.set_title("Twain"));
    }

    #[test]
    fn test_double_toggle_restores_ordered_set() {
        let mut state = FilterState::new();
        state.toggle_language("fr");
        state.toggle_language("en");
        state.toggle_language("de");
        let before = state.current().languages.clone();

        state.toggle_language("en");
        assert_eq!(state.current().languages, langs(&["fr", "de"]));
        state.toggle_language("en");
        assert_eq!(state.current().languages, before);
        assert_eq!(state.current().languages.joined(), "fr,en,de");

        state.toggle_language("es");
        state.toggle_language("es");
        assert_eq!(state.current().languages, before);
    }

    #[test]
    fn test_re_adding_after_other_toggle_appends() {
        let mut set = langs(&["en", "fr", "de"]);
        set.toggle("en");
        set.toggle("es");
        set.toggle("en");
        assert_eq!(set.joined(), "fr,de,es,en");
    }

    #[test]
    fn test_toggle_removal_preserves_remaining_order() {
        let mut set = langs(&["en", "fr", "de"]);
        assert!(!set.toggle("fr"));
        assert_eq!(set.iter().collect::<Vec<_>>(), vec!["en", "de"]);
    }

    #[test]
    fn test_language_set_from_iter_deduplicates() {
        let set = langs(&["en", "", "fr", "en", " de "]);
        assert_eq!(set.joined(), "en,fr,de");
    }

    #[test]
    fn test_clear_is_a_single_revision() {
        let mut state = FilterState::new();
        state.set_title("Twain");
        state.set_author("Mark");
        state.toggle_language("en");
        state.toggle_language("fr");
        let before = state.revision();

        assert!(state.clear());
        assert_eq!(state.revision(), before + 1);
        assert_eq!(state.snapshot(), FilterSnapshot::default());

        assert!(!state.clear(), "clearing defaults is not a change");
        assert_eq!(state.revision(), before + 1);
    }

    #[test]
    fn test_set_page_rejects_zero() {
        let mut state = FilterState::new();
        assert!(!state.set_page(0));
        assert_eq!(state.current().page, 1);
    }

    #[test]
    fn test_apply_keeps_page_and_reports_no_change_when_equal() {
        let mut state = FilterState::new();
        let incoming = FilterSnapshot {
            title: "Emma".to_string(),
            author: String::new(),
            languages: langs(&["en"]),
            page: 3,
        };
        assert!(state.apply(&incoming));
        assert_eq!(state.snapshot(), incoming);

        let revision = state.revision();
        assert!(!state.apply(&incoming));
        assert_eq!(state.revision(), revision);
    }

    #[test]
    fn test_query_key_ignores_page() {
        let a = FilterSnapshot {
            title: "dickens".to_string(),
            page: 1,
            ..FilterSnapshot::default()
        };
        let b = FilterSnapshot { page: 5, ..a.clone() };
        assert_eq!(a.query_key(), b.query_key());
        assert_eq!(a.query_key().to_string(), "title=dickens");
    }

    #[test]
    fn test_search_terms_join_title_and_author() {
        let key = QueryKey::new("Tom Sawyer", "Twain", LanguageSet::new());
        assert_eq!(key.search_terms().as_deref(), Some("Tom Sawyer Twain"));

        let key = QueryKey::new("", "Twain", LanguageSet::new());
        assert_eq!(key.search_terms().as_deref(), Some("Twain"));

        assert_eq!(QueryKey::default().search_terms(), None);
    }
}
