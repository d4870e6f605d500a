//! Wire and domain types for the book catalogue.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::filter::QueryKey;

/// MIME type under which the catalogue lists cover images.
pub const COVER_FORMAT: &str = "image/jpeg";

/// An author or translator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    /// Display name, usually "Last, First".
    pub name: String,
    /// Year of birth, when known.
    #[serde(default)]
    pub birth_year: Option<i32>,
    /// Year of death, `None` for living or unknown.
    #[serde(default)]
    pub death_year: Option<i32>,
}

impl Person {
    /// Formats the life span as `1812-1870`, `1812-` or an empty string.
    #[must_use]
    pub fn life_span(&self) -> String {
        match (self.birth_year, self.death_year) {
            (Some(birth), Some(death)) => format!("{birth}-{death}"),
            (Some(birth), None) => format!("{birth}-"),
            (None, Some(death)) => format!("-{death}"),
            (None, None) => String::new(),
        }
    }
}

/// Full book record as returned by the catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    /// Project Gutenberg id.
    pub id: u64,
    /// Title as catalogued.
    pub title: String,
    /// Authors in catalogue order.
    #[serde(default)]
    pub authors: Vec<Person>,
    /// Translators, empty for original-language works.
    #[serde(default)]
    pub translators: Vec<Person>,
    /// Library of Congress subject headings.
    #[serde(default)]
    pub subjects: Vec<String>,
    /// Gutenberg bookshelves the book is filed under.
    #[serde(default)]
    pub bookshelves: Vec<String>,
    /// Two-letter language codes.
    #[serde(default)]
    pub languages: Vec<String>,
    /// `None` when the catalogue does not know the copyright status.
    #[serde(default)]
    pub copyright: Option<bool>,
    /// Usually `Text`; also `Sound`, `Image` and others.
    #[serde(default)]
    pub media_type: String,
    /// Download links keyed by MIME type.
    #[serde(default)]
    pub formats: BTreeMap<String, String>,
    /// Downloads in the last 30 days.
    #[serde(default)]
    pub download_count: u64,
}

impl Book {
    /// Cover image URL, if the record lists one.
    #[must_use]
    pub fn cover_url(&self) -> Option<&str> {
        self.formats.get(COVER_FORMAT).map(String::as_str)
    }
}

/// The subset of a book shown in the result list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookSummary {
    /// Project Gutenberg id.
    pub id: u64,
    /// Title as catalogued.
    pub title: String,
    /// Authors in catalogue order.
    pub authors: Vec<Person>,
    /// Cover image, when the record lists one.
    pub cover_url: Option<String>,
    /// Downloads in the last 30 days.
    pub download_count: u64,
}

impl From<&Book> for BookSummary {
    fn from(book: &Book) -> Self {
        Self {
            id: book.id,
            title: book.title.clone(),
            authors: book.authors.clone(),
            cover_url: book.cover_url().map(str::to_string),
            download_count: book.download_count,
        }
    }
}

/// One page of the catalogue listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListResponse {
    /// Total number of matching books.
    pub count: u64,
    /// Opaque continuation URL; `None` on the last page.
    pub next: Option<String>,
    /// Opaque URL of the previous page.
    pub previous: Option<String>,
    /// Books on this page.
    pub results: Vec<Book>,
}

impl ListResponse {
    /// Page number named by the continuation URL, if it carries one.
    #[must_use]
    pub fn next_page(&self) -> Option<u32> {
        self.next.as_deref().and_then(page_from_continuation)
    }
}

/// Extracts the `page` parameter from a continuation URL.
///
/// Returns `None` for unparsable URLs or when no valid page is present.
#[must_use]
pub fn page_from_continuation(continuation: &str) -> Option<u32> {
    let url = Url::parse(continuation).ok()?;
    url.query_pairs()
        .find(|(key, _)| key == "page")
        .and_then(|(_, value)| value.parse::<u32>().ok())
        .filter(|page| *page >= 1)
}

/// Parameters of a catalogue listing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRequest {
    /// Requested page, starting at 1.
    pub page: u32,
    /// Title and author terms, space-joined.
    pub search: Option<String>,
    /// Comma-joined language codes.
    pub languages: Option<String>,
}

impl ListRequest {
    /// Translates a query key and page into service parameters.
    #[must_use]
    pub fn for_key(key: &QueryKey, page: u32) -> Self {
        let languages = key.languages();
        Self {
            page,
            search: key.search_terms(),
            languages: (!languages.is_empty()).then(|| languages.joined()),
        }
    }

    /// Query pairs in the order the service documents them.
    #[must_use]
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("page", self.page.to_string())];
        if let Some(search) = &self.search {
            pairs.push(("search", search.clone()));
        }
        if let Some(languages) = &self.languages {
            pairs.push(("languages", languages.clone()));
        }
        pairs
    }
}
