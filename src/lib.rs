//! Gutenscroll Core Library
//!
//! Query-state synchronization and pagination engine for browsing a remote
//! book catalogue with free-text and language filters, infinite scrolling,
//! and search state kept in the address bar.
//!
//! # Architecture
//!
//! The library is organized into the following modules, leaves first:
//! - [`debounce`] - Delays typed input until it stops changing
//! - [`filter`] - Canonical filter state and the per-search [`QueryKey`]
//! - [`url_sync`] - Two-way mapping between filter state and the URL query
//! - [`cursor`] - Current page and continuation for the active search
//! - [`cache`] - Session request cache with de-duplicated in-flight fetches
//! - [`scroll`] - Near-bottom detection for loading more pages
//! - [`catalogue`] - Catalogue service trait and the Gutendex HTTP client
//! - [`session`] - Owns one of each component and routes events between them

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cache;
pub mod catalogue;
pub mod cursor;
pub mod debounce;
pub mod filter;
pub mod scroll;
pub mod session;
pub mod url_sync;

mod user_agent;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use cache::{CacheEntry, PageFetch, PageOutcome, PageResult, RequestCache};
pub use catalogue::{
    Book, BookSummary, CatalogueService, FetchError, FetchErrorKind, GutendexClient, ListRequest,
    ListResponse, Person,
};
pub use cursor::PaginationCursor;
pub use debounce::{DEFAULT_DEBOUNCE, Debouncer};
pub use filter::{FilterSnapshot, FilterState, LanguageSet, QueryKey};
pub use scroll::{DEFAULT_SCROLL_THRESHOLD, ScrollMetrics, ScrollTrigger};
pub use session::{BrowseSession, PageDisposition, SessionOptions, ViewSnapshot};
pub use url_sync::{Location, MemoryLocation, UrlApply, UrlSync};
