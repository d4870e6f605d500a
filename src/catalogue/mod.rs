//! The remote book catalogue.
//!
//! The engine only depends on the [`CatalogueService`] trait; the
//! [`GutendexClient`] implements it over HTTP for the public Gutendex API.
//! Tests substitute scripted in-memory services.
//!
//! # Example
//!
//! ```no_run
//! use gutenscroll_core::catalogue::{CatalogueService, GutendexClient, ListRequest};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = GutendexClient::new()?;
//! let request = ListRequest { page: 1, search: Some("dickens".into()), languages: None };
//! let page = client.list_books(&request).await?;
//! println!("{} matching books", page.count);
//! # Ok(())
//! # }
//! ```

mod error;
mod gutendex;
mod types;

pub use error::{FetchError, FetchErrorKind};
pub use gutendex::{
    CONNECT_TIMEOUT_SECS, DEFAULT_BASE_URL, GutendexClient, HttpTimeouts, READ_TIMEOUT_SECS,
};
pub use types::{
    Book, BookSummary, COVER_FORMAT, ListRequest, ListResponse, Person, page_from_continuation,
};

use async_trait::async_trait;

/// Read-only access to a paginated book catalogue.
#[async_trait]
pub trait CatalogueService: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Lists one page of books matching `request`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::NetworkFailure`] for transport errors and
    /// non-success statuses, [`FetchError::MalformedResponse`] when the body
    /// cannot be decoded.
    async fn list_books(&self, request: &ListRequest) -> Result<ListResponse, FetchError>;

    /// Fetches the full record of one book.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::NotFound`] for unknown ids, otherwise as
    /// [`CatalogueService::list_books`].
    async fn get_book(&self, id: u64) -> Result<Book, FetchError>;
}
