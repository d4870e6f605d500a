//! HTTP client for the Gutendex catalogue API.
//!
//! Listing: `GET {base}/books/?page=N&search=..&languages=..`.
//! Lookup: `GET {base}/books/{id}`.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};
use url::Url;

use super::CatalogueService;
use super::error::FetchError;
use super::types::{Book, ListRequest, ListResponse};
use crate::user_agent;

/// Public Gutendex endpoint.
pub const DEFAULT_BASE_URL: &str = "https://gutendex.com";

/// Default connect timeout in seconds.
pub const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default whole-request timeout in seconds.
pub const READ_TIMEOUT_SECS: u64 = 30;

/// Timeouts applied to every catalogue request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    /// Time allowed to establish the connection.
    pub connect_timeout_secs: u64,
    /// Time allowed for the whole request, body included.
    pub read_timeout_secs: u64,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self {
            connect_timeout_secs: CONNECT_TIMEOUT_SECS,
            read_timeout_secs: READ_TIMEOUT_SECS,
        }
    }
}

/// [`CatalogueService`] backed by the Gutendex REST API.
#[derive(Clone)]
pub struct GutendexClient {
    client: Client,
    base_url: Url,
}

impl GutendexClient {
    /// Creates a client for the public Gutendex endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] if HTTP client construction fails.
    pub fn new() -> Result<Self, FetchError> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Creates a client for a custom base URL (mirrors, wiremock in tests).
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] if the URL is invalid or client construction fails.
    pub fn with_base_url(base_url: &str) -> Result<Self, FetchError> {
        Self::with_options(base_url, HttpTimeouts::default())
    }

    /// Creates a client with explicit timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] if the URL is invalid or client construction fails.
    #[instrument(skip(timeouts), fields(connect = timeouts.connect_timeout_secs, read = timeouts.read_timeout_secs))]
    pub fn with_options(base_url: &str, timeouts: HttpTimeouts) -> Result<Self, FetchError> {
        let base_url = parse_base_url(base_url)?;
        let client = build_client(timeouts).map_err(|message| {
            FetchError::network(base_url.as_str(), format!("HTTP client construction failed: {message}"))
        })?;
        debug!(base_url = %base_url, "catalogue client ready");
        Ok(Self { client, base_url })
    }

    /// Base URL requests are resolved against.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// URL of the listing endpoint for `request`.
    #[must_use]
    pub fn list_url(&self, request: &ListRequest) -> Url {
        let mut url = self.endpoint("books/");
        url.query_pairs_mut()
            .extend_pairs(request.query_pairs().iter().map(|(k, v)| (*k, v.as_str())));
        url
    }

    /// URL of the single-item endpoint for `id`.
    #[must_use]
    pub fn book_url(&self, id: u64) -> Url {
        self.endpoint(&format!("books/{id}"))
    }

    fn endpoint(&self, path: &str) -> Url {
        // `base_url` always ends with '/', so joining a relative path cannot fail.
        self.base_url
            .join(path)
            .unwrap_or_else(|_| self.base_url.clone())
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &Url) -> Result<T, GetFailure> {
        let response = match self.client.get(url.clone()).send().await {
            Ok(response) => response,
            Err(error) => {
                warn!(url = %url, error = %error, "catalogue request failed");
                let message = if error.is_timeout() {
                    "request timed out".to_string()
                } else {
                    error.to_string()
                };
                return Err(GetFailure::Fetch(FetchError::network(url.as_str(), message)));
            }
        };

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(GetFailure::NotFound);
        }
        if !status.is_success() {
            debug!(url = %url, status = status.as_u16(), "catalogue returned error status");
            return Err(GetFailure::Fetch(FetchError::http_status(
                url.as_str(),
                status.as_u16(),
            )));
        }

        let body = response.bytes().await.map_err(|error| {
            GetFailure::Fetch(FetchError::network(url.as_str(), error.to_string()))
        })?;
        serde_json::from_slice(&body).map_err(|error| {
            warn!(url = %url, error = %error, "catalogue response did not decode");
            GetFailure::Fetch(FetchError::malformed(url.as_str(), error.to_string()))
        })
    }
}

impl std::fmt::Debug for GutendexClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GutendexClient")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

enum GetFailure {
    NotFound,
    Fetch(FetchError),
}

#[async_trait]
impl CatalogueService for GutendexClient {
    fn name(&self) -> &str {
        "gutendex"
    }

    #[instrument(skip(self), fields(page = request.page))]
    async fn list_books(&self, request: &ListRequest) -> Result<ListResponse, FetchError> {
        let url = self.list_url(request);
        debug!(url = %url, "listing books");
        self.get_json(&url).await.map_err(|failure| match failure {
            // A listing has no single id; a 404 here is just a failed request.
            GetFailure::NotFound => FetchError::http_status(url.as_str(), 404),
            GetFailure::Fetch(error) => error,
        })
    }

    #[instrument(skip(self))]
    async fn get_book(&self, id: u64) -> Result<Book, FetchError> {
        let url = self.book_url(id);
        debug!(url = %url, "looking up book");
        self.get_json(&url).await.map_err(|failure| match failure {
            GetFailure::NotFound => FetchError::not_found(id),
            GetFailure::Fetch(error) => error,
        })
    }
}

fn parse_base_url(base_url: &str) -> Result<Url, FetchError> {
    let mut normalized = base_url.trim().to_string();
    if !normalized.ends_with('/') {
        normalized.push('/');
    }
    let url = Url::parse(&normalized)
        .map_err(|error| FetchError::network(base_url, format!("invalid base URL: {error}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(FetchError::network(
            base_url,
            "base URL must use http or https",
        ));
    }
    Ok(url)
}

fn build_client(timeouts: HttpTimeouts) -> Result<Client, String> {
    let build = || {
        Client::builder()
            .connect_timeout(Duration::from_secs(timeouts.connect_timeout_secs))
            .timeout(Duration::from_secs(timeouts.read_timeout_secs))
            .user_agent(user_agent::default_user_agent())
            .gzip(true)
    };

    // Some sandboxed environments panic when reqwest queries system proxy
    // settings; retry without proxy lookup in that case.
    match catch_unwind(AssertUnwindSafe(|| build().build())) {
        Ok(result) => result.map_err(|error| error.to_string()),
        Err(_) => {
            warn!("HTTP client hit system proxy panic; building without proxy lookup");
            build().no_proxy().build().map_err(|error| error.to_string())
        }
    }
}
