//! Error types for catalogue requests.
//!
//! Every failure the remote service can produce is folded into
//! [`FetchError`]. It is `Clone` because one failed request can be observed
//! by several joined callers and is also kept on the cache entry.

use std::fmt;

use thiserror::Error;

/// Coarse classification of a [`FetchError`], for renderers and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchErrorKind {
    /// Transport failure or non-success HTTP status.
    NetworkFailure,
    /// Single-item lookup for an id that does not exist.
    NotFound,
    /// Response body did not have the expected shape.
    MalformedResponse,
}

impl fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::NetworkFailure => "network_failure",
            Self::NotFound => "not_found",
            Self::MalformedResponse => "malformed_response",
        };
        write!(f, "{label}")
    }
}

/// Errors that can occur while talking to the catalogue service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The request could not be completed or returned a non-success status.
    #[error("network failure fetching {url}: {message}")]
    NetworkFailure {
        /// The URL that was requested.
        url: String,
        /// HTTP status, when the server answered at all.
        status: Option<u16>,
        /// What went wrong.
        message: String,
    },

    /// The requested book does not exist.
    #[error("book {id} not found")]
    NotFound {
        /// The id that was looked up.
        id: u64,
    },

    /// The response body could not be decoded.
    #[error("malformed response from {url}: {message}")]
    MalformedResponse {
        /// The URL whose response was malformed.
        url: String,
        /// Decoder message.
        message: String,
    },
}

impl FetchError {
    /// Creates a transport-level network failure.
    pub fn network(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::NetworkFailure {
            url: url.into(),
            status: None,
            message: message.into(),
        }
    }

    /// Creates a network failure for a non-success HTTP status.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::NetworkFailure {
            url: url.into(),
            status: Some(status),
            message: format!("HTTP {status}"),
        }
    }

    /// Creates a not-found error for a single-item lookup.
    #[must_use]
    pub fn not_found(id: u64) -> Self {
        Self::NotFound { id }
    }

    /// Creates a malformed-response error.
    pub fn malformed(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Returns the error's classification.
    #[must_use]
    pub fn kind(&self) -> FetchErrorKind {
        match self {
            Self::NetworkFailure { .. } => FetchErrorKind::NetworkFailure,
            Self::NotFound { .. } => FetchErrorKind::NotFound,
            Self::MalformedResponse { .. } => FetchErrorKind::MalformedResponse,
        }
    }
}

// No `From<reqwest::Error>`: every variant needs the request URL, which the
// source error does not carry. Use the constructors above instead.

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_display_includes_status_and_url() {
        let error = FetchError::http_status("https://gutendex.com/books/?page=2", 503);
        let msg = error.to_string();
        assert!(msg.contains("503"), "Expected status in: {msg}");
        assert!(msg.contains("page=2"), "Expected URL in: {msg}");
        assert_eq!(error.kind(), FetchErrorKind::NetworkFailure);
    }

    #[test]
    fn test_not_found_display() {
        let error = FetchError::not_found(999_999);
        assert_eq!(error.to_string(), "book 999999 not found");
        assert_eq!(error.kind(), FetchErrorKind::NotFound);
    }

    #[test]
    fn test_malformed_display() {
        let error = FetchError::malformed("https://gutendex.com/books/1", "missing field `id`");
        let msg = error.to_string();
        assert!(msg.contains("malformed response"), "got: {msg}");
        assert!(msg.contains("missing field"), "got: {msg}");
        assert_eq!(error.kind().to_string(), "malformed_response");
    }
}
