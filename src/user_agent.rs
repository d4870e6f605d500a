//! Shared User-Agent string for catalogue HTTP clients.

/// Short description appended to the product token.
const UA_COMMENT: &str = "book-catalogue-browser";

/// Default User-Agent for catalogue requests (identifies the tool and version).
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("gutenscroll/{version} ({UA_COMMENT})")
}
