//! Tolerant parsing of upstream page responses.
//!
//! The upstream is noisy: rate-limited requests come back as HTML error
//! pages, empty result sets are sometimes a blank body, and malformed JSON
//! shows up under load. None of that is worth aborting a crawl over, so the
//! parser is a total function: any body it cannot make sense of degrades to
//! "zero posts this page", which feeds the empty-page counter instead of
//! raising.

use serde_json::Value;
use tracing::debug;

use super::post::PostRecord;

/// Parses a raw page body into post records.
///
/// - Blank or whitespace-only body: empty list.
/// - Body containing a case-insensitive `<html` or `<!doctype` marker: empty
///   list (upstream error page, not a parse failure).
/// - JSON array: its elements. JSON object: the array under its `posts` key
///   (absent key: empty list).
/// - Any other top-level value, or a top-level decode failure: empty list.
///
/// Array elements that do not deserialize into a [`PostRecord`] are dropped
/// individually; one malformed post must not sink its page siblings.
#[must_use]
pub fn parse_posts(body: &str) -> Vec<PostRecord> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    let lower = trimmed.to_lowercase();
    if lower.contains("<html") || lower.contains("<!doctype") {
        debug!("page body is an HTML error page");
        return Vec::new();
    }

    let Ok(value) = serde_json::from_str::<Value>(trimmed) else {
        debug!("page body is not valid JSON");
        return Vec::new();
    };

    let elements = match value {
        Value::Array(elements) => elements,
        Value::Object(mut map) => match map.remove("posts") {
            Some(Value::Array(elements)) => elements,
            _ => return Vec::new(),
        },
        _ => return Vec::new(),
    };

    let total = elements.len();
    let posts: Vec<PostRecord> = elements
        .into_iter()
        .filter_map(|element| serde_json::from_value(element).ok())
        .collect();
    if posts.len() < total {
        debug!(
            dropped = total - posts.len(),
            kept = posts.len(),
            "dropped malformed post elements"
        );
    }
    posts
}
