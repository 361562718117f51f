//! Error types for the download module.
//!
//! Structured errors for page fetches and file downloads, carrying enough
//! context (URL, path, status) for debugging and progress reporting.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur fetching pages or downloading files.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error requesting {url}: {source}")]
    Network {
        /// The URL that failed.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out before completion.
    #[error("timeout requesting {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// HTTP error response (4xx client errors, 5xx server errors).
    #[error("HTTP {status} requesting {url}")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
        /// The Retry-After header value, if present (for 429 responses).
        retry_after: Option<String>,
    },

    /// File system error during download (create file, write, rename).
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The provided URL is malformed or invalid.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },
}

impl DownloadError {
    /// Creates a network error from a reqwest error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
            retry_after: None,
        }
    }

    /// Creates an HTTP status error with a Retry-After header value.
    pub fn http_status_with_retry_after(
        url: impl Into<String>,
        status: u16,
        retry_after: Option<String>,
    ) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
            retry_after,
        }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Returns true for an HTTP 429 response.
    #[must_use]
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::HttpStatus { status: 429, .. })
    }
}

// No `From<reqwest::Error>` / `From<std::io::Error>`: the variants require
// context (url, path) the source errors don't carry, so the helper
// constructors are the conversion points.

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_display_contains_url() {
        let error = DownloadError::timeout("https://example.com/file.png");
        assert!(error.to_string().contains("timeout"));
        assert!(error.to_string().contains("https://example.com/file.png"));
    }

    #[test]
    fn test_http_status_display() {
        let error = DownloadError::http_status("https://example.com/file.png", 404);
        let msg = error.to_string();
        assert!(msg.contains("404"), "Expected '404' in: {msg}");
        assert!(msg.contains("https://example.com/file.png"));
    }

    #[test]
    fn test_io_display_contains_path() {
        let io_error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let error = DownloadError::io(PathBuf::from("/tmp/media/1.png"), io_error);
        assert!(error.to_string().contains("/tmp/media/1.png"));
    }

    #[test]
    fn test_invalid_url_display() {
        let error = DownloadError::invalid_url("not-a-url");
        let msg = error.to_string();
        assert!(msg.contains("invalid URL"));
        assert!(msg.contains("not-a-url"));
    }

    #[test]
    fn test_is_rate_limited() {
        assert!(DownloadError::http_status("https://x", 429).is_rate_limited());
        assert!(!DownloadError::http_status("https://x", 500).is_rate_limited());
        assert!(!DownloadError::timeout("https://x").is_rate_limited());
    }

    #[test]
    fn test_retry_after_carried_on_status_error() {
        let error = DownloadError::http_status_with_retry_after(
            "https://x",
            429,
            Some("120".to_string()),
        );
        match error {
            DownloadError::HttpStatus { retry_after, .. } => {
                assert_eq!(retry_after.as_deref(), Some("120"));
            }
            other => panic!("Expected HttpStatus, got: {other:?}"),
        }
    }
}
