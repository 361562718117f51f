//! Constants for the download module (timeouts, identity).

use std::time::Duration;

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Read timeout for page (API) requests (30 seconds).
pub const PAGE_READ_TIMEOUT_SECS: u64 = 30;

/// Read timeout for file downloads (60 seconds).
pub const FILE_READ_TIMEOUT_SECS: u64 = 60;

/// Maximum Retry-After header value (1 hour) to prevent excessive delays.
pub const MAX_RETRY_AFTER: Duration = Duration::from_secs(3600);

/// Default User-Agent sent on every request.
///
/// Browser-style string; several booru mirrors reject obviously
/// programmatic identities.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36";
