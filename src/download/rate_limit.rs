//! Retry-After header parsing for rate-limited responses.

use std::time::Duration;

use tracing::{debug, warn};

use super::constants::MAX_RETRY_AFTER;

/// Parses a Retry-After header value into a wait duration.
///
/// Accepts both RFC 7231 forms: integer seconds and HTTP-date. Values are
/// capped at one hour; negative seconds and past dates yield `None`.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use tagmirror_core::download::parse_retry_after;
///
/// assert_eq!(parse_retry_after("120"), Some(Duration::from_secs(120)));
/// assert_eq!(parse_retry_after("0"), Some(Duration::ZERO));
/// assert_eq!(parse_retry_after("invalid"), None);
/// ```
#[must_use]
pub fn parse_retry_after(header_value: &str) -> Option<Duration> {
    let header_value = header_value.trim();

    // Integer seconds first (most common)
    if let Ok(seconds) = header_value.parse::<i64>() {
        if seconds < 0 {
            debug!(seconds, "negative Retry-After value, ignoring");
            return None;
        }

        #[allow(clippy::cast_sign_loss)]
        let duration = Duration::from_secs(seconds as u64);

        if duration > MAX_RETRY_AFTER {
            warn!(
                seconds,
                max_seconds = MAX_RETRY_AFTER.as_secs(),
                "Retry-After exceeds maximum, capping at 1 hour"
            );
            return Some(MAX_RETRY_AFTER);
        }

        return Some(duration);
    }

    // HTTP-date form
    if let Ok(datetime) = httpdate::parse_http_date(header_value) {
        let now = std::time::SystemTime::now();
        return match datetime.duration_since(now) {
            Ok(duration) if duration > MAX_RETRY_AFTER => {
                warn!(
                    delay_secs = duration.as_secs(),
                    max_secs = MAX_RETRY_AFTER.as_secs(),
                    "Retry-After date exceeds maximum, capping at 1 hour"
                );
                Some(MAX_RETRY_AFTER)
            }
            Ok(duration) => Some(duration),
            Err(_) => {
                debug!(header_value, "Retry-After date is in the past, ignoring");
                None
            }
        };
    }

    debug!(header_value, "unparseable Retry-After value");
    None
}
