//! Upstream post model and filename derivation.
//!
//! A post's on-disk filename is a pure function of `(id, extension)`, where
//! the extension is derived from the file URL and normalized against an
//! allow-list. That purity is what makes re-runs idempotent: the same post
//! always resolves to the same path.

use std::fmt;

use serde::Deserialize;

/// Extensions accepted verbatim; anything else falls back to `jpg`.
pub const ALLOWED_EXTENSIONS: &[&str] =
    &["jpg", "jpeg", "png", "gif", "webp", "webm", "mp4", "swf"];

/// Extensions that get a thumbnail.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

/// Extensions the catalog marks as video.
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm"];

/// Fallback extension for URLs whose trailing segment is unrecognized.
///
/// Deliberate lossy compatibility behavior: unknown formats are stored as
/// `<id>.jpg` so existing collections and the serving component keep working.
const FALLBACK_EXTENSION: &str = "jpg";

/// Post identifier as sent by the upstream API (integer or string form).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(untagged)]
pub enum PostId {
    /// Numeric id (the common case).
    Number(u64),
    /// String id (some upstreams stringify).
    Text(String),
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// One upstream media entry.
///
/// Upstream post objects carry dozens of fields; only the id and the original
/// file URL matter here, the rest is ignored during deserialization. A post
/// without a `file_url` is unusable and skipped by the downloader (not an
/// error); a post element without an id is dropped at parse time, since it
/// cannot be given a stable filename.
#[derive(Debug, Clone, Deserialize)]
pub struct PostRecord {
    /// Stable unique identifier, used as the on-disk filename stem.
    pub id: PostId,
    /// Absolute URL to the original media asset.
    #[serde(default)]
    pub file_url: Option<String>,
}

/// Derives the storage extension from a file URL.
///
/// Takes the text after the last `.`, strips any query string, lower-cases
/// it, and validates against [`ALLOWED_EXTENSIONS`]; everything else
/// (including a URL with no dot at all) normalizes to `jpg`.
#[must_use]
pub fn normalized_extension(file_url: &str) -> &'static str {
    let tail = file_url.rsplit('.').next().unwrap_or(file_url);
    let tail = tail.split('?').next().unwrap_or(tail);
    let lower = tail.to_ascii_lowercase();
    ALLOWED_EXTENSIONS
        .iter()
        .copied()
        .find(|ext| *ext == lower)
        .unwrap_or(FALLBACK_EXTENSION)
}

/// Returns true if `ext` is a thumbnail-eligible image extension.
#[must_use]
pub fn is_image_extension(ext: &str) -> bool {
    IMAGE_EXTENSIONS.contains(&ext)
}

/// Returns true if `ext` is a video extension.
#[must_use]
pub fn is_video_extension(ext: &str) -> bool {
    VIDEO_EXTENSIONS.contains(&ext)
}
