//! Crawl configuration.
//!
//! All knobs for a crawl live in [`CrawlConfig`], which is built once (by the
//! CLI or by tests) and passed explicitly to the components that need it.
//! There is no process-global state; the control loop owns the configuration
//! for its lifetime.

use std::path::PathBuf;
use std::time::Duration;

/// Default posts requested per page.
pub const DEFAULT_PAGE_SIZE: u32 = 200;

/// Default worker-pool size for per-page downloads.
pub const DEFAULT_WORKERS: usize = 8;

/// Default attempts per HTTP unit of work (page fetch or file download).
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default consecutive-empty-page threshold that ends the crawl.
pub const DEFAULT_EMPTY_PAGE_LIMIT: u32 = 10;

/// Default consecutive-failed-page threshold that ends the crawl.
pub const DEFAULT_FAILED_PAGE_LIMIT: u32 = 5;

/// Default base delay between page fetches (jitter is applied on top).
pub const DEFAULT_PAGE_DELAY: Duration = Duration::from_secs(1);

/// Default cooldown after an HTTP 429 without a usable Retry-After header.
pub const DEFAULT_RATE_LIMIT_COOLDOWN: Duration = Duration::from_secs(15);

/// Thumbnail output parameters.
///
/// Thumbnails are encoded as JPEG, so transparency is flattened onto an
/// opaque `background` color first.
#[derive(Debug, Clone)]
pub struct ThumbOptions {
    /// Bounding-box width in pixels.
    pub max_width: u32,
    /// Bounding-box height in pixels.
    pub max_height: u32,
    /// JPEG quality (1-100).
    pub quality: u8,
    /// RGB background color used to flatten transparent images.
    pub background: [u8; 3],
}

impl Default for ThumbOptions {
    fn default() -> Self {
        Self {
            max_width: 320,
            max_height: 426,
            quality: 85,
            background: [30, 30, 30],
        }
    }
}

/// Configuration for a single crawl run.
///
/// Constructed via [`CrawlConfig::new`] with defaults for everything except
/// the upstream endpoint and the tag expression, then adjusted field-by-field.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Base URL of the upstream post API endpoint (scheme + host + path).
    pub api_base: String,
    /// Tag expression in the upstream search syntax; percent-encoded when
    /// the page URL is built.
    pub tags: String,
    /// Directory receiving downloaded originals (`<id>.<ext>`).
    pub media_dir: PathBuf,
    /// Directory receiving generated thumbnails (`<id>.jpg`).
    pub thumb_dir: PathBuf,
    /// Whether to generate thumbnails for image downloads.
    pub generate_thumbs: bool,
    /// Thumbnail output parameters.
    pub thumb: ThumbOptions,
    /// Posts requested per page (`limit` query parameter).
    pub page_size: u32,
    /// Zero-based page cursor the crawl starts from.
    pub start_page: u64,
    /// Optional API key appended to page requests.
    pub api_key: Option<String>,
    /// Optional user id appended to page requests.
    pub user_id: Option<String>,
    /// Worker-pool size for per-page downloads (validated 1-100 by the engine).
    pub workers: usize,
    /// Attempts per HTTP unit of work before degrading.
    pub max_retries: u32,
    /// Consecutive genuinely-empty pages that end the crawl.
    pub empty_page_limit: u32,
    /// Consecutive exhausted-retries pages that end the crawl.
    pub failed_page_limit: u32,
    /// Base delay applied (jittered) between page fetches.
    pub page_delay: Duration,
    /// Cooldown after HTTP 429 when the server sends no usable Retry-After.
    pub rate_limit_cooldown: Duration,
    /// Output path for the catalog manifest.
    pub catalog_path: PathBuf,
    /// User-Agent header sent on every request.
    pub user_agent: String,
}

impl CrawlConfig {
    /// Creates a configuration with defaults for everything except the
    /// upstream endpoint and the tag expression.
    #[must_use]
    pub fn new(api_base: impl Into<String>, tags: impl Into<String>) -> Self {
        Self {
            api_base: api_base.into(),
            tags: tags.into(),
            media_dir: PathBuf::from("media"),
            thumb_dir: PathBuf::from("thumbs"),
            generate_thumbs: true,
            thumb: ThumbOptions::default(),
            page_size: DEFAULT_PAGE_SIZE,
            start_page: 0,
            api_key: None,
            user_id: None,
            workers: DEFAULT_WORKERS,
            max_retries: DEFAULT_MAX_RETRIES,
            empty_page_limit: DEFAULT_EMPTY_PAGE_LIMIT,
            failed_page_limit: DEFAULT_FAILED_PAGE_LIMIT,
            page_delay: DEFAULT_PAGE_DELAY,
            rate_limit_cooldown: DEFAULT_RATE_LIMIT_COOLDOWN,
            catalog_path: PathBuf::from("catalog.json"),
            user_agent: crate::download::DEFAULT_USER_AGENT.to_string(),
        }
    }
}
