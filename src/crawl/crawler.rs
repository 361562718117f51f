//! Page crawl control loop.
//!
//! One control task walks the tag query page by page: fetch, parse, hand the
//! page's posts to the bounded download engine, advance the cursor, repeat.
//! There is no "last page" signal from the upstream — exhaustion is inferred
//! from consecutive empty pages, with a separate threshold for pages that
//! failed outright so a dead upstream cannot masquerade as a finished
//! result set.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, info, warn};

use super::delay::{PAGE_RETRY_DELAY, jittered};
use super::parser::parse_posts;
use super::post::PostRecord;
use crate::config::CrawlConfig;
use crate::download::{DownloadEngine, DownloadError, EngineError, MediaClient, parse_retry_after};

/// Counters shared between the control loop, the download workers, and the
/// progress UI.
///
/// All fields are atomics so workers never take a lock; the downloaded-count
/// accumulation the crawl needs is a `fetch_add` per file.
#[derive(Debug, Default)]
pub struct CrawlStats {
    pages_fetched: AtomicU64,
    posts_seen: AtomicU64,
    downloaded: AtomicU64,
    already_present: AtomicU64,
    skipped: AtomicU64,
    failed: AtomicU64,
    retried: AtomicU64,
}

impl CrawlStats {
    /// Pages for which a fetch cycle completed (successful, empty, or
    /// exhausted).
    #[must_use]
    pub fn pages_fetched(&self) -> u64 {
        self.pages_fetched.load(Ordering::SeqCst)
    }

    /// Posts parsed out of non-empty pages.
    #[must_use]
    pub fn posts_seen(&self) -> u64 {
        self.posts_seen.load(Ordering::SeqCst)
    }

    /// Files newly fetched this run (pre-existing skips not counted).
    #[must_use]
    pub fn downloaded(&self) -> u64 {
        self.downloaded.load(Ordering::SeqCst)
    }

    /// Posts whose file already existed on disk.
    #[must_use]
    pub fn already_present(&self) -> u64 {
        self.already_present.load(Ordering::SeqCst)
    }

    /// Posts skipped for missing file URLs.
    #[must_use]
    pub fn skipped(&self) -> u64 {
        self.skipped.load(Ordering::SeqCst)
    }

    /// Posts whose download failed after all attempts.
    #[must_use]
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::SeqCst)
    }

    /// Retry attempts made across all downloads.
    #[must_use]
    pub fn retried(&self) -> u64 {
        self.retried.load(Ordering::SeqCst)
    }

    pub(crate) fn increment_pages(&self) {
        self.pages_fetched.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn add_posts(&self, count: u64) {
        self.posts_seen.fetch_add(count, Ordering::SeqCst);
    }

    pub(crate) fn increment_downloaded(&self) {
        self.downloaded.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn increment_already_present(&self) {
        self.already_present.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn increment_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn increment_failed(&self) {
        self.failed.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn increment_retried(&self) {
        self.retried.fetch_add(1, Ordering::SeqCst);
    }

    /// Point-in-time snapshot of every counter.
    #[must_use]
    pub fn snapshot(&self) -> CrawlReport {
        CrawlReport {
            pages_fetched: self.pages_fetched(),
            posts_seen: self.posts_seen(),
            downloaded: self.downloaded(),
            already_present: self.already_present(),
            skipped: self.skipped(),
            failed: self.failed(),
            retried: self.retried(),
        }
    }
}

/// Final counts from a crawl run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrawlReport {
    /// Pages for which a fetch cycle completed.
    pub pages_fetched: u64,
    /// Posts parsed out of non-empty pages.
    pub posts_seen: u64,
    /// Files newly fetched this run.
    pub downloaded: u64,
    /// Posts whose file already existed on disk.
    pub already_present: u64,
    /// Posts skipped for missing file URLs.
    pub skipped: u64,
    /// Posts whose download failed after all attempts.
    pub failed: u64,
    /// Retry attempts made across all downloads.
    pub retried: u64,
}

impl CrawlReport {
    /// Posts whose file is on disk after the run, fetched or pre-existing.
    #[must_use]
    pub fn present(&self) -> u64 {
        self.downloaded + self.already_present
    }
}

/// Outcome of fetching one page, after retries.
enum PageFetch {
    /// The page responded and parsed (possibly to zero posts).
    Posts(Vec<PostRecord>),
    /// Every attempt failed; no response body was usable.
    Exhausted,
}

/// Drives the crawl: strictly sequential across pages, bounded fan-out
/// within a page.
#[derive(Debug)]
pub struct Crawler {
    config: Arc<CrawlConfig>,
    client: MediaClient,
    engine: DownloadEngine,
    stats: Arc<CrawlStats>,
}

impl Crawler {
    /// Creates a crawler and its download engine from a configuration.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] if the configured worker count is invalid.
    pub fn new(config: CrawlConfig) -> Result<Self, EngineError> {
        let config = Arc::new(config);
        let client = MediaClient::new(&config.user_agent);
        let stats = Arc::new(CrawlStats::default());
        let engine = DownloadEngine::new(Arc::clone(&config), client.clone(), Arc::clone(&stats))?;
        Ok(Self {
            config,
            client,
            engine,
            stats,
        })
    }

    /// Returns a handle to the shared counters (for progress UIs).
    #[must_use]
    pub fn stats(&self) -> Arc<CrawlStats> {
        Arc::clone(&self.stats)
    }

    /// Runs the crawl to completion and returns the final counts.
    ///
    /// Terminates when `empty_page_limit` consecutive pages parse to zero
    /// posts, or `failed_page_limit` consecutive pages exhaust their
    /// retries. No network condition is fatal; everything degrades into the
    /// counters.
    pub async fn run(&self) -> CrawlReport {
        let mut cursor = self.config.start_page;
        let mut consecutive_empty = 0u32;
        let mut consecutive_failed = 0u32;

        info!(
            tags = %self.config.tags,
            start_page = cursor,
            page_size = self.config.page_size,
            "starting crawl"
        );

        loop {
            let fetch = self.fetch_page(cursor).await;
            self.stats.increment_pages();

            match fetch {
                PageFetch::Exhausted => {
                    consecutive_failed += 1;
                    warn!(
                        pid = cursor,
                        streak = consecutive_failed,
                        limit = self.config.failed_page_limit,
                        "page fetch exhausted retries"
                    );
                    if consecutive_failed >= self.config.failed_page_limit {
                        info!(
                            pid = cursor,
                            "consecutive failed-page limit reached, stopping crawl"
                        );
                        break;
                    }
                }
                PageFetch::Posts(posts) if posts.is_empty() => {
                    consecutive_empty += 1;
                    debug!(
                        pid = cursor,
                        streak = consecutive_empty,
                        limit = self.config.empty_page_limit,
                        "empty page"
                    );
                    if consecutive_empty >= self.config.empty_page_limit {
                        info!(
                            pid = cursor,
                            "consecutive empty-page limit reached, crawl exhausted"
                        );
                        break;
                    }
                }
                PageFetch::Posts(posts) => {
                    consecutive_empty = 0;
                    consecutive_failed = 0;
                    self.stats.add_posts(posts.len() as u64);

                    let post_count = posts.len();
                    let newly_downloaded = self.engine.download_page(posts).await;
                    info!(
                        pid = cursor,
                        posts = post_count,
                        downloaded = newly_downloaded,
                        "page complete"
                    );
                }
            }

            // The cursor always advances by exactly one page, whatever the
            // page's outcome; a permanently-broken page must not stall the
            // crawl.
            cursor += 1;
            tokio::time::sleep(jittered(self.config.page_delay)).await;
        }

        self.stats.snapshot()
    }

    /// Fetches and parses one page, retrying on failure.
    ///
    /// A 429 holds the cursor: the server's Retry-After (or the configured
    /// cooldown) is slept and the same page is requested again, without
    /// consuming a retry attempt or moving any counter.
    async fn fetch_page(&self, cursor: u64) -> PageFetch {
        let url = self.page_url(cursor);
        let mut attempt = 0u32;

        loop {
            match self.client.get_page_text(&url).await {
                Ok(body) => return PageFetch::Posts(parse_posts(&body)),
                Err(DownloadError::HttpStatus {
                    status: 429,
                    retry_after,
                    ..
                }) => {
                    let cooldown = retry_after
                        .as_deref()
                        .and_then(parse_retry_after)
                        .unwrap_or(self.config.rate_limit_cooldown);
                    warn!(
                        pid = cursor,
                        cooldown_ms = cooldown.as_millis(),
                        "rate limited, holding page cursor"
                    );
                    tokio::time::sleep(cooldown).await;
                }
                Err(error) => {
                    attempt += 1;
                    if attempt >= self.config.max_retries {
                        warn!(
                            pid = cursor,
                            error = %error,
                            attempts = attempt,
                            "page fetch failed"
                        );
                        return PageFetch::Exhausted;
                    }
                    debug!(
                        pid = cursor,
                        error = %error,
                        attempt,
                        "page fetch error, retrying"
                    );
                    tokio::time::sleep(jittered(PAGE_RETRY_DELAY)).await;
                }
            }
        }
    }

    /// Builds the upstream query URL for a page cursor.
    fn page_url(&self, cursor: u64) -> String {
        let mut url = format!(
            "{}?page=dapi&s=post&q=index&json=1&tags={}&limit={}&pid={}",
            self.config.api_base,
            urlencoding::encode(&self.config.tags),
            self.config.page_size,
            cursor,
        );
        if let Some(api_key) = &self.config.api_key {
            url.push_str("&api_key=");
            url.push_str(api_key);
        }
        if let Some(user_id) = &self.config.user_id {
            url.push_str("&user_id=");
            url.push_str(user_id);
        }
        url
    }
}
