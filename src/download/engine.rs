//! Download engine: bounded per-page fan-out with retry.
//!
//! The engine takes one page of posts at a time, spawns a task per post
//! gated by a semaphore of `workers` permits, and joins every task before
//! returning, so the crawl never has more than one page in flight.
//!
//! Each post resolves to a typed [`DownloadOutcome`] rather than a bare
//! success flag, keeping skip/failure information available to callers and
//! tests.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{debug, warn};

use super::client::MediaClient;
use super::error::DownloadError;
use crate::config::CrawlConfig;
use crate::crawl::{
    CrawlStats, FILE_RETRY_DELAY, PostId, PostRecord, is_image_extension, jittered,
    normalized_extension,
};
use crate::thumbs::{self, ThumbOutcome};

/// Minimum allowed worker-pool size.
const MIN_WORKERS: usize = 1;

/// Maximum allowed worker-pool size.
const MAX_WORKERS: usize = 100;

/// Error type for download engine construction.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Invalid worker-pool size provided.
    #[error("invalid worker count {value}: must be between {MIN_WORKERS} and {MAX_WORKERS}")]
    InvalidWorkerCount {
        /// The invalid value that was provided.
        value: usize,
    },
}

/// Result of processing one post.
#[derive(Debug)]
pub enum DownloadOutcome {
    /// The file was newly fetched and is now on disk.
    Downloaded {
        /// Final path of the stored file.
        path: PathBuf,
    },
    /// The file already existed on disk; nothing was fetched.
    AlreadyPresent {
        /// Path of the pre-existing file.
        path: PathBuf,
    },
    /// The post carries no file URL and cannot be downloaded.
    SkippedMissingUrl,
    /// Every attempt failed; any partial output was removed.
    Failed {
        /// The error from the final attempt.
        error: DownloadError,
        /// Total attempts made.
        attempts: u32,
    },
}

impl DownloadOutcome {
    /// Returns true when the file is present on disk (newly fetched or
    /// pre-existing).
    #[must_use]
    pub fn is_present(&self) -> bool {
        matches!(self, Self::Downloaded { .. } | Self::AlreadyPresent { .. })
    }
}

/// Download engine with a fixed-size worker pool.
///
/// # Concurrency Model
///
/// - Each post download runs in its own Tokio task
/// - A semaphore permit is acquired before spawning each task
/// - Permits are released automatically when tasks complete (RAII)
/// - [`DownloadEngine::download_page`] joins all tasks before returning,
///   so the control loop blocks until the whole page settles
#[derive(Debug)]
pub struct DownloadEngine {
    semaphore: Arc<Semaphore>,
    workers: usize,
    config: Arc<CrawlConfig>,
    client: MediaClient,
    stats: Arc<CrawlStats>,
}

impl DownloadEngine {
    /// Creates a new engine using the worker count from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidWorkerCount`] if `config.workers` is
    /// outside 1-100.
    pub fn new(
        config: Arc<CrawlConfig>,
        client: MediaClient,
        stats: Arc<CrawlStats>,
    ) -> Result<Self, EngineError> {
        let workers = config.workers;
        if !(MIN_WORKERS..=MAX_WORKERS).contains(&workers) {
            return Err(EngineError::InvalidWorkerCount { value: workers });
        }

        debug!(workers, "creating download engine");

        Ok(Self {
            semaphore: Arc::new(Semaphore::new(workers)),
            workers,
            config,
            client,
            stats,
        })
    }

    /// Returns the configured worker-pool size.
    #[must_use]
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Processes a single post inline (no pool), returning its outcome.
    pub async fn download_post(&self, post: &PostRecord) -> DownloadOutcome {
        process_post(&self.client, &self.config, &self.stats, post).await
    }

    /// Downloads every post of a page through the bounded pool and waits for
    /// all of them, returning the number of newly fetched files.
    ///
    /// Individual failures never propagate; they are counted in the shared
    /// stats and logged.
    pub async fn download_page(&self, posts: Vec<PostRecord>) -> usize {
        let mut handles = Vec::with_capacity(posts.len());

        for post in posts {
            let Ok(permit) = self.semaphore.clone().acquire_owned().await else {
                // Only possible if the semaphore is closed, which this
                // engine never does; stop dispatching rather than spin.
                warn!("worker semaphore closed; abandoning remainder of page");
                break;
            };

            let client = self.client.clone();
            let config = Arc::clone(&self.config);
            let stats = Arc::clone(&self.stats);

            handles.push(tokio::spawn(async move {
                // Permit is dropped when this block exits (RAII)
                let _permit = permit;

                let outcome = process_post(&client, &config, &stats, &post).await;
                match &outcome {
                    DownloadOutcome::Downloaded { path } => {
                        debug!(id = %post.id, path = %path.display(), "downloaded");
                        stats.increment_downloaded();
                    }
                    DownloadOutcome::AlreadyPresent { .. } => {
                        stats.increment_already_present();
                    }
                    DownloadOutcome::SkippedMissingUrl => {
                        debug!(id = %post.id, "post has no file url, skipping");
                        stats.increment_skipped();
                    }
                    DownloadOutcome::Failed { error, attempts } => {
                        warn!(
                            id = %post.id,
                            error = %error,
                            attempts,
                            "download failed after all attempts"
                        );
                        stats.increment_failed();
                    }
                }
                matches!(outcome, DownloadOutcome::Downloaded { .. })
            }));
        }

        let mut newly_downloaded = 0;
        for handle in handles {
            match handle.await {
                Ok(true) => newly_downloaded += 1,
                Ok(false) => {}
                // Task panics are logged but don't fail the page
                Err(e) => warn!(error = %e, "download task panicked"),
            }
        }
        newly_downloaded
    }
}

/// Downloads one post: resolve destination, skip if present, else fetch with
/// retry, then trigger thumbnailing for image extensions.
async fn process_post(
    client: &MediaClient,
    config: &CrawlConfig,
    stats: &CrawlStats,
    post: &PostRecord,
) -> DownloadOutcome {
    let Some(file_url) = post.file_url.as_deref() else {
        return DownloadOutcome::SkippedMissingUrl;
    };

    let ext = normalized_extension(file_url);
    let dest = config.media_dir.join(format!("{}.{ext}", post.id));

    // Existence is the idempotence check; content is not re-verified.
    if matches!(tokio::fs::try_exists(&dest).await, Ok(true)) {
        maybe_thumbnail(config, &dest, &post.id, ext).await;
        return DownloadOutcome::AlreadyPresent { path: dest };
    }

    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match client.download_to_path(file_url, &dest).await {
            Ok(_bytes) => {
                maybe_thumbnail(config, &dest, &post.id, ext).await;
                return DownloadOutcome::Downloaded { path: dest };
            }
            Err(error) => {
                if attempt >= config.max_retries {
                    return DownloadOutcome::Failed {
                        error,
                        attempts: attempt,
                    };
                }
                debug!(
                    id = %post.id,
                    error = %error,
                    attempt,
                    max_attempts = config.max_retries,
                    "download attempt failed, retrying"
                );
                stats.increment_retried();
                tokio::time::sleep(jittered(FILE_RETRY_DELAY)).await;
            }
        }
    }
}

/// Generates a thumbnail for an image post when enabled, off the async
/// runtime (image decode is CPU-bound). Failures are logged and swallowed;
/// a missing thumbnail is not a crawl failure.
async fn maybe_thumbnail(config: &CrawlConfig, source: &std::path::Path, id: &PostId, ext: &str) {
    if !config.generate_thumbs || !is_image_extension(ext) {
        return;
    }

    let thumb_path = config.thumb_dir.join(format!("{id}.jpg"));
    let source = source.to_path_buf();
    let options = config.thumb.clone();

    match tokio::task::spawn_blocking(move || thumbs::generate(&source, &thumb_path, &options))
        .await
    {
        Ok(ThumbOutcome::Failed { reason }) => {
            debug!(id = %id, reason = %reason, "thumbnail generation failed");
        }
        Ok(ThumbOutcome::Created | ThumbOutcome::AlreadyExists) => {}
        Err(e) => warn!(id = %id, error = %e, "thumbnail task panicked"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::CrawlConfig;

    fn test_setup(workers: usize) -> (Arc<CrawlConfig>, MediaClient, Arc<CrawlStats>) {
        let mut config = CrawlConfig::new("https://example.com/index.php", "tag");
        config.workers = workers;
        (
            Arc::new(config),
            MediaClient::new("test-agent"),
            Arc::new(CrawlStats::default()),
        )
    }

    #[test]
    fn test_engine_new_valid_worker_counts() {
        for workers in [1, 8, 100] {
            let (config, client, stats) = test_setup(workers);
            let engine = DownloadEngine::new(config, client, stats).unwrap();
            assert_eq!(engine.workers(), workers);
        }
    }

    #[test]
    fn test_engine_new_rejects_zero_workers() {
        let (config, client, stats) = test_setup(0);
        let result = DownloadEngine::new(config, client, stats);
        assert!(matches!(
            result,
            Err(EngineError::InvalidWorkerCount { value: 0 })
        ));
    }

    #[test]
    fn test_engine_new_rejects_excessive_workers() {
        let (config, client, stats) = test_setup(101);
        let result = DownloadEngine::new(config, client, stats);
        assert!(matches!(
            result,
            Err(EngineError::InvalidWorkerCount { value: 101 })
        ));
    }

    #[test]
    fn test_engine_error_display() {
        let error = EngineError::InvalidWorkerCount { value: 0 };
        let msg = error.to_string();
        assert!(msg.contains("invalid worker count"));
        assert!(msg.contains('0'));
    }

    #[test]
    fn test_outcome_is_present() {
        assert!(
            DownloadOutcome::Downloaded {
                path: PathBuf::from("media/1.jpg")
            }
            .is_present()
        );
        assert!(
            DownloadOutcome::AlreadyPresent {
                path: PathBuf::from("media/1.jpg")
            }
            .is_present()
        );
        assert!(!DownloadOutcome::SkippedMissingUrl.is_present());
        assert!(
            !DownloadOutcome::Failed {
                error: DownloadError::timeout("https://x"),
                attempts: 3
            }
            .is_present()
        );
    }

    #[tokio::test]
    async fn test_download_post_without_url_is_skipped() {
        let (config, client, stats) = test_setup(2);
        let engine = DownloadEngine::new(config, client, Arc::clone(&stats)).unwrap();

        let post = PostRecord {
            id: PostId::Number(1),
            file_url: None,
        };
        let outcome = engine.download_post(&post).await;
        assert!(matches!(outcome, DownloadOutcome::SkippedMissingUrl));
    }
}
