//! HTTP client wrapper for page fetches and streaming file downloads.
//!
//! One [`MediaClient`] is created per crawl and reused for every request,
//! taking advantage of connection pooling. Page fetches and file downloads
//! share the client but use different read timeouts.

use std::path::{Path, PathBuf};
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::Client;
use reqwest::header::RETRY_AFTER;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, instrument};
use url::Url;

use super::constants::{CONNECT_TIMEOUT_SECS, FILE_READ_TIMEOUT_SECS, PAGE_READ_TIMEOUT_SECS};
use super::error::DownloadError;

/// HTTP client for page fetches and streaming file downloads.
#[derive(Debug, Clone)]
pub struct MediaClient {
    client: Client,
}

impl MediaClient {
    /// Creates a new client with the given User-Agent and default timeouts.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the static
    /// configuration. This should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new(user_agent: &str) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .gzip(true)
            .user_agent(user_agent)
            .build()
            .expect("failed to build HTTP client with static configuration");
        Self { client }
    }

    /// Fetches a page URL and returns the response body as text.
    ///
    /// A 429 response surfaces as [`DownloadError::HttpStatus`] carrying the
    /// Retry-After header so the crawler can honor the server's cooldown.
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` on network failure, timeout, or a non-2xx
    /// status.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn get_page_text(&self, url: &str) -> Result<String, DownloadError> {
        let response = self
            .client
            .get(url)
            .timeout(Duration::from_secs(PAGE_READ_TIMEOUT_SECS))
            .send()
            .await
            .map_err(|e| map_request_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .map(std::string::ToString::to_string);
            return Err(DownloadError::http_status_with_retry_after(
                url,
                status.as_u16(),
                retry_after,
            ));
        }

        response
            .text()
            .await
            .map_err(|e| map_request_error(url, e))
    }

    /// Downloads a file to an exact destination path.
    ///
    /// The body streams to `<dest>.part` and the partial file is renamed to
    /// `dest` only after the stream completes and flushes, so an interrupted
    /// download never leaves a truncated file at the final path. On any
    /// error the partial file is removed.
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` if the URL is invalid, the request fails, the
    /// server returns a non-2xx status, or writing to disk fails.
    #[must_use = "download result reports the number of bytes written"]
    #[instrument(skip(self), fields(url = %url, dest = %dest.display()))]
    pub async fn download_to_path(&self, url: &str, dest: &Path) -> Result<u64, DownloadError> {
        Url::parse(url).map_err(|_| DownloadError::invalid_url(url))?;

        let response = self
            .client
            .get(url)
            .timeout(Duration::from_secs(FILE_READ_TIMEOUT_SECS))
            .send()
            .await
            .map_err(|e| map_request_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::http_status(url, status.as_u16()));
        }

        let part = partial_path(dest);
        let mut file = File::create(&part)
            .await
            .map_err(|e| DownloadError::io(part.clone(), e))?;

        let bytes_written = match stream_to_file(&mut file, response, url, &part).await {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!(path = %part.display(), "cleaning up partial file after error");
                drop(file);
                let _ = tokio::fs::remove_file(&part).await;
                return Err(e);
            }
        };
        drop(file);

        tokio::fs::rename(&part, dest)
            .await
            .map_err(|e| DownloadError::io(dest.to_path_buf(), e))?;

        debug!(bytes = bytes_written, "download complete");
        Ok(bytes_written)
    }

    /// Returns a reference to the underlying reqwest client.
    #[must_use]
    pub fn inner(&self) -> &Client {
        &self.client
    }
}

/// Maps a reqwest request error onto the download error taxonomy.
fn map_request_error(url: &str, error: reqwest::Error) -> DownloadError {
    if error.is_timeout() {
        DownloadError::timeout(url)
    } else {
        DownloadError::network(url, error)
    }
}

/// Returns the temporary path a download streams to before the rename.
fn partial_path(dest: &Path) -> PathBuf {
    let mut os = dest.as_os_str().to_owned();
    os.push(".part");
    PathBuf::from(os)
}

/// Streams the response body to a file, returning bytes written.
///
/// Extracted so the caller can clean up the partial file on error.
async fn stream_to_file(
    file: &mut File,
    response: reqwest::Response,
    url: &str,
    file_path: &Path,
) -> Result<u64, DownloadError> {
    let mut writer = BufWriter::new(file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| map_request_error(url, e))?;

        writer
            .write_all(&chunk)
            .await
            .map_err(|e| DownloadError::io(file_path.to_path_buf(), e))?;

        bytes_written += chunk.len() as u64;
    }

    // Ensure all data is flushed to disk before the rename
    writer
        .flush()
        .await
        .map_err(|e| DownloadError::io(file_path.to_path_buf(), e))?;

    Ok(bytes_written)
}
