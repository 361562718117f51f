//! HTTP download engine for streaming media files to disk.
//!
//! This module provides the shared [`MediaClient`] for page fetches and
//! streaming file downloads, and the [`DownloadEngine`] which fans a page of
//! posts out across a bounded worker pool.
//!
//! # Features
//!
//! - Streaming downloads (memory-efficient for large files)
//! - Atomic writes: files stream to a `.part` path and rename on completion
//! - Bounded concurrency via a semaphore (fan-out per page, fan-in before
//!   the crawl advances)
//! - Typed per-post outcomes instead of a bare success flag
//! - Structured error types with full context

mod client;
mod constants;
mod engine;
mod error;
mod rate_limit;

pub use client::MediaClient;
pub use constants::{
    CONNECT_TIMEOUT_SECS, DEFAULT_USER_AGENT, FILE_READ_TIMEOUT_SECS, PAGE_READ_TIMEOUT_SECS,
};
pub use engine::{DownloadEngine, DownloadOutcome, EngineError};
pub use error::DownloadError;
pub use rate_limit::parse_retry_after;
