//! Collaborator traits for the origin site and the structured errors they return.
//!
//! `PageFetcher` and `DocumentSource` abstract over the exchange website so the
//! pipeline can run against canned pages and files in tests.

use crate::domain::BulletinLink;
use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

/// Errors from fetching listing pages or downloading documents.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("HTTP {status} for {url}")]
    HttpStatus { status: u16, url: String },

    #[error("rate limited by origin (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("listing page {page} had no bulletin links after {waited_secs}s")]
    ContentNotReady { page: u32, waited_secs: u64 },

    #[error("origin has blocked requests (circuit breaker open, {remaining_secs}s left)")]
    OriginBlocked { remaining_secs: u64 },

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP client setup failed: {0}")]
    ClientSetup(String),

    #[error("data error: {0}")]
    Other(String),
}

/// Source of rendered listing pages.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Human-readable name of this fetcher.
    fn name(&self) -> &str;

    /// Base URL that relative bulletin hrefs are resolved against.
    fn base_url(&self) -> &url::Url;

    /// Fetch listing page `page` (1-based) once its bulletin links are present.
    async fn fetch_page(&self, page: u32) -> Result<String, DataError>;

    /// Release any held resources. Called once when the pipeline shuts down.
    async fn close(&self) {}
}

/// Source of bulletin documents.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Stream the document behind `link` into `dest`, returning the byte count.
    ///
    /// On error `dest` may hold a partial file; the caller owns its removal.
    async fn fetch_to(&self, link: &BulletinLink, dest: &Path) -> Result<u64, DataError>;
}
