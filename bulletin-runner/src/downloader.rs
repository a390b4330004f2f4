//! Document downloads into the local download directory.

use bulletin_core::{BulletinLink, DataError, DocumentSource, DownloadedDocument};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Saves bulletins under one directory, one file per trade date.
pub struct Downloader {
    source: Arc<dyn DocumentSource>,
    dir: PathBuf,
}

impl Downloader {
    /// Download through `source` into `dir` (created on first use).
    pub fn new(source: Arc<dyn DocumentSource>, dir: impl Into<PathBuf>) -> Self {
        Self {
            source,
            dir: dir.into(),
        }
    }

    /// Fetch `link` to `<dir>/<link.filename>`.
    ///
    /// The returned document removes its file when dropped. On error the
    /// partial file has already been removed.
    pub async fn download(&self, link: &BulletinLink) -> Result<DownloadedDocument, DataError> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let document = DownloadedDocument::claim(self.dir.join(&link.filename), link.trade_date);
        let len = self.source.fetch_to(link, document.path()).await?;

        debug!(url = %link.url, bytes = len, "bulletin downloaded");
        Ok(document.with_len(len))
    }
}
