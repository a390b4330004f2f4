//! A downloaded bulletin on local disk, removed when dropped.

use chrono::NaiveDate;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Scoped temporary file holding one bulletin.
///
/// The guard is created before the first byte is written, so a failed
/// download, a failed decode and a successful ingest all end the same way:
/// the file is deleted when the guard goes out of scope.
#[derive(Debug)]
pub struct DownloadedDocument {
    path: PathBuf,
    trade_date: NaiveDate,
    len: u64,
}

impl DownloadedDocument {
    /// Take ownership of `path` (which may not exist yet).
    pub fn claim(path: impl Into<PathBuf>, trade_date: NaiveDate) -> Self {
        Self {
            path: path.into(),
            trade_date,
            len: 0,
        }
    }

    /// Record how many bytes were written.
    pub fn with_len(mut self, len: u64) -> Self {
        self.len = len;
        self
    }

    /// Where the bulletin lives on disk.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Trade date the document is expected to contain.
    pub fn trade_date(&self) -> NaiveDate {
        self.trade_date
    }

    /// Bytes written by the download.
    pub fn len(&self) -> u64 {
        self.len
    }

    /// True when the download wrote nothing.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Drop for DownloadedDocument {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "removed downloaded bulletin"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "failed to remove downloaded bulletin"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 2, 3).unwrap()
    }

    #[test]
    fn file_is_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("oil_products_20250203.xls");
        fs::write(&path, b"payload").unwrap();

        let doc = DownloadedDocument::claim(&path, date()).with_len(7);
        assert_eq!(doc.len(), 7);
        assert_eq!(doc.trade_date(), date());
        assert!(path.exists());
        drop(doc);
        assert!(!path.exists());
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let doc = DownloadedDocument::claim(dir.path().join("never_written.xls"), date());
        assert!(doc.is_empty());
        drop(doc);
    }

    #[test]
    fn removed_even_when_holder_panics() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("panic.xls");
        fs::write(&path, b"x").unwrap();

        let claimed = path.clone();
        let result = std::panic::catch_unwind(move || {
            let _doc = DownloadedDocument::claim(claimed, date());
            panic!("decode blew up");
        });
        assert!(result.is_err());
        assert!(!path.exists());
    }
}
