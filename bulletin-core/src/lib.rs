//! Bulletin Core: domain types and the external capabilities the ingestion
//! pipeline talks to.
//!
//! This crate contains:
//! - Domain types (bulletin links, trade records)
//! - Listing-page parsing and the HTTP page fetcher / document source
//! - Scoped downloaded documents (removed on drop)
//! - Trade-summary report decoding over an in-memory sheet model
//! - The trade record store (SQLite, uniqueness owned by the schema)

pub mod data;
pub mod domain;
#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;
pub mod report;
pub mod store;

pub use data::{DataError, DocumentSource, DownloadedDocument, PageFetcher};
pub use domain::{BulletinLink, TradeRecord};
pub use report::{decode_file, decode_sheet, DecodeError, DecodedReport, ReportReader};
pub use store::{RecordStore, SqliteRecordStore, StoreError};
