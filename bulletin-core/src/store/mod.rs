//! Trade record persistence.
//!
//! The store owns uniqueness: `(exchange_product_id, trade_date)` is a unique
//! key in the schema and inserts ignore conflicts, so concurrent ingest tasks
//! can never create duplicates even if their existence checks race.

mod schema;
mod sqlite;

pub use sqlite::{SqliteRecordStore, StoreSummary};

use crate::domain::TradeRecord;
use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("corrupt row: {0}")]
    Corrupt(String),
}

/// Trade record persistence used by the ingestor.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// The stored record for a key, if any.
    async fn find_by_key(
        &self,
        exchange_product_id: &str,
        trade_date: NaiveDate,
    ) -> Result<Option<TradeRecord>, StoreError>;

    /// Insert `records` in one transaction, ignoring keys that already exist.
    /// Returns how many rows were actually inserted. On error nothing from the
    /// batch is kept.
    async fn insert_batch(&self, records: &[TradeRecord]) -> Result<usize, StoreError>;

    /// Release connections. Called once when the pipeline shuts down.
    async fn close(&self) {}
}
