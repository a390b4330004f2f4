//! Dedup ingest: skip keys already stored or repeated in the batch, persist the rest.

use bulletin_core::{RecordStore, StoreError, TradeRecord};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestOutcome {
    pub inserted: usize,
    pub skipped: usize,
}

pub struct DedupIngestor {
    store: Arc<dyn RecordStore>,
}

impl DedupIngestor {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Persist one document's records as a single batch.
    ///
    /// The existence check only saves work; the store's conflict-ignoring
    /// insert is what keeps keys unique when tasks race. Rows that lose such
    /// a race are counted as skipped.
    pub async fn ingest(&self, records: Vec<TradeRecord>) -> Result<IngestOutcome, StoreError> {
        let mut seen: HashSet<(String, NaiveDate)> = HashSet::with_capacity(records.len());
        let mut fresh = Vec::with_capacity(records.len());
        let mut skipped = 0;

        for record in records {
            if !seen.insert((record.exchange_product_id.clone(), record.trade_date)) {
                skipped += 1;
                continue;
            }
            let (product_id, trade_date) = record.key();
            if self.store.find_by_key(product_id, trade_date).await?.is_some() {
                skipped += 1;
                continue;
            }
            fresh.push(record);
        }

        let inserted = self.store.insert_batch(&fresh).await?;
        skipped += fresh.len() - inserted;

        Ok(IngestOutcome { inserted, skipped })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bulletin_core::SqliteRecordStore;
    use rust_decimal::Decimal;

    fn record(id: &str, count: i64) -> TradeRecord {
        TradeRecord::new(
            id,
            "Бензин (АИ-92-К5)",
            "ст. Уфа",
            Some(Decimal::new(60, 0)),
            None,
            count,
            NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
        )
    }

    #[tokio::test]
    async fn same_row_twice_in_one_batch_stores_once() {
        let store = Arc::new(SqliteRecordStore::in_memory().await.unwrap());
        let ingestor = DedupIngestor::new(store.clone());

        let outcome = ingestor
            .ingest(vec![record("A592UFM060F", 3), record("A592UFM060F", 3)])
            .await
            .unwrap();

        assert_eq!(outcome, IngestOutcome { inserted: 1, skipped: 1 });
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn stored_keys_are_skipped_on_later_batches() {
        let store = Arc::new(SqliteRecordStore::in_memory().await.unwrap());
        let ingestor = DedupIngestor::new(store.clone());

        ingestor.ingest(vec![record("A592UFM060F", 3)]).await.unwrap();
        let outcome = ingestor
            .ingest(vec![record("A592UFM060F", 9), record("DT5ZNVY065F", 1)])
            .await
            .unwrap();

        assert_eq!(outcome, IngestOutcome { inserted: 1, skipped: 1 });
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn empty_batch() {
        let store = Arc::new(SqliteRecordStore::in_memory().await.unwrap());
        let outcome = DedupIngestor::new(store).ingest(Vec::new()).await.unwrap();
        assert_eq!(outcome, IngestOutcome::default());
    }
}
