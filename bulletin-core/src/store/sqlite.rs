//! SQLite-backed record store.

use super::schema::{CREATE_TRADE_DATE_INDEX, CREATE_TRADING_RESULTS};
use super::{RecordStore, StoreError};
use crate::domain::TradeRecord;
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow,
};
use sqlx::Row;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

const SELECT_COLUMNS: &str = "exchange_product_id, exchange_product_name, oil_id, \
     delivery_basis_id, delivery_basis_name, delivery_type_id, volume, total, count, trade_date";

/// Aggregate view of the store, for status reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreSummary {
    pub records: i64,
    pub trading_days: i64,
    pub first_trade_date: Option<NaiveDate>,
    pub last_trade_date: Option<NaiveDate>,
}

#[derive(Debug, Clone)]
pub struct SqliteRecordStore {
    pool: SqlitePool,
}

impl SqliteRecordStore {
    /// Open (creating if missing) the database at `url` and ensure the schema.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.ensure_schema().await?;
        info!(url, "record store opened");
        Ok(store)
    }

    /// A private in-memory database. One connection, never recycled, so the
    /// data lives as long as the store.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(CREATE_TRADING_RESULTS)
            .execute(&self.pool)
            .await?;
        sqlx::query(CREATE_TRADE_DATE_INDEX)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn count(&self) -> Result<i64, StoreError> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM trading_results")
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }

    pub async fn summary(&self) -> Result<StoreSummary, StoreError> {
        let row = sqlx::query(
            r"
            SELECT COUNT(*) AS records,
                   COUNT(DISTINCT trade_date) AS trading_days,
                   MIN(trade_date) AS first_trade_date,
                   MAX(trade_date) AS last_trade_date
            FROM trading_results
            ",
        )
        .fetch_one(&self.pool)
        .await?;

        let first: Option<String> = row.try_get("first_trade_date")?;
        let last: Option<String> = row.try_get("last_trade_date")?;

        Ok(StoreSummary {
            records: row.try_get("records")?,
            trading_days: row.try_get("trading_days")?,
            first_trade_date: first.as_deref().map(parse_date).transpose()?,
            last_trade_date: last.as_deref().map(parse_date).transpose()?,
        })
    }

    /// The most recent distinct trade dates, newest first.
    pub async fn last_trading_dates(&self, limit: u32) -> Result<Vec<NaiveDate>, StoreError> {
        let dates: Vec<String> = sqlx::query_scalar(
            r"
            SELECT DISTINCT trade_date FROM trading_results
            ORDER BY trade_date DESC
            LIMIT ?
            ",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        dates.iter().map(|d| parse_date(d)).collect()
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn find_by_key(
        &self,
        exchange_product_id: &str,
        trade_date: NaiveDate,
    ) -> Result<Option<TradeRecord>, StoreError> {
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM trading_results \
             WHERE exchange_product_id = ? AND trade_date = ?"
        );
        let row = sqlx::query(&sql)
            .bind(exchange_product_id)
            .bind(trade_date.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(record_from_row).transpose()
    }

    async fn insert_batch(&self, records: &[TradeRecord]) -> Result<usize, StoreError> {
        if records.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        let mut inserted = 0usize;
        for record in records {
            let result = sqlx::query(
                r"
                INSERT INTO trading_results
                    (exchange_product_id, exchange_product_name, oil_id, delivery_basis_id,
                     delivery_basis_name, delivery_type_id, volume, total, count, trade_date)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT (exchange_product_id, trade_date) DO NOTHING
                ",
            )
            .bind(&record.exchange_product_id)
            .bind(&record.exchange_product_name)
            .bind(&record.oil_id)
            .bind(&record.delivery_basis_id)
            .bind(&record.delivery_basis_name)
            .bind(&record.delivery_type_id)
            .bind(record.volume.map(|d| d.to_string()))
            .bind(record.total.map(|d| d.to_string()))
            .bind(record.count)
            .bind(record.trade_date.to_string())
            .execute(&mut *tx)
            .await?;

            inserted += result.rows_affected() as usize;
        }
        tx.commit().await?;

        debug!(
            batch = records.len(),
            inserted,
            "committed trade records"
        );
        Ok(inserted)
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

fn parse_date(s: &str) -> Result<NaiveDate, StoreError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| StoreError::Corrupt(format!("trade_date '{s}': {e}")))
}

fn parse_decimal(s: Option<String>, column: &str) -> Result<Option<Decimal>, StoreError> {
    s.map(|v| {
        Decimal::from_str(&v).map_err(|e| StoreError::Corrupt(format!("{column} '{v}': {e}")))
    })
    .transpose()
}

fn record_from_row(row: &SqliteRow) -> Result<TradeRecord, StoreError> {
    let trade_date: String = row.try_get("trade_date")?;
    Ok(TradeRecord {
        exchange_product_id: row.try_get("exchange_product_id")?,
        exchange_product_name: row.try_get("exchange_product_name")?,
        oil_id: row.try_get("oil_id")?,
        delivery_basis_id: row.try_get("delivery_basis_id")?,
        delivery_basis_name: row.try_get("delivery_basis_name")?,
        delivery_type_id: row.try_get("delivery_type_id")?,
        volume: parse_decimal(row.try_get("volume")?, "volume")?,
        total: parse_decimal(row.try_get("total")?, "total")?,
        count: row.try_get("count")?,
        trade_date: parse_date(&trade_date)?,
    })
}
