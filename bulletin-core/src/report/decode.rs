//! Trade-summary decoding.
//!
//! Layout of a bulletin's `TRADE_SUMMARY` section, top to bottom:
//! a `Дата торгов: DD.MM.YYYY` line, then for each unit of measure a
//! `Единица измерения: ...` line followed by a header row and data rows.
//! Only the metric-ton table is read. Its header row is the first row after
//! the metric-ton line that mentions the price column; the last two rows of
//! the section are totals.

use super::coerce::{to_count, to_decimal};
use super::columns::{ColumnMap, ReportField, COLUMN_PATTERNS};
use super::reader::ReportReader;
use super::sheet::{Cell, Sheet};
use crate::domain::TradeRecord;
use chrono::NaiveDate;
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;
use thiserror::Error;
use tracing::{debug, warn};

pub const TRADE_SECTION: &str = "TRADE_SUMMARY";
pub const DATE_MARKER: &str = "Дата торгов:";
pub const METRIC_TON_MARKER: &str = "Единица измерения: Метрическая тонна";
pub const PRICE_HEADER_MARKER: &str = "Цена (за единицу измерения), руб.";
pub const FOOTER_ROWS: usize = 2;

/// Why a bulletin could not be decoded. The document is skipped as a whole.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("unreadable report: {0}")]
    Unreadable(String),

    #[error("section '{section}' missing")]
    SectionMissing { section: String },

    #[error("trade date not found")]
    DateNotFound,

    #[error("metric-ton table not found")]
    TableNotFound,

    #[error("missing columns: {}", join_fields(.missing))]
    MissingColumns { missing: Vec<ReportField> },

    #[error("missing output columns: {}", join_fields(.missing))]
    MissingOutputColumns { missing: Vec<ReportField> },
}

fn join_fields(fields: &[ReportField]) -> String {
    fields
        .iter()
        .map(|f| f.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Output of a successful decode.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedReport {
    /// Date printed in the document.
    pub document_date: NaiveDate,
    pub records: Vec<TradeRecord>,
    /// Data rows dropped by the count / product / basis filters.
    pub dropped_rows: usize,
}

/// Read the trade section of `path` and decode it.
pub fn decode_file(
    reader: &dyn ReportReader,
    path: &Path,
    trade_date: NaiveDate,
) -> Result<DecodedReport, DecodeError> {
    let sheet = reader
        .read_section(path, TRADE_SECTION)?
        .ok_or_else(|| DecodeError::SectionMissing {
            section: TRADE_SECTION.to_string(),
        })?;
    decode_sheet(&sheet, trade_date)
}

/// Decode an in-memory trade section.
///
/// Records are stamped with `trade_date` (the date the bulletin was listed
/// under); a different date inside the document is only logged.
pub fn decode_sheet(sheet: &Sheet, trade_date: NaiveDate) -> Result<DecodedReport, DecodeError> {
    let document_date = find_trade_date(sheet)?;
    if document_date != trade_date {
        warn!(
            listed = %trade_date,
            printed = %document_date,
            "bulletin date differs from listing date"
        );
    }

    let header_row = find_table_header(sheet)?;

    let columns = ColumnMap::from_header(sheet, header_row);
    if columns.matched_columns + 1 < COLUMN_PATTERNS.len() {
        return Err(DecodeError::MissingColumns {
            missing: columns.missing(),
        });
    }
    let missing = columns.missing();
    if !missing.is_empty() {
        return Err(DecodeError::MissingOutputColumns { missing });
    }

    let first = header_row + 1;
    let end = sheet.rows.len().saturating_sub(FOOTER_ROWS).max(first);

    let mut records = Vec::with_capacity(end - first);
    let mut dropped_rows = 0;
    for row in first..end {
        match decode_row(sheet, &columns, row, trade_date) {
            Some(record) => records.push(record),
            None => dropped_rows += 1,
        }
    }

    debug!(
        records = records.len(),
        dropped_rows,
        header_row,
        "decoded trade table"
    );

    Ok(DecodedReport {
        document_date,
        records,
        dropped_rows,
    })
}

fn date_regex() -> &'static Regex {
    static DATE_RE: OnceLock<Regex> = OnceLock::new();
    DATE_RE.get_or_init(|| Regex::new(r"\d{2}\.\d{2}\.\d{4}").expect("static regex"))
}

/// First row mentioning the date marker; the date must be on that row.
fn find_trade_date(sheet: &Sheet) -> Result<NaiveDate, DecodeError> {

    let row_text = (0..sheet.rows.len())
        .map(|row| sheet.row_text(row))
        .find(|text| text.contains(DATE_MARKER))
        .ok_or(DecodeError::DateNotFound)?;

    date_regex()
        .find(&row_text)
        .and_then(|m| NaiveDate::parse_from_str(m.as_str(), "%d.%m.%Y").ok())
        .ok_or(DecodeError::DateNotFound)
}

/// Header row of the metric-ton table.
fn find_table_header(sheet: &Sheet) -> Result<usize, DecodeError> {
    let mut metric_ton_seen = false;
    for row in 0..sheet.rows.len() {
        let text = sheet.row_text(row);
        if text.contains(METRIC_TON_MARKER) {
            metric_ton_seen = true;
            continue;
        }
        if metric_ton_seen && text.contains(PRICE_HEADER_MARKER) {
            return Ok(row);
        }
    }
    Err(DecodeError::TableNotFound)
}

fn decode_row(
    sheet: &Sheet,
    columns: &ColumnMap,
    row: usize,
    trade_date: NaiveDate,
) -> Option<TradeRecord> {
    let count = to_count(columns.get(sheet, row, ReportField::Count)).filter(|c| *c > 0)?;
    let product_id = columns
        .get(sheet, row, ReportField::ExchangeProductId)
        .normalized()?;
    let basis_name = columns
        .get(sheet, row, ReportField::DeliveryBasisName)
        .normalized()?;
    let product_name = columns
        .get(sheet, row, ReportField::ExchangeProductName)
        .normalized()
        .unwrap_or_default();

    Some(TradeRecord::new(
        product_id,
        product_name,
        basis_name,
        to_decimal(columns.get(sheet, row, ReportField::Volume)),
        to_decimal(columns.get(sheet, row, ReportField::Total)),
        count,
        trade_date,
    ))
}
