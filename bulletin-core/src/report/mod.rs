//! Trade-summary report decoding.
//!
//! A bulletin workbook is read into an in-memory [`Sheet`] by a
//! [`ReportReader`]; [`decode_sheet`] then locates the trade date and the
//! metric-ton table, maps columns by label and normalizes rows into
//! [`TradeRecord`](crate::domain::TradeRecord)s.

pub mod coerce;
pub mod columns;
pub mod decode;
pub mod reader;
pub mod sheet;

pub use decode::{decode_file, decode_sheet, DecodeError, DecodedReport, TRADE_SECTION};
pub use reader::{CalamineReader, ReportReader};
pub use sheet::{Cell, Sheet};
