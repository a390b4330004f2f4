//! Workbook access behind a narrow trait.

use super::decode::DecodeError;
use super::sheet::{Cell, Sheet};
use calamine::{open_workbook_auto, Data, Reader};
use std::path::Path;

/// Reads one named section (worksheet) of a report file.
pub trait ReportReader: Send + Sync {
    /// `Ok(None)` when the workbook has no section called `name`.
    fn read_section(&self, path: &Path, name: &str) -> Result<Option<Sheet>, DecodeError>;
}

/// `.xls` / `.xlsx` reader backed by calamine.
#[derive(Debug, Default, Clone, Copy)]
pub struct CalamineReader;

impl ReportReader for CalamineReader {
    fn read_section(&self, path: &Path, name: &str) -> Result<Option<Sheet>, DecodeError> {
        let mut workbook =
            open_workbook_auto(path).map_err(|e| DecodeError::Unreadable(e.to_string()))?;

        if !workbook.sheet_names().iter().any(|s| s == name) {
            return Ok(None);
        }

        let range = workbook
            .worksheet_range(name)
            .map_err(|e| DecodeError::Unreadable(e.to_string()))?;

        let rows = range
            .rows()
            .map(|row| row.iter().map(to_cell).collect())
            .collect();

        Ok(Some(Sheet::new(name, rows)))
    }
}

fn to_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Float(f) => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Bool(b) => Cell::Text(b.to_string()),
        Data::DateTime(dt) => Cell::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
        Data::Error(_) => Cell::Empty,
    }
}
