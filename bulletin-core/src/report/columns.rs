//! Column-label matching for the trade table header.

use super::sheet::{Cell, Sheet, EMPTY_CELL};
use std::collections::BTreeMap;

/// Canonical fields read from the trade table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ReportField {
    ExchangeProductId,
    ExchangeProductName,
    DeliveryBasisName,
    Volume,
    Total,
    Count,
}

impl ReportField {
    pub const ALL: [ReportField; 6] = [
        ReportField::ExchangeProductId,
        ReportField::ExchangeProductName,
        ReportField::DeliveryBasisName,
        ReportField::Volume,
        ReportField::Total,
        ReportField::Count,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ReportField::ExchangeProductId => "exchange_product_id",
            ReportField::ExchangeProductName => "exchange_product_name",
            ReportField::DeliveryBasisName => "delivery_basis_name",
            ReportField::Volume => "volume",
            ReportField::Total => "total",
            ReportField::Count => "count",
        }
    }
}

impl std::fmt::Display for ReportField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Label substrings and the field they map to. First match wins; the
/// misspelled `Обьем` variant appears in some bulletins.
pub const COLUMN_PATTERNS: [(&str, ReportField); 7] = [
    ("Код Инструмента", ReportField::ExchangeProductId),
    ("Наименование Инструмента", ReportField::ExchangeProductName),
    ("Базис поставки", ReportField::DeliveryBasisName),
    ("Объем Договоров в единицах измерения", ReportField::Volume),
    ("Объем Договоров, руб.", ReportField::Total),
    ("Обьем Договоров, руб.", ReportField::Total),
    ("Количество Договоров, шт.", ReportField::Count),
];

/// Result of matching a header row against [`COLUMN_PATTERNS`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMap {
    /// Field → column index (the leftmost column when several match).
    pub fields: BTreeMap<ReportField, usize>,
    /// How many header columns matched any pattern.
    pub matched_columns: usize,
}

impl ColumnMap {
    /// Map each header cell of `header_row` to the field whose pattern it contains.
    pub fn from_header(sheet: &Sheet, header_row: usize) -> Self {
        let mut map = ColumnMap::default();
        let Some(cells) = sheet.rows.get(header_row) else {
            return map;
        };

        for (col, cell) in cells.iter().enumerate() {
            let Some(label) = cell.normalized() else {
                continue;
            };
            if let Some(field) = match_label(&label) {
                map.matched_columns += 1;
                map.fields.entry(field).or_insert(col);
            }
        }
        map
    }

    /// Column index of `field`, if mapped.
    pub fn column(&self, field: ReportField) -> Option<usize> {
        self.fields.get(&field).copied()
    }

    /// Fields with no matching column.
    pub fn missing(&self) -> Vec<ReportField> {
        ReportField::ALL
            .into_iter()
            .filter(|f| !self.fields.contains_key(f))
            .collect()
    }

    /// Cell of `field` in `row`, empty when the field is unmapped.
    pub fn get<'a>(&self, sheet: &'a Sheet, row: usize, field: ReportField) -> &'a Cell {
        match self.column(field) {
            Some(col) => sheet.cell(row, col),
            None => &EMPTY_CELL,
        }
    }
}

/// First field whose pattern occurs in `label`.
pub fn match_label(label: &str) -> Option<ReportField> {
    COLUMN_PATTERNS
        .iter()
        .find(|(pattern, _)| label.contains(pattern))
        .map(|(_, field)| *field)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_labels_by_substring() {
        assert_eq!(
            match_label("Код Инструмента"),
            Some(ReportField::ExchangeProductId)
        );
        assert_eq!(
            match_label("Объем Договоров в единицах измерения"),
            Some(ReportField::Volume)
        );
        assert_eq!(match_label("Обьем Договоров, руб."), Some(ReportField::Total));
        assert_eq!(match_label("Цена (за единицу измерения), руб."), None);
    }

    #[test]
    fn header_with_newlines_maps_after_normalization() {
        let sheet = Sheet::new(
            "TRADE_SUMMARY",
            vec![vec![
                Cell::Empty,
                Cell::text("Код\nИнструмента"),
                Cell::text("Количество\nДоговоров,\nшт."),
            ]],
        );
        let map = ColumnMap::from_header(&sheet, 0);
        assert_eq!(map.column(ReportField::ExchangeProductId), Some(1));
        assert_eq!(map.column(ReportField::Count), Some(2));
        assert_eq!(map.matched_columns, 2);
        assert_eq!(map.missing().len(), 4);
    }

    #[test]
    fn first_matching_column_wins() {
        let sheet = Sheet::new(
            "TRADE_SUMMARY",
            vec![vec![
                Cell::text("Объем Договоров, руб."),
                Cell::text("Обьем Договоров, руб."),
            ]],
        );
        let map = ColumnMap::from_header(&sheet, 0);
        assert_eq!(map.column(ReportField::Total), Some(0));
        assert_eq!(map.matched_columns, 2);
    }
}
