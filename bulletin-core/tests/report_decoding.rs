//! Report decoding scenarios and properties.
//!
//! Covers:
//! 1. The mixed-count bulletin (12 rows, 3 unusable counts → 9 records)
//! 2. Dash / empty cells normalizing to null
//! 3. Decoder output never holding a non-positive count
//! 4. Decoding the same sheet twice giving identical rows

use bulletin_core::decode_sheet;
use bulletin_core::fixtures::{sample_row, trade_summary_sheet, SampleRow};
use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;

fn trade_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
}

// ── Scenarios ────────────────────────────────────────────────────────

#[test]
fn twelve_rows_with_three_unusable_counts_yield_nine_records() {
    let counts = ["1", "2", "-", "4", "5", "0", "7", "8", "-", "10", "11", "12"];
    let rows: Vec<SampleRow> = counts
        .iter()
        .enumerate()
        .map(|(i, count)| sample_row(&format!("A{:03}UFM060F", i), count))
        .collect();

    let sheet = trade_summary_sheet(trade_date(), &rows);
    let report = decode_sheet(&sheet, trade_date()).unwrap();

    assert_eq!(report.records.len(), 9);
    assert!(report.records.iter().all(|r| r.count > 0));
    let ids: Vec<&str> = report
        .records
        .iter()
        .map(|r| r.exchange_product_id.as_str())
        .collect();
    assert!(!ids.contains(&"A002UFM060F"));
    assert!(!ids.contains(&"A005UFM060F"));
    assert!(!ids.contains(&"A008UFM060F"));
}

#[test]
fn dash_volume_and_total_become_null() {
    let mut row = sample_row("A592UFM060F", "3");
    row.volume = "-".into();
    row.total = String::new();

    let sheet = trade_summary_sheet(trade_date(), &[row]);
    let report = decode_sheet(&sheet, trade_date()).unwrap();

    assert_eq!(report.records.len(), 1);
    assert_eq!(report.records[0].volume, None);
    assert_eq!(report.records[0].total, None);
}

#[test]
fn fractional_values_round_to_two_places() {
    let mut row = sample_row("A592UFM060F", "3");
    row.volume = "60.125".into();
    row.total = "3816000.5".into();

    let sheet = trade_summary_sheet(trade_date(), &[row]);
    let record = &decode_sheet(&sheet, trade_date()).unwrap().records[0];

    assert_eq!(record.volume, Some(Decimal::new(6012, 2)));
    assert_eq!(record.total, Some(Decimal::new(381600050, 2)));
}

#[test]
fn missing_product_name_becomes_empty_string() {
    let mut row = sample_row("A592UFM060F", "3");
    row.product_name = String::new();

    let sheet = trade_summary_sheet(trade_date(), &[row]);
    let record = &decode_sheet(&sheet, trade_date()).unwrap().records[0];
    assert_eq!(record.exchange_product_name, "");
}

// ── Properties ───────────────────────────────────────────────────────

fn arb_numeric_text() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("-".to_string()),
        Just(String::new()),
        Just("н/д".to_string()),
        (0u32..100_000).prop_map(|n| n.to_string()),
        (0u32..100_000, 0u32..100).prop_map(|(a, b)| format!("{a}.{b:02}")),
    ]
}

fn arb_count_text() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("-".to_string()),
        Just(String::new()),
        Just("1.5".to_string()),
        (-5i64..50).prop_map(|n| n.to_string()),
    ]
}

fn arb_rows() -> impl Strategy<Value = Vec<SampleRow>> {
    prop::collection::vec(
        (arb_numeric_text(), arb_numeric_text(), arb_count_text()),
        0..30,
    )
    .prop_map(|cells| {
        cells
            .into_iter()
            .enumerate()
            .map(|(i, (volume, total, count))| {
                let mut row = sample_row(&format!("B{:03}NVY005A", i), &count);
                row.volume = volume;
                row.total = total;
                row
            })
            .collect()
    })
}

proptest! {
    /// Dash and empty cells in volume / total are null, never zero.
    #[test]
    fn dash_or_empty_is_never_zero(rows in arb_rows()) {
        let sheet = trade_summary_sheet(trade_date(), &rows);
        let report = decode_sheet(&sheet, trade_date()).unwrap();

        for record in &report.records {
            let source = rows
                .iter()
                .find(|r| r.product_id == record.exchange_product_id)
                .unwrap();
            if source.volume == "-" || source.volume.is_empty() {
                prop_assert_eq!(record.volume, None);
            }
            if source.total == "-" || source.total.is_empty() {
                prop_assert_eq!(record.total, None);
            }
        }
    }

    /// Only rows with a positive integral count survive.
    #[test]
    fn output_counts_are_positive(rows in arb_rows()) {
        let sheet = trade_summary_sheet(trade_date(), &rows);
        let report = decode_sheet(&sheet, trade_date()).unwrap();

        let expected = rows
            .iter()
            .filter(|r| r.count.parse::<i64>().map(|c| c > 0).unwrap_or(false))
            .count();
        prop_assert_eq!(report.records.len(), expected);
        prop_assert!(report.records.iter().all(|r| r.count > 0));
    }

    /// The same sheet decodes to the same rows every time.
    #[test]
    fn decoding_is_deterministic(rows in arb_rows()) {
        let sheet = trade_summary_sheet(trade_date(), &rows);
        let first = decode_sheet(&sheet, trade_date()).unwrap();
        let second = decode_sheet(&sheet, trade_date()).unwrap();
        prop_assert_eq!(first, second);
    }
}
