//! Synthetic bulletins and listing pages for tests and benches.
//!
//! The sheet layout mirrors a real `TRADE_SUMMARY` section: title lines, the
//! trade date, the metric-ton marker, a header row whose labels wrap across
//! lines, a price sub-header, data rows and two totals rows.

use crate::data::listing::BULLETIN_TITLE;
use crate::report::{Cell, Sheet, TRADE_SECTION};
use chrono::NaiveDate;

/// One data row, every cell as the text a bulletin would carry.
#[derive(Debug, Clone)]
pub struct SampleRow {
    pub product_id: String,
    pub product_name: String,
    pub basis_name: String,
    pub volume: String,
    pub total: String,
    pub count: String,
}

/// A valid metric-ton row for `product_id` with `count` contracts.
pub fn sample_row(product_id: &str, count: &str) -> SampleRow {
    SampleRow {
        product_id: product_id.to_string(),
        product_name: "Бензин (АИ-92-К5) по ГОСТ, ст. Уфа".to_string(),
        basis_name: "ст. Уфа".to_string(),
        volume: "60".to_string(),
        total: "3816000".to_string(),
        count: count.to_string(),
    }
}

fn text_or_empty(s: &str) -> Cell {
    if s.is_empty() {
        Cell::Empty
    } else {
        Cell::text(s)
    }
}

/// A complete trade section dated `printed_date` holding `rows`.
pub fn trade_summary_sheet(printed_date: NaiveDate, rows: &[SampleRow]) -> Sheet {
    let mut grid = vec![
        vec![Cell::text("БИРЖЕВОЙ БЮЛЛЕТЕНЬ")],
        vec![Cell::text("Секция Биржи: «Нефтепродукты» АО «Биржа»")],
        vec![Cell::text(format!(
            "Дата торгов: {}",
            printed_date.format("%d.%m.%Y")
        ))],
        vec![],
        vec![Cell::text("Единица измерения: Метрическая тонна")],
        vec![
            Cell::Empty,
            Cell::text("Код\nИнструмента"),
            Cell::text("Наименование\nИнструмента"),
            Cell::text("Базис\nпоставки"),
            Cell::text("Объем\nДоговоров\nв единицах\nизмерения"),
            Cell::text("Объем\nДоговоров,\nруб."),
            Cell::text("Изменение рыночной\nцены к цене\nпредыдущего дня"),
            Cell::text("Цена (за единицу\nизмерения), руб."),
            Cell::text("Количество\nДоговоров,\nшт."),
        ],
        vec![
            Cell::Empty,
            Cell::Empty,
            Cell::Empty,
            Cell::Empty,
            Cell::Empty,
            Cell::Empty,
            Cell::text("Руб."),
            Cell::text("Средневзвешенная"),
            Cell::Empty,
        ],
    ];

    for row in rows {
        grid.push(vec![
            Cell::Empty,
            text_or_empty(&row.product_id),
            text_or_empty(&row.product_name),
            text_or_empty(&row.basis_name),
            text_or_empty(&row.volume),
            text_or_empty(&row.total),
            Cell::text("-"),
            Cell::text("63600"),
            text_or_empty(&row.count),
        ]);
    }

    grid.push(vec![
        Cell::Empty,
        Cell::text("Итого:"),
        Cell::Empty,
        Cell::text("Итого по секции"),
        Cell::text("1200"),
        Cell::text("76320000"),
        Cell::Empty,
        Cell::Empty,
        Cell::text("20"),
    ]);
    grid.push(vec![
        Cell::Empty,
        Cell::text("Итого по секции:"),
        Cell::Empty,
        Cell::text("Итого по секции"),
        Cell::text("1200"),
        Cell::text("76320000"),
        Cell::Empty,
        Cell::Empty,
        Cell::text("20"),
    ]);

    Sheet::new(TRADE_SECTION, grid)
}

/// Listing-page HTML with one bulletin anchor per date, in the given order.
pub fn listing_page(dates: &[NaiveDate]) -> String {
    let mut html = String::from(
        r#"<html><body><a href="/markets/oil_products/trades/results/">Итоги торгов</a><div class="accordeon-inner">"#,
    );
    for date in dates {
        html.push_str(&format!(
            r#"<div class="accordeon-inner__item"><a class="link xls" href="/upload/reports/oil_xls/oil_xls_{}162000.xls?r=4101">{BULLETIN_TITLE}</a></div>"#,
            date.format("%Y%m%d")
        ));
    }
    html.push_str("</div></body></html>");
    html
}
