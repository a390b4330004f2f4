use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A bulletin document discovered on a listing page.
///
/// Produced by the link collector, consumed once by the downloader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulletinLink {
    pub url: String,
    pub trade_date: NaiveDate,
    pub filename: String,
}

impl BulletinLink {
    /// Build a link; the local filename is derived from the trade date.
    pub fn new(url: impl Into<String>, trade_date: NaiveDate) -> Self {
        Self {
            url: url.into(),
            trade_date,
            filename: Self::filename_for(trade_date),
        }
    }

    /// `oil_products_YYYYMMDD.xls`
    pub fn filename_for(trade_date: NaiveDate) -> String {
        format!("oil_products_{}.xls", trade_date.format("%Y%m%d"))
    }
}
