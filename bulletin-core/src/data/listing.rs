//! Listing-page parsing: finds trade bulletin links and their dates.

use crate::domain::BulletinLink;
use chrono::NaiveDate;
use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

/// Anchor text identifying an oil-products trade bulletin.
pub const BULLETIN_TITLE: &str = "Бюллетень по итогам торгов в Секции «Нефтепродукты»";

/// Present once the listing has rendered its results.
pub const RESULTS_LINK_SELECTOR: &str = "a[href*='trades/results']";

/// Extracts [`BulletinLink`]s from listing-page HTML.
pub struct ListingParser {
    anchors: Selector,
    results: Selector,
    date_in_href: Regex,
}

impl ListingParser {
    pub fn new() -> Self {
        Self {
            anchors: Selector::parse("a[href]").expect("static selector"),
            results: Selector::parse(RESULTS_LINK_SELECTOR).expect("static selector"),
            date_in_href: Regex::new(r"(\d{8})").expect("static regex"),
        }
    }

    /// Whether the page has finished rendering its result links.
    pub fn has_results(&self, html: &str) -> bool {
        Html::parse_document(html).select(&self.results).next().is_some()
    }

    /// Bulletin links in page order.
    ///
    /// An anchor qualifies when its text mentions the bulletin title and its
    /// href carries an 8-digit `YYYYMMDD` date. Relative hrefs are resolved
    /// against `base`.
    pub fn extract_links(&self, html: &str, base: &Url) -> Vec<BulletinLink> {
        let doc = Html::parse_document(html);
        let mut links = Vec::new();

        for anchor in doc.select(&self.anchors) {
            let text: String = anchor.text().collect();
            if !text.contains(BULLETIN_TITLE) {
                continue;
            }
            let Some(href) = anchor.value().attr("href") else {
                continue;
            };
            let Some(trade_date) = self.href_date(href) else {
                continue;
            };
            let Ok(url) = base.join(href) else {
                continue;
            };
            links.push(BulletinLink::new(url.to_string(), trade_date));
        }

        links
    }

    fn href_date(&self, href: &str) -> Option<NaiveDate> {
        let digits = self.date_in_href.captures(href)?.get(1)?.as_str();
        NaiveDate::parse_from_str(digits, "%Y%m%d").ok()
    }
}

impl Default for ListingParser {
    fn default() -> Self {
        Self::new()
    }
}
