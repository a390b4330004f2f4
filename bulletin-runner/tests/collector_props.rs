//! Property tests for link collection.
//!
//! For any newest-first listing split across pages and any cutoff, the
//! collector returns exactly the bulletins on or after the cutoff, in
//! listing order, and never requests a page past the one where the cutoff
//! was crossed.

use async_trait::async_trait;
use bulletin_core::fixtures::listing_page;
use bulletin_core::{DataError, PageFetcher};
use bulletin_runner::{LinkCollector, RunContext};
use chrono::{Duration, NaiveDate};
use proptest::prelude::*;
use std::sync::Mutex;
use url::Url;

struct Listing {
    base: Url,
    pages: Vec<String>,
    requested: Mutex<Vec<u32>>,
}

#[async_trait]
impl PageFetcher for Listing {
    fn name(&self) -> &str {
        "listing"
    }

    fn base_url(&self) -> &Url {
        &self.base
    }

    async fn fetch_page(&self, page: u32) -> Result<String, DataError> {
        self.requested.lock().unwrap().push(page);
        Ok(self
            .pages
            .get(page as usize - 1)
            .cloned()
            .unwrap_or_else(|| listing_page(&[])))
    }
}

// ── Strategies ───────────────────────────────────────────────────────

/// Strictly decreasing dates, grouped into non-empty pages.
fn arb_listing() -> impl Strategy<Value = Vec<Vec<NaiveDate>>> {
    prop::collection::vec(prop::collection::vec(1i64..4, 1..6), 0..6).prop_map(|pages| {
        let mut date = NaiveDate::from_ymd_opt(2025, 6, 30).unwrap();
        pages
            .into_iter()
            .map(|gaps| {
                gaps.into_iter()
                    .map(|gap| {
                        date -= Duration::days(gap);
                        date
                    })
                    .collect()
            })
            .collect()
    })
}

fn arb_cutoff() -> impl Strategy<Value = NaiveDate> {
    (0i64..120).prop_map(|back| NaiveDate::from_ymd_opt(2025, 6, 30).unwrap() - Duration::days(back))
}

fn collect(pages: &[Vec<NaiveDate>], cutoff: NaiveDate) -> (Vec<NaiveDate>, Vec<u32>) {
    let fetcher = Listing {
        base: Url::parse("https://spimex.com").unwrap(),
        pages: pages.iter().map(|dates| listing_page(dates)).collect(),
        requested: Mutex::new(Vec::new()),
    };
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    let ctx = RunContext::new(cutoff);
    let links = runtime.block_on(LinkCollector::new(&fetcher).collect(&ctx));
    let requested = fetcher.requested.lock().unwrap().clone();
    (links.into_iter().map(|l| l.trade_date).collect(), requested)
}

proptest! {
    #[test]
    fn collects_exactly_the_dates_on_or_after_cutoff(
        pages in arb_listing(),
        cutoff in arb_cutoff(),
    ) {
        let (dates, _) = collect(&pages, cutoff);
        let expected: Vec<NaiveDate> = pages
            .iter()
            .flatten()
            .copied()
            .filter(|&d| d >= cutoff)
            .collect();
        prop_assert_eq!(dates, expected);
    }

    #[test]
    fn stops_at_the_page_that_crosses_the_cutoff(
        pages in arb_listing(),
        cutoff in arb_cutoff(),
    ) {
        let (_, requested) = collect(&pages, cutoff);
        let crossing = pages
            .iter()
            .position(|page| page.last().is_some_and(|&d| d < cutoff));
        let last_requested = requested.last().copied().unwrap_or(0) as usize;
        match crossing {
            Some(index) => prop_assert_eq!(last_requested, index + 1),
            // every page kept: the empty page after the last one ends it
            None => prop_assert_eq!(last_requested, pages.len() + 1),
        }
    }
}
