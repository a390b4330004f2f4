//! Link collection: walk listing pages newest-first until the cutoff.

use crate::context::RunContext;
use bulletin_core::data::{ListingParser, PageFetcher};
use bulletin_core::BulletinLink;
use std::collections::HashSet;
use tracing::{debug, info, warn};

pub struct LinkCollector<'a> {
    fetcher: &'a dyn PageFetcher,
    parser: ListingParser,
    max_pages: Option<u32>,
}

impl<'a> LinkCollector<'a> {
    /// A collector over `fetcher` with no page limit.
    pub fn new(fetcher: &'a dyn PageFetcher) -> Self {
        Self {
            fetcher,
            parser: ListingParser::new(),
            max_pages: None,
        }
    }

    /// Stop after `max_pages` listing pages (`None` walks until the cutoff).
    pub fn with_max_pages(mut self, max_pages: Option<u32>) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Gather bulletin links with `trade_date >= cutoff`, in listing order.
    /// One link per trade date is kept (the first seen), since the local
    /// filename is derived from the date.
    ///
    /// Pagination ends on an empty page, on a page whose last link is older
    /// than the cutoff, on a fetch failure (already retried by the fetcher)
    /// or when shutdown is requested. Whatever was gathered is returned.
    pub async fn collect(&self, ctx: &RunContext) -> Vec<BulletinLink> {
        let cutoff = ctx.cutoff();
        let mut links = Vec::new();
        let mut seen_dates = HashSet::new();
        let mut page = 1u32;

        loop {
            if ctx.is_shutdown() {
                info!(page, "shutdown requested; collection stopped");
                break;
            }
            if self.max_pages.is_some_and(|max| page > max) {
                info!(max_pages = ?self.max_pages, "page limit reached");
                break;
            }
            ctx.set_current_page(page);

            let html = match self.fetcher.fetch_page(page).await {
                Ok(html) => html,
                Err(e) => {
                    warn!(
                        fetcher = self.fetcher.name(),
                        page,
                        error = %e,
                        "listing page unavailable; ending pagination"
                    );
                    break;
                }
            };

            let page_links = self.parser.extract_links(&html, self.fetcher.base_url());
            let Some(oldest_on_page) = page_links.last().map(|l| l.trade_date) else {
                debug!(page, "listing page has no bulletin links");
                break;
            };

            let before = links.len();
            for link in page_links {
                ctx.note_link_date(link.trade_date);
                if link.trade_date < cutoff {
                    continue;
                }
                if seen_dates.insert(link.trade_date) {
                    links.push(link);
                } else {
                    debug!(url = %link.url, trade_date = %link.trade_date, "second link for a trade date ignored");
                }
            }
            debug!(page, kept = links.len() - before, "listing page parsed");

            if oldest_on_page < cutoff {
                debug!(page, %oldest_on_page, %cutoff, "cutoff reached");
                break;
            }
            page += 1;
        }

        ctx.add_links(links.len());
        info!(links = links.len(), pages = ctx.current_page(), "links collected");
        links
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bulletin_core::fixtures::listing_page;
    use bulletin_core::data::listing::BULLETIN_TITLE;
    use bulletin_core::DataError;
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicU32, Ordering};
    use url::Url;

    struct Pages {
        base: Url,
        pages: Vec<Result<String, ()>>,
        requests: AtomicU32,
    }

    impl Pages {
        fn new(pages: Vec<Result<String, ()>>) -> Self {
            Self {
                base: Url::parse("https://spimex.com").unwrap(),
                pages,
                requests: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl PageFetcher for Pages {
        fn name(&self) -> &str {
            "canned"
        }

        fn base_url(&self) -> &Url {
            &self.base
        }

        async fn fetch_page(&self, page: u32) -> Result<String, DataError> {
            self.requests.fetch_add(1, Ordering::Relaxed);
            match self.pages.get(page as usize - 1) {
                Some(Ok(html)) => Ok(html.clone()),
                Some(Err(())) => Err(DataError::NetworkUnreachable("reset".into())),
                None => Ok(listing_page(&[])),
            }
        }
    }

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, day).unwrap()
    }

    #[tokio::test]
    async fn empty_page_ends_pagination() {
        let fetcher = Pages::new(vec![Ok(listing_page(&[d(3, 10), d(3, 7)]))]);
        let ctx = RunContext::new(d(1, 1));
        let links = LinkCollector::new(&fetcher).collect(&ctx).await;

        assert_eq!(links.len(), 2);
        assert_eq!(fetcher.requests.load(Ordering::Relaxed), 2);
        assert_eq!(ctx.summary().links_found, 2);
    }

    #[tokio::test]
    async fn fetch_failure_keeps_what_was_gathered() {
        let fetcher = Pages::new(vec![Ok(listing_page(&[d(3, 10)])), Err(())]);
        let ctx = RunContext::new(d(1, 1));
        let links = LinkCollector::new(&fetcher).collect(&ctx).await;
        assert_eq!(links.len(), 1);
    }

    #[tokio::test]
    async fn duplicate_urls_are_collapsed() {
        let page = listing_page(&[d(3, 10), d(3, 7)]);
        let fetcher = Pages::new(vec![Ok(page.clone()), Ok(page)]);
        let ctx = RunContext::new(d(1, 1));
        let links = LinkCollector::new(&fetcher).collect(&ctx).await;
        assert_eq!(links.len(), 2);
    }

    #[tokio::test]
    async fn one_link_per_trade_date_is_kept() {
        let html = format!(
            "<html><body>{}{}{}</body></html>",
            bulletin_anchor("/upload/reports/oil_xls/oil_xls_20250310162000.xls?r=1"),
            bulletin_anchor("/upload/reports/oil_xls/oil_xls_20250310170000.xls?r=2"),
            bulletin_anchor("/upload/reports/oil_xls/oil_xls_20250307162000.xls?r=3"),
        );
        let fetcher = Pages::new(vec![Ok(html)]);
        let ctx = RunContext::new(d(1, 1));
        let links = LinkCollector::new(&fetcher).collect(&ctx).await;

        assert_eq!(links.len(), 2);
        assert!(links[0].url.ends_with("?r=1"));
        assert_eq!(links[1].trade_date, d(3, 7));
    }

    fn bulletin_anchor(href: &str) -> String {
        format!(r#"<a href="{href}">{BULLETIN_TITLE}</a>"#)
    }

    #[tokio::test]
    async fn max_pages_bounds_pagination() {
        let fetcher = Pages::new(vec![
            Ok(listing_page(&[d(3, 10)])),
            Ok(listing_page(&[d(3, 7)])),
            Ok(listing_page(&[d(3, 6)])),
        ]);
        let ctx = RunContext::new(d(1, 1));
        let links = LinkCollector::new(&fetcher)
            .with_max_pages(Some(2))
            .collect(&ctx)
            .await;
        assert_eq!(links.len(), 2);
        assert_eq!(fetcher.requests.load(Ordering::Relaxed), 2);
    }

    #[tokio::test]
    async fn shutdown_before_start_fetches_nothing() {
        let fetcher = Pages::new(vec![Ok(listing_page(&[d(3, 10)]))]);
        let ctx = RunContext::new(d(1, 1));
        ctx.request_shutdown();
        assert!(LinkCollector::new(&fetcher).collect(&ctx).await.is_empty());
        assert_eq!(fetcher.requests.load(Ordering::Relaxed), 0);
    }
}
