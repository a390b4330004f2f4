//! HTTP access to the exchange website.
//!
//! `HttpPageFetcher` pulls listing pages, polling until the result links have
//! rendered and retrying transient failures with exponential backoff.
//! `HttpDocumentSource` streams bulletin files to disk. Both share one
//! circuit breaker so a ban observed by either stops the other.

use super::circuit_breaker::CircuitBreaker;
use super::listing::ListingParser;
use super::provider::{DataError, DocumentSource, PageFetcher};
use crate::domain::BulletinLink;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use url::Url;

/// Longest pause between two attempts of one page request.
pub const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Connection settings for the exchange website.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub base_url: Url,
    pub listing_path: String,
    pub request_timeout: Duration,
    /// Upper bound on waiting for a listing page's links to appear.
    pub page_ready_timeout: Duration,
    pub poll_interval: Duration,
    pub max_retries: u32,
    pub retry_base_delay: Duration,
    pub max_connections: usize,
    pub user_agent: String,
    /// Honour `HTTP_PROXY`/`HTTPS_PROXY` from the environment.
    pub use_env_proxy: bool,
}

impl HttpSettings {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            listing_path: "/markets/oil_products/trades/results/".into(),
            request_timeout: Duration::from_secs(30),
            page_ready_timeout: Duration::from_secs(20),
            poll_interval: Duration::from_secs(2),
            max_retries: 2,
            retry_base_delay: Duration::from_millis(500),
            max_connections: 5,
            user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36".into(),
            use_env_proxy: true,
        }
    }

    fn build_client(&self) -> Result<Client, DataError> {
        let mut builder = Client::builder()
            .timeout(self.request_timeout)
            .pool_max_idle_per_host(self.max_connections)
            .user_agent(self.user_agent.as_str());
        if !self.use_env_proxy {
            builder = builder.no_proxy();
        }
        builder
            .build()
            .map_err(|e| DataError::ClientSetup(e.to_string()))
    }
}

/// Listing pages over plain HTTP.
pub struct HttpPageFetcher {
    client: Client,
    parser: ListingParser,
    settings: HttpSettings,
    circuit_breaker: Arc<CircuitBreaker>,
}

impl HttpPageFetcher {
    pub fn new(settings: HttpSettings, circuit_breaker: Arc<CircuitBreaker>) -> Result<Self, DataError> {
        Ok(Self {
            client: settings.build_client()?,
            parser: ListingParser::new(),
            settings,
            circuit_breaker,
        })
    }

    /// `{base}{listing_path}?page=page-{n}`
    pub fn page_url(&self, page: u32) -> Result<Url, DataError> {
        let mut url = self
            .settings
            .base_url
            .join(&self.settings.listing_path)
            .map_err(|e| DataError::Other(format!("bad listing path: {e}")))?;
        url.set_query(Some(&format!("page=page-{page}")));
        Ok(url)
    }

    /// GET with retry, backoff and circuit-breaker bookkeeping.
    async fn get_with_retry(&self, url: &Url) -> Result<String, DataError> {
        let mut last_error = None;

        for attempt in 0..=self.settings.max_retries {
            if attempt > 0 {
                let delay = backoff_delay(self.settings.retry_base_delay, attempt);
                tokio::time::sleep(delay).await;
            }

            if !self.circuit_breaker.is_allowed() {
                return Err(blocked(&self.circuit_breaker));
            }

            match self.client.get(url.clone()).send().await {
                Ok(resp) => {
                    let status = resp.status();

                    if status == StatusCode::FORBIDDEN {
                        self.circuit_breaker.trip();
                        return Err(blocked(&self.circuit_breaker));
                    }

                    if status == StatusCode::TOO_MANY_REQUESTS {
                        self.circuit_breaker.record_failure();
                        let retry_after = resp
                            .headers()
                            .get("retry-after")
                            .and_then(|v| v.to_str().ok())
                            .and_then(|v| v.parse::<u64>().ok())
                            .unwrap_or(60);
                        last_error = Some(DataError::RateLimited {
                            retry_after_secs: retry_after,
                        });
                        continue;
                    }

                    if !status.is_success() {
                        self.circuit_breaker.record_failure();
                        last_error = Some(DataError::HttpStatus {
                            status: status.as_u16(),
                            url: url.to_string(),
                        });
                        continue;
                    }

                    let body = resp
                        .text()
                        .await
                        .map_err(|e| DataError::NetworkUnreachable(e.to_string()))?;
                    self.circuit_breaker.record_success();
                    return Ok(body);
                }
                Err(e) => {
                    self.circuit_breaker.record_failure();
                    if e.is_connect() || e.is_timeout() {
                        warn!(%url, attempt, error = %e, "listing request failed");
                        last_error = Some(DataError::NetworkUnreachable(e.to_string()));
                        continue;
                    }
                    return Err(DataError::NetworkUnreachable(e.to_string()));
                }
            }
        }

        Err(last_error.unwrap_or_else(|| DataError::Other("max retries exceeded".into())))
    }

    /// Re-request the page until result links are present.
    async fn poll_until_ready(&self, page: u32, url: &Url) -> Result<String, DataError> {
        loop {
            let html = self.get_with_retry(url).await?;
            if self.parser.has_results(&html) {
                return Ok(html);
            }
            debug!(page, "listing not rendered yet, polling again");
            tokio::time::sleep(self.settings.poll_interval).await;
        }
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    fn name(&self) -> &str {
        "http_listing"
    }

    fn base_url(&self) -> &Url {
        &self.settings.base_url
    }

    async fn fetch_page(&self, page: u32) -> Result<String, DataError> {
        let url = self.page_url(page)?;
        debug!(page, %url, "fetching listing page");
        let wait = self.settings.page_ready_timeout;
        match tokio::time::timeout(wait, self.poll_until_ready(page, &url)).await {
            Ok(result) => result,
            Err(_) => Err(DataError::ContentNotReady {
                page,
                waited_secs: wait.as_secs(),
            }),
        }
    }
}

/// Bulletin files over plain HTTP.
pub struct HttpDocumentSource {
    client: Client,
    circuit_breaker: Arc<CircuitBreaker>,
}

impl HttpDocumentSource {
    pub fn new(settings: &HttpSettings, circuit_breaker: Arc<CircuitBreaker>) -> Result<Self, DataError> {
        Ok(Self {
            client: settings.build_client()?,
            circuit_breaker,
        })
    }
}

#[async_trait]
impl DocumentSource for HttpDocumentSource {
    async fn fetch_to(&self, link: &BulletinLink, dest: &Path) -> Result<u64, DataError> {
        if !self.circuit_breaker.is_allowed() {
            return Err(blocked(&self.circuit_breaker));
        }

        let mut resp = self.client.get(&link.url).send().await.map_err(|e| {
            self.circuit_breaker.record_failure();
            DataError::NetworkUnreachable(e.to_string())
        })?;

        let status = resp.status();
        if status == StatusCode::FORBIDDEN {
            self.circuit_breaker.trip();
            return Err(blocked(&self.circuit_breaker));
        }
        if !status.is_success() {
            self.circuit_breaker.record_failure();
            return Err(DataError::HttpStatus {
                status: status.as_u16(),
                url: link.url.clone(),
            });
        }

        let mut file = tokio::fs::File::create(dest).await?;
        let mut written = 0u64;
        while let Some(chunk) = resp
            .chunk()
            .await
            .map_err(|e| DataError::NetworkUnreachable(e.to_string()))?
        {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        self.circuit_breaker.record_success();
        Ok(written)
    }
}

/// `base * 2^(attempt - 1)`, capped at [`MAX_BACKOFF`].
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
    base.checked_mul(factor).unwrap_or(MAX_BACKOFF).min(MAX_BACKOFF)
}

fn blocked(cb: &CircuitBreaker) -> DataError {
    DataError::OriginBlocked {
        remaining_secs: cb.remaining_cooldown().as_secs(),
    }
}
