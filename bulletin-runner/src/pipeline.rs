//! Pipeline orchestration: collect links, then download, decode and ingest
//! each one under a bounded number of concurrent tasks.
//!
//! Stages: INIT (`Pipeline::connect`) → COLLECTING → per-link tasks
//! (DOWNLOADING → DECODING → INGESTING) → DRAINING → SHUTDOWN.
//! `max_in_flight = 1` is the sequential mode: permits are taken in listing
//! order, so links are processed one by one in that order.

use crate::collector::LinkCollector;
use crate::config::{ConfigError, PipelineConfig};
use crate::context::{RunContext, RunSummary, ShutdownHandle};
use crate::downloader::Downloader;
use crate::ingest::{DedupIngestor, IngestOutcome};
use bulletin_core::data::{CircuitBreaker, HttpDocumentSource, HttpPageFetcher};
use bulletin_core::report::CalamineReader;
use bulletin_core::{
    decode_file, BulletinLink, DataError, DecodeError, DocumentSource, PageFetcher, RecordStore,
    ReportReader, SqliteRecordStore, StoreError,
};
use chrono::NaiveDate;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Errors that stop a pipeline before it runs.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("client setup error: {0}")]
    Client(#[from] DataError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Why a single link was skipped.
#[derive(Debug, Error)]
enum LinkError {
    #[error("download failed: {0}")]
    Download(#[from] DataError),
    #[error("decode failed: {0}")]
    Decode(#[from] DecodeError),
    #[error("ingest failed: {0}")]
    Store(#[from] StoreError),
    #[error("decode task failed: {0}")]
    Task(String),
}

/// Scheduling knobs.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOptions {
    pub max_in_flight: usize,
    pub launch_interval: Duration,
    pub max_pages: Option<u32>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            max_in_flight: 5,
            launch_interval: Duration::from_millis(500),
            max_pages: None,
        }
    }
}

impl PipelineOptions {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            max_in_flight: config.download.max_in_flight,
            launch_interval: config.launch_interval(),
            max_pages: config.source.max_pages,
        }
    }
}

/// Everything a per-link task needs.
struct LinkWorker {
    downloader: Downloader,
    reader: Arc<dyn ReportReader>,
    ingestor: DedupIngestor,
}

impl LinkWorker {
    async fn process(&self, ctx: &RunContext, link: BulletinLink) {
        if ctx.is_shutdown() {
            debug!(url = %link.url, "shutdown requested; link not started");
            return;
        }

        match self.handle(&link).await {
            Ok(outcome) => {
                ctx.document_processed();
                ctx.add_records(outcome.inserted);
                info!(
                    trade_date = %link.trade_date,
                    inserted = outcome.inserted,
                    skipped = outcome.skipped,
                    "bulletin ingested"
                );
            }
            Err(e @ LinkError::Store(_)) => {
                ctx.document_failed();
                error!(url = %link.url, trade_date = %link.trade_date, error = %e, "bulletin rolled back");
            }
            Err(e) => {
                ctx.document_failed();
                warn!(url = %link.url, trade_date = %link.trade_date, error = %e, "bulletin skipped");
            }
        }
    }

    async fn handle(&self, link: &BulletinLink) -> Result<IngestOutcome, LinkError> {
        let document = self.downloader.download(link).await?;

        let reader = Arc::clone(&self.reader);
        let path = document.path().to_path_buf();
        let trade_date = document.trade_date();
        let report = tokio::task::spawn_blocking(move || {
            decode_file(reader.as_ref(), &path, trade_date)
        })
        .await
        .map_err(|e| LinkError::Task(e.to_string()))??;
        drop(document);

        debug!(
            trade_date = %link.trade_date,
            records = report.records.len(),
            dropped_rows = report.dropped_rows,
            "bulletin decoded"
        );

        Ok(self.ingestor.ingest(report.records).await?)
    }
}

pub struct Pipeline {
    fetcher: Arc<dyn PageFetcher>,
    store: Arc<dyn RecordStore>,
    worker: Arc<LinkWorker>,
    options: PipelineOptions,
    shutdown: ShutdownHandle,
}

impl Pipeline {
    /// Assemble a pipeline from already-built collaborators.
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        source: Arc<dyn DocumentSource>,
        reader: Arc<dyn ReportReader>,
        store: Arc<dyn RecordStore>,
        download_dir: impl Into<PathBuf>,
        options: PipelineOptions,
    ) -> Self {
        let worker = LinkWorker {
            downloader: Downloader::new(source, download_dir),
            reader,
            ingestor: DedupIngestor::new(Arc::clone(&store)),
        };
        Self {
            fetcher,
            store,
            worker: Arc::new(worker),
            options,
            shutdown: ShutdownHandle::new(),
        }
    }

    /// INIT: validate the config, build the HTTP clients and open the store.
    pub async fn connect(config: &PipelineConfig) -> Result<Self, PipelineError> {
        config.validate()?;

        let breaker = Arc::new(CircuitBreaker::new(
            config.circuit_breaker_cooldown(),
            config.source.circuit_breaker_threshold,
        ));
        let settings = config.http_settings()?;
        let source = HttpDocumentSource::new(&settings, Arc::clone(&breaker))?;
        let fetcher = HttpPageFetcher::new(settings, breaker)?;
        let store = SqliteRecordStore::connect(
            &config.store.database_url,
            config.store.max_connections,
        )
        .await?;

        Ok(Self::new(
            Arc::new(fetcher),
            Arc::new(source),
            Arc::new(CalamineReader),
            Arc::new(store),
            config.download.dir.clone(),
            PipelineOptions::from_config(config),
        ))
    }

    /// Use an externally owned shutdown flag.
    pub fn with_shutdown(mut self, shutdown: ShutdownHandle) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// A handle that stops scheduling new links when requested.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Run once for `cutoff`. Per-link failures are counted, not returned.
    pub async fn run(self, cutoff: NaiveDate) -> RunSummary {
        let ctx = Arc::new(RunContext::with_shutdown(cutoff, self.shutdown.clone()));
        let max_in_flight = self.options.max_in_flight.max(1);
        info!(%cutoff, max_in_flight, "pipeline starting");

        let links = LinkCollector::new(self.fetcher.as_ref())
            .with_max_pages(self.options.max_pages)
            .collect(&ctx)
            .await;

        let semaphore = Arc::new(Semaphore::new(max_in_flight));
        let mut tasks = JoinSet::new();

        for (i, link) in links.into_iter().enumerate() {
            if link.trade_date < cutoff {
                info!(trade_date = %link.trade_date, "link older than cutoff; scheduling stopped");
                break;
            }
            if i > 0 && !self.options.launch_interval.is_zero() {
                tokio::time::sleep(self.options.launch_interval).await;
            }

            let permit = match Arc::clone(&semaphore).acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };
            if ctx.is_shutdown() {
                info!("shutdown requested; scheduling stopped");
                break;
            }

            let worker = Arc::clone(&self.worker);
            let ctx = Arc::clone(&ctx);
            tasks.spawn(async move {
                let _permit = permit;
                worker.process(&ctx, link).await;
            });
        }

        debug!(in_flight = tasks.len(), "draining tasks");
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                ctx.document_failed();
                error!(error = %e, "link task aborted");
            }
        }

        self.fetcher.close().await;
        self.store.close().await;

        let summary = ctx.summary();
        info!(
            records_ingested = summary.records_ingested,
            links_found = summary.links_found,
            documents_processed = summary.documents_processed,
            documents_failed = summary.documents_failed,
            elapsed_seconds = summary.elapsed_seconds,
            "pipeline finished"
        );
        summary
    }
}
