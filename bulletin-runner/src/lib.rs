//! Bulletin Runner: the ingestion pipeline over `bulletin-core`.
//!
//! This crate provides:
//! - TOML configuration with environment overrides
//! - A per-run context (counters, shutdown flag) shared by every stage
//! - Link collection across paginated listing pages
//! - Document downloads and dedup ingest
//! - The orchestrator running per-link tasks under a concurrency cap

pub mod collector;
pub mod config;
pub mod context;
pub mod downloader;
pub mod ingest;
pub mod pipeline;

pub use collector::LinkCollector;
pub use config::{ConfigError, PipelineConfig, DATABASE_URL_ENV};
pub use context::{RunContext, RunSummary, ShutdownHandle};
pub use downloader::Downloader;
pub use ingest::{DedupIngestor, IngestOutcome};
pub use pipeline::{Pipeline, PipelineError, PipelineOptions};
