//! Bulletins CLI: run the ingestion pipeline, decode a single bulletin,
//! inspect the record store.
//!
//! Commands:
//! - `run`: collect, download, decode and store bulletins since the cutoff
//! - `decode`: decode one local bulletin file (optionally export CSV)
//! - `status`: record count, date range and latest trading dates

use anyhow::{Context, Result};
use bulletin_core::report::CalamineReader;
use bulletin_core::{decode_file, SqliteRecordStore};
use bulletin_runner::{Pipeline, PipelineConfig, RunSummary};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "bulletins",
    about = "Exchange bulletin ingestion: oil products trading results into SQLite"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest every bulletin published on or after the cutoff date.
    Run {
        /// Path to a TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Earliest trade date to ingest (YYYY-MM-DD). Overrides the config.
        #[arg(long)]
        cutoff: Option<NaiveDate>,

        /// Concurrent per-bulletin tasks; 1 processes bulletins in listing order.
        #[arg(long)]
        max_in_flight: Option<usize>,

        /// Database URL (e.g. sqlite://bulletins.db).
        #[arg(long)]
        database_url: Option<String>,

        /// Directory for downloaded bulletins.
        #[arg(long)]
        download_dir: Option<PathBuf>,

        /// Print the run summary as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Decode one bulletin file and print the record count.
    Decode {
        /// Path to the .xls/.xlsx bulletin.
        file: PathBuf,

        /// Trade date the bulletin was listed under (YYYY-MM-DD).
        #[arg(long)]
        date: NaiveDate,

        /// Write the decoded records to this CSV file.
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Show what the record store holds.
    Status {
        /// Path to a TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Database URL. Overrides the config.
        #[arg(long)]
        database_url: Option<String>,

        /// How many recent trading dates to list.
        #[arg(long, default_value_t = 10)]
        limit: u32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            cutoff,
            max_in_flight,
            database_url,
            download_dir,
            json,
        } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(n) = max_in_flight {
                config.download.max_in_flight = n;
            }
            if let Some(url) = database_url {
                config.store.database_url = url;
            }
            if let Some(dir) = download_dir {
                config.download.dir = dir;
            }
            let cutoff = cutoff.unwrap_or(config.cutoff_date);
            run_pipeline(&config, cutoff, json).await
        }
        Commands::Decode { file, date, csv } => run_decode(&file, date, csv.as_deref()),
        Commands::Status {
            config,
            database_url,
            limit,
        } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(url) = database_url {
                config.store.database_url = url;
            }
            run_status(&config, limit).await
        }
    }
}

/// File (or defaults), then environment. CLI flags are applied by the caller.
fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    let mut config = match path {
        Some(path) => PipelineConfig::from_file(path)?,
        None => PipelineConfig::default(),
    };
    config.apply_env();
    Ok(config)
}

async fn run_pipeline(config: &PipelineConfig, cutoff: NaiveDate, json: bool) -> Result<()> {
    let pipeline = Pipeline::connect(config)
        .await
        .context("pipeline initialization failed")?;

    let shutdown = pipeline.shutdown_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received; finishing in-flight bulletins");
            shutdown.request();
        }
    });

    let summary = pipeline.run(cutoff).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary, cutoff);
    }
    Ok(())
}

fn run_decode(file: &Path, date: NaiveDate, csv_out: Option<&Path>) -> Result<()> {
    let report = decode_file(&CalamineReader, file, date)
        .with_context(|| format!("cannot decode {}", file.display()))?;

    println!("File:           {}", file.display());
    println!("Printed date:   {}", report.document_date);
    println!("Records:        {}", report.records.len());
    println!("Dropped rows:   {}", report.dropped_rows);

    if let Some(out) = csv_out {
        let mut writer = csv::Writer::from_path(out)
            .with_context(|| format!("cannot create {}", out.display()))?;
        for record in &report.records {
            writer.serialize(record)?;
        }
        writer.flush()?;
        println!("CSV written to: {}", out.display());
    }
    Ok(())
}

async fn run_status(config: &PipelineConfig, limit: u32) -> Result<()> {
    let store = SqliteRecordStore::connect(&config.store.database_url, 1)
        .await
        .with_context(|| format!("cannot open {}", config.store.database_url))?;

    let summary = store.summary().await?;
    let recent = store.last_trading_dates(limit).await?;

    println!("Store:          {}", config.store.database_url);
    println!("Records:        {}", summary.records);
    println!("Trading days:   {}", summary.trading_days);
    match (summary.first_trade_date, summary.last_trade_date) {
        (Some(first), Some(last)) => println!("Period:         {first} to {last}"),
        _ => println!("Period:         (empty)"),
    }
    if !recent.is_empty() {
        println!();
        println!("--- Latest trading dates ---");
        for date in &recent {
            println!("{date}");
        }
    }
    Ok(())
}

fn print_summary(summary: &RunSummary, cutoff: NaiveDate) {
    println!();
    println!("=== Ingestion Run ===");
    println!("Cutoff:         {cutoff}");
    println!("Links found:    {}", summary.links_found);
    println!("Processed:      {}", summary.documents_processed);
    println!("Failed:         {}", summary.documents_failed);
    println!("Records added:  {}", summary.records_ingested);
    println!("Elapsed:        {:.1}s", summary.elapsed_seconds);
    if summary.documents_failed > 0 {
        println!();
        println!("WARNING: {} bulletin(s) skipped; see log", summary.documents_failed);
    }
}
