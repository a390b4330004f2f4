//! Per-run state shared by every pipeline stage.
//!
//! One `RunContext` is created per run and handed out behind an `Arc`; there
//! is no process-wide state, so several pipelines can run side by side.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Cloneable request-to-stop flag. Setting it stops new work; in-flight
/// tasks finish.
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandle(Arc<AtomicBool>);

impl ShutdownHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug)]
pub struct RunContext {
    cutoff: NaiveDate,
    started_at: Instant,
    shutdown: ShutdownHandle,
    current_page: AtomicU32,
    last_seen_date: Mutex<Option<NaiveDate>>,
    links_found: AtomicUsize,
    records_ingested: AtomicUsize,
    documents_processed: AtomicUsize,
    documents_failed: AtomicUsize,
}

impl RunContext {
    /// A context with its own shutdown flag.
    pub fn new(cutoff: NaiveDate) -> Self {
        Self::with_shutdown(cutoff, ShutdownHandle::new())
    }

    /// A context sharing `shutdown` with the caller.
    pub fn with_shutdown(cutoff: NaiveDate, shutdown: ShutdownHandle) -> Self {
        Self {
            cutoff,
            started_at: Instant::now(),
            shutdown,
            current_page: AtomicU32::new(0),
            last_seen_date: Mutex::new(None),
            links_found: AtomicUsize::new(0),
            records_ingested: AtomicUsize::new(0),
            documents_processed: AtomicUsize::new(0),
            documents_failed: AtomicUsize::new(0),
        }
    }

    /// Earliest trade date this run ingests.
    pub fn cutoff(&self) -> NaiveDate {
        self.cutoff
    }

    /// A clone of the run's shutdown flag.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Whether shutdown has been requested.
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.is_requested()
    }

    /// Stop scheduling new work.
    pub fn request_shutdown(&self) {
        self.shutdown.request();
    }

    /// Listing page being fetched.
    pub fn set_current_page(&self, page: u32) {
        self.current_page.store(page, Ordering::Relaxed);
    }

    /// Last listing page fetched (0 before collection).
    pub fn current_page(&self) -> u32 {
        self.current_page.load(Ordering::Relaxed)
    }

    /// Remember the most recent link date seen on a listing page.
    pub fn note_link_date(&self, date: NaiveDate) {
        let mut last = self
            .last_seen_date
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *last = Some(date);
    }

    /// Trade date of the last link seen, if any.
    pub fn last_seen_date(&self) -> Option<NaiveDate> {
        *self
            .last_seen_date
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Count links kept by the collector.
    pub fn add_links(&self, n: usize) {
        self.links_found.fetch_add(n, Ordering::Relaxed);
    }

    /// Count records newly stored.
    pub fn add_records(&self, n: usize) {
        self.records_ingested.fetch_add(n, Ordering::Relaxed);
    }

    /// One bulletin fully ingested.
    pub fn document_processed(&self) {
        self.documents_processed.fetch_add(1, Ordering::Relaxed);
    }

    /// One bulletin skipped or rolled back.
    pub fn document_failed(&self) {
        self.documents_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Snapshot of the counters and elapsed time.
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            records_ingested: self.records_ingested.load(Ordering::Relaxed),
            elapsed_seconds: self.started_at.elapsed().as_secs_f64(),
            links_found: self.links_found.load(Ordering::Relaxed),
            documents_processed: self.documents_processed.load(Ordering::Relaxed),
            documents_failed: self.documents_failed.load(Ordering::Relaxed),
        }
    }
}

/// Counters reported at the end of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub records_ingested: usize,
    pub elapsed_seconds: f64,
    pub links_found: usize,
    pub documents_processed: usize,
    pub documents_failed: usize,
}
