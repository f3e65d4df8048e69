//! End-to-end ingestion run orchestration
//!
//! Drives Feed Reader -> Extractor -> Store strictly in feed document
//! order, one record (or one batch) at a time. Per-record failures are
//! swallowed into counters and log lines; only whole-run preconditions
//! (unreadable feed, unreachable store) escalate.

use anyhow::Result;
use chrono::Utc;
use std::path::Path;
use tracing::{error, info, warn};

use super::extract::extract;
use super::feed::read_feed;
use super::models::{CveRecord, IngestStats};
use super::storage::CveStore;

/// Running totals are logged every this many processed records, and on the
/// final record.
const PROGRESS_LOG_INTERVAL: u64 = 100;

/// Sequential ingestion pipeline over a [`CveStore`]
pub struct IngestPipeline<S: CveStore> {
    store: S,
    batch_size: usize,
}

impl<S: CveStore> IngestPipeline<S> {
    /// Create a pipeline with the per-record write loop (batch size 1)
    pub fn new(store: S) -> Self {
        Self {
            store,
            batch_size: 1,
        }
    }

    /// Set records per upsert statement; 1 keeps the per-record baseline
    ///
    /// Batching is a throughput option only: counting semantics are
    /// unchanged, and a failed batch counts every record in it as failed.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Borrow the underlying store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Run the full ingestion pipeline for one feed document
    ///
    /// Steps:
    /// 1. Load the feed and locate its CVE items
    /// 2. Flatten each item in document order
    /// 3. Upsert each flattened record, keyed on its identifier
    /// 4. Accumulate and report counters
    ///
    /// Returns the final run counters; `upserted + failed == total_read`
    /// always holds.
    pub async fn run(&self, feed_path: &Path) -> Result<IngestStats> {
        info!(feed = %feed_path.display(), "Starting CVE feed ingestion");
        let started_at = Utc::now();

        let items = read_feed(feed_path)?;
        let total_items = items.len() as u64;

        let mut stats = IngestStats {
            started_at: Some(started_at),
            ..Default::default()
        };

        if items.is_empty() {
            warn!("Feed contained no CVE items, nothing to ingest");
            return Ok(self.finish(stats));
        }

        info!(count = total_items, "Processing CVE items");

        let mut batch: Vec<CveRecord> = Vec::with_capacity(self.batch_size);

        for item in &items {
            stats.total_read += 1;

            let Some(record) = extract(item) else {
                // Unusable item; already logged with a preview by the
                // extractor. It never reaches the store.
                stats.failed += 1;
                self.log_progress(&stats, total_items, 1);
                continue;
            };

            if self.batch_size <= 1 {
                match self.store.upsert(&record).await {
                    Ok(()) => stats.upserted += 1,
                    Err(err) => {
                        error!(cve_id = %record.cve_id, error = ?err, "Upsert failed");
                        stats.failed += 1;
                    },
                }
                self.log_progress(&stats, total_items, 1);
            } else {
                batch.push(record);
                if batch.len() >= self.batch_size {
                    let counted = self.flush(&mut batch, &mut stats).await;
                    self.log_progress(&stats, total_items, counted);
                }
            }
        }

        if !batch.is_empty() {
            let counted = self.flush(&mut batch, &mut stats).await;
            self.log_progress(&stats, total_items, counted);
        }

        Ok(self.finish(stats))
    }

    /// Write out a pending batch, counting every record in it on failure.
    /// Returns how many records the flush accounted for.
    async fn flush(&self, batch: &mut Vec<CveRecord>, stats: &mut IngestStats) -> u64 {
        let counted = batch.len() as u64;
        match self.store.upsert_batch(batch).await {
            Ok(written) => stats.upserted += written as u64,
            Err(err) => {
                error!(
                    records = batch.len(),
                    error = ?err,
                    "Batch upsert failed"
                );
                stats.failed += batch.len() as u64;
            },
        }
        batch.clear();
        counted
    }

    /// `newly_counted` is how many records the caller just accounted for;
    /// a log line fires whenever that step crossed an interval boundary,
    /// so batch sizes that do not divide the interval still report.
    fn log_progress(&self, stats: &IngestStats, total_items: u64, newly_counted: u64) {
        let processed = stats.upserted + stats.failed;
        if crossed_interval(processed - newly_counted, processed) || processed == total_items {
            info!(
                processed = processed,
                total = total_items,
                upserted = stats.upserted,
                failed = stats.failed,
                "Ingestion progress"
            );
        }
    }

    fn finish(&self, mut stats: IngestStats) -> IngestStats {
        let completed_at = Utc::now();
        stats.duration_secs = stats
            .started_at
            .map(|started| (completed_at - started).num_milliseconds() as f64 / 1000.0)
            .unwrap_or(0.0);
        stats.completed_at = Some(completed_at);

        info!(
            total_read = stats.total_read,
            upserted = stats.upserted,
            failed = stats.failed,
            duration_secs = stats.duration_secs,
            "Ingestion run complete"
        );

        stats
    }
}

/// True when advancing from `before` to `after` processed records passed a
/// [`PROGRESS_LOG_INTERVAL`] boundary
fn crossed_interval(before: u64, after: u64) -> bool {
    after / PROGRESS_LOG_INTERVAL > before / PROGRESS_LOG_INTERVAL
}
