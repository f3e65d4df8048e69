//! CVEDB Ingest Library
//!
//! ETL pipeline for NVD CVE JSON feeds: read a published feed document,
//! flatten each CVE item into a relational shape, and upsert it into
//! PostgreSQL keyed on the CVE identifier. Re-running the pipeline over the
//! same or an overlapping feed is safe; the keyed upsert makes every load
//! idempotent.
//!
//! # Example
//!
//! ```no_run
//! use cvedb_ingest::nvd::{IngestPipeline, PgCveStore};
//! use std::path::Path;
//!
//! # async fn example(pool: sqlx::PgPool) -> anyhow::Result<()> {
//! let store = PgCveStore::new(pool, "cve_entries")?;
//! let pipeline = IngestPipeline::new(store);
//! let stats = pipeline.run(Path::new("./data/nvdcve-1.1-2025.json")).await?;
//! println!("upserted {} of {}", stats.upserted, stats.total_read);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod db;
pub mod nvd;
