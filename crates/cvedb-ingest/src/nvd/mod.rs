//! NVD CVE feed ingestion module
//!
//! Implements the ETL pipeline for NVD JSON 1.1 vulnerability feeds:
//!
//! - **feed**: load and validate a feed document, yielding raw CVE items
//! - **extract**: flatten one raw item into a [`CveRecord`], tolerating any
//!   missing or malformed substructure
//! - **storage**: idempotent keyed upserts into PostgreSQL via [`CveStore`]
//! - **pipeline**: end-to-end run orchestration and counters
//!
//! # Example
//! ```no_run
//! use cvedb_ingest::nvd::{IngestPipeline, PgCveStore};
//! use std::path::Path;
//!
//! # async fn example(pool: sqlx::PgPool) -> anyhow::Result<()> {
//! let store = PgCveStore::new(pool, "cve_entries")?;
//! let stats = IngestPipeline::new(store)
//!     .run(Path::new("./data/nvdcve-1.1-2025.json"))
//!     .await?;
//! assert_eq!(stats.total_read, stats.upserted + stats.failed);
//! # Ok(())
//! # }
//! ```

pub mod extract;
pub mod feed;
pub mod models;
pub mod pipeline;
pub mod storage;

// Re-export commonly used types
pub use extract::extract;
pub use feed::{read_feed, FeedError};
pub use models::{CveRecord, IngestStats};
pub use pipeline::IngestPipeline;
pub use storage::{CveStore, PgCveStore};
