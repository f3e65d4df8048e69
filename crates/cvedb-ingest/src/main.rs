//! CVEDB Ingest - NVD CVE feed loader

use anyhow::{Context, Result};
use clap::Parser;
use cvedb_common::logging::{init_logging, LogConfig, LogLevel};
use cvedb_ingest::config::Config;
use cvedb_ingest::db;
use cvedb_ingest::nvd::{IngestPipeline, PgCveStore};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "cvedb-ingest")]
#[command(author, version, about = "NVD CVE feed ingestion tool")]
struct Cli {
    /// Path to the NVD JSON feed document
    #[arg(short, long)]
    feed: PathBuf,

    /// Destination table (overrides CVE_TABLE)
    #[arg(long)]
    table: Option<String>,

    /// Records per upsert statement (overrides CVE_BATCH_SIZE)
    #[arg(long)]
    batch_size: Option<usize>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Environment-driven logging config; --verbose forces debug level
    let mut log_config = LogConfig::from_env()?;
    log_config.file_prefix = "cvedb-ingest".to_string();
    if cli.verbose {
        log_config.level = LogLevel::Debug;
    }

    init_logging(&log_config)?;

    info!("Starting CVE data import");

    let mut config = Config::load().context("Failed to load configuration")?;
    if let Some(table) = cli.table {
        config.ingest.table = table;
    }
    if let Some(batch_size) = cli.batch_size {
        config.ingest.batch_size = batch_size;
    }
    config.validate().context("Invalid configuration")?;

    // An unreachable or unauthenticated store is fatal before any record
    // is processed.
    let pool = db::connect(&config.database)
        .await
        .context("Cannot establish the database handle")?;

    let store = PgCveStore::new(pool, config.ingest.table.as_str())?;
    let pipeline = IngestPipeline::new(store).with_batch_size(config.ingest.batch_size);

    let stats = pipeline.run(&cli.feed).await?;

    info!(
        total_read = stats.total_read,
        upserted = stats.upserted,
        failed = stats.failed,
        "CVE data import finished"
    );

    Ok(())
}
