//! Database connection pool setup
//!
//! The pool is the authenticated store handle handed to the pipeline; it is
//! established once at startup, and failure here is fatal to the run since
//! no record can be loaded without it.

use anyhow::{Context, Result};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::info;

use crate::config::{masked_url, DatabaseConfig};

/// Build a PostgreSQL connection pool from configuration
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool> {
    info!(url = %masked_url(&config.url), "Connecting to PostgreSQL");

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
        .connect(&config.url)
        .await
        .with_context(|| {
            format!(
                "Failed to connect to database at {}",
                masked_url(&config.url)
            )
        })?;

    info!(
        max_connections = config.max_connections,
        "Database pool established"
    );

    Ok(pool)
}
