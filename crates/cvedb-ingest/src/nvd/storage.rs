//! PostgreSQL storage for flattened CVE records
//!
//! All writes are conflict-resolving upserts keyed on `cve_id`: re-running
//! a feed replays the latest state of each row instead of duplicating it.
//! The destination table is a precondition supplied by external
//! provisioning; this module never issues schema statements.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;
use tracing::debug;

use super::models::CveRecord;

/// Columns written per record, in bind order. `cve_id` leads and is the
/// conflict target.
const COLUMNS: [&str; 11] = [
    "cve_id",
    "assigner",
    "problem_type_data",
    "references_data",
    "description_text",
    "description_data_full",
    "configurations_data",
    "impact_data",
    "published_date",
    "last_modified_date",
    "raw_cve_item",
];

/// Upper bound on records per multi-row statement, keeping the bind count
/// well under PostgreSQL's parameter limit.
pub const MAX_UPSERT_BATCH_SIZE: usize = 1000;

/// Write interface for flattened CVE records
///
/// The trait is the seam between the run coordinator and the datastore, so
/// the pipeline can be exercised against an in-memory store in tests.
#[async_trait]
pub trait CveStore: Send + Sync {
    /// Upsert one record keyed on its identifier
    async fn upsert(&self, record: &CveRecord) -> Result<()>;

    /// Upsert a batch of records, returning how many the write covered
    ///
    /// Duplicate identifiers within `records` must resolve to the last
    /// occurrence in slice order, matching latest-wins feed semantics.
    async fn upsert_batch(&self, records: &[CveRecord]) -> Result<usize> {
        for record in records {
            self.upsert(record).await?;
        }
        Ok(records.len())
    }
}

/// PostgreSQL-backed [`CveStore`]
#[derive(Debug, Clone)]
pub struct PgCveStore {
    pool: PgPool,
    table: String,
}

impl PgCveStore {
    /// Create a store writing to `table`
    ///
    /// The table name is interpolated into SQL (identifiers cannot be bound
    /// as parameters), so it is validated as a bare identifier here.
    pub fn new(pool: PgPool, table: impl Into<String>) -> Result<Self> {
        let table = table.into();
        validate_table_name(&table)?;
        Ok(Self { pool, table })
    }

    fn upsert_sql(&self, rows: usize) -> String {
        let mut values = Vec::with_capacity(rows);
        for row in 0..rows {
            let placeholders: Vec<String> = (1..=COLUMNS.len())
                .map(|col| format!("${}", row * COLUMNS.len() + col))
                .collect();
            values.push(format!("({})", placeholders.join(", ")));
        }

        let updates: Vec<String> = COLUMNS[1..]
            .iter()
            .map(|col| format!("{col} = EXCLUDED.{col}"))
            .collect();

        format!(
            "INSERT INTO {} ({}) VALUES {} ON CONFLICT (cve_id) DO UPDATE SET {}",
            self.table,
            COLUMNS.join(", "),
            values.join(", "),
            updates.join(", "),
        )
    }
}

#[async_trait]
impl CveStore for PgCveStore {
    async fn upsert(&self, record: &CveRecord) -> Result<()> {
        sqlx::query(&self.upsert_sql(1))
            .bind(&record.cve_id)
            .bind(record.assigner.as_deref())
            .bind(record.problem_type_data.as_ref())
            .bind(record.references_data.as_ref())
            .bind(record.description_text.as_deref())
            .bind(record.description_data_full.as_ref())
            .bind(record.configurations_data.as_ref())
            .bind(record.impact_data.as_ref())
            .bind(record.published_date.as_deref())
            .bind(record.last_modified_date.as_deref())
            .bind(&record.raw_cve_item)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to upsert {}", record.cve_id))?;

        debug!(cve_id = %record.cve_id, "Upserted record");
        Ok(())
    }

    async fn upsert_batch(&self, records: &[CveRecord]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        // A single INSERT may not affect the same row twice, so duplicate
        // identifiers are collapsed to their last occurrence up front.
        let rows = dedupe_last_wins(records);

        for chunk in rows.chunks(MAX_UPSERT_BATCH_SIZE) {
            let sql = self.upsert_sql(chunk.len());
            let mut query = sqlx::query(&sql);
            for record in chunk {
                query = query
                    .bind(&record.cve_id)
                    .bind(record.assigner.as_deref())
                    .bind(record.problem_type_data.as_ref())
                    .bind(record.references_data.as_ref())
                    .bind(record.description_text.as_deref())
                    .bind(record.description_data_full.as_ref())
                    .bind(record.configurations_data.as_ref())
                    .bind(record.impact_data.as_ref())
                    .bind(record.published_date.as_deref())
                    .bind(record.last_modified_date.as_deref())
                    .bind(&record.raw_cve_item);
            }

            query
                .execute(&self.pool)
                .await
                .with_context(|| format!("Failed to upsert batch of {} records", chunk.len()))?;
        }

        debug!(
            records = records.len(),
            rows = rows.len(),
            "Upserted batch"
        );
        Ok(records.len())
    }
}

/// Collapse duplicate identifiers, keeping the values of the last
/// occurrence in slice order
fn dedupe_last_wins(records: &[CveRecord]) -> Vec<&CveRecord> {
    let mut positions: HashMap<&str, usize> = HashMap::new();
    let mut rows: Vec<&CveRecord> = Vec::with_capacity(records.len());

    for record in records {
        match positions.get(record.cve_id.as_str()) {
            Some(&pos) => rows[pos] = record,
            None => {
                positions.insert(record.cve_id.as_str(), rows.len());
                rows.push(record);
            },
        }
    }

    rows
}

fn validate_table_name(table: &str) -> Result<()> {
    let mut chars = table.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        },
        None => false,
    };

    if !valid {
        bail!(
            "Invalid table name '{}': expected a bare SQL identifier \
             (letters, digits, underscores, not starting with a digit)",
            table
        );
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(id: &str, text: &str) -> CveRecord {
        CveRecord {
            cve_id: id.to_string(),
            assigner: None,
            problem_type_data: None,
            references_data: None,
            description_text: Some(text.to_string()),
            description_data_full: None,
            configurations_data: None,
            impact_data: None,
            published_date: None,
            last_modified_date: None,
            raw_cve_item: json!({}),
        }
    }

    #[test]
    fn test_table_name_validation() {
        assert!(validate_table_name("cve_entries").is_ok());
        assert!(validate_table_name("_staging2").is_ok());
        assert!(validate_table_name("").is_err());
        assert!(validate_table_name("2fast").is_err());
        assert!(validate_table_name("cve_entries; DROP TABLE users").is_err());
        assert!(validate_table_name("cve-entries").is_err());
    }

    #[test]
    fn test_dedupe_keeps_last_occurrence() {
        let records = vec![
            record("CVE-2025-0001", "first"),
            record("CVE-2025-0002", "other"),
            record("CVE-2025-0001", "second"),
        ];
        let rows = dedupe_last_wins(&records);
        assert_eq!(rows.len(), 2);
        let winner = rows
            .iter()
            .find(|r| r.cve_id == "CVE-2025-0001")
            .unwrap();
        assert_eq!(winner.description_text.as_deref(), Some("second"));
    }

    #[test]
    fn test_dedupe_without_duplicates_is_identity() {
        let records = vec![record("CVE-2025-0001", "a"), record("CVE-2025-0002", "b")];
        let rows = dedupe_last_wins(&records);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].cve_id, "CVE-2025-0001");
        assert_eq!(rows[1].cve_id, "CVE-2025-0002");
    }

    #[tokio::test]
    async fn test_upsert_sql_shape() {
        let pool_less = |table: &str, rows: usize| {
            // upsert_sql only reads the table name, so a connected pool is
            // not needed to exercise it.
            let store = PgCveStore {
                pool: PgPool::connect_lazy("postgresql://localhost/cvedb").unwrap(),
                table: table.to_string(),
            };
            store.upsert_sql(rows)
        };

        let sql = pool_less("cve_entries", 1);
        assert!(sql.starts_with("INSERT INTO cve_entries (cve_id, assigner"));
        assert!(sql.contains("ON CONFLICT (cve_id) DO UPDATE SET"));
        assert!(sql.contains("raw_cve_item = EXCLUDED.raw_cve_item"));
        assert!(sql.contains("$11"));
        assert!(!sql.contains("$12"));

        let sql = pool_less("cve_entries", 2);
        assert!(sql.contains("($12, $13"));
        assert!(sql.contains("$22)"));
    }
}
