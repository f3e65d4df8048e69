//! Data models for NVD feed ingestion

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One CVE item flattened into the persisted relational shape
///
/// Only `cve_id` is guaranteed present and non-empty; every other field may
/// be absent in the source feed. The structured fields are opaque
/// passthroughs stored as JSONB without reinterpretation, and the two
/// timestamps are carried verbatim as text, never parsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CveRecord {
    /// Natural unique key, e.g. "CVE-2025-12345"
    pub cve_id: String,
    pub assigner: Option<String>,
    pub problem_type_data: Option<Value>,
    pub references_data: Option<Value>,
    /// First English-language description, if any
    pub description_text: Option<String>,
    pub description_data_full: Option<Value>,
    pub configurations_data: Option<Value>,
    pub impact_data: Option<Value>,
    pub published_date: Option<String>,
    pub last_modified_date: Option<String>,
    /// Full original feed item, retained for auditability
    pub raw_cve_item: Value,
}

/// Counters accumulated over a whole ingestion run
///
/// Invariant: `upserted + failed == total_read`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestStats {
    /// Items read from the feed collection
    pub total_read: u64,
    /// Records durably upserted into the store
    pub upserted: u64,
    /// Records that failed extraction or loading
    pub failed: u64,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration_secs: f64,
}

impl IngestStats {
    /// True when every record read was accounted for as upserted or failed
    pub fn is_balanced(&self) -> bool {
        self.upserted + self.failed == self.total_read
    }
}
