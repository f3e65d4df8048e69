//! NVD feed document loading
//!
//! A feed is a single JSON document whose top-level `CVE_Items` array holds
//! the raw records. The whole document is parsed into memory before any
//! record is handed downstream; feed size is bounded by the NVD yearly
//! publication, not unbounded streaming.

use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Top-level collection field of the NVD 1.1 feed schema. The name must
/// match the published schema exactly for records to be located.
pub const FEED_COLLECTION_FIELD: &str = "CVE_Items";

/// Whole-run input failures; any of these aborts a run before processing
#[derive(Error, Debug)]
pub enum FeedError {
    #[error("Feed file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("Feed file {path} is not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to read feed file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Load a feed document and return its raw CVE items in document order
///
/// An absent or empty `CVE_Items` collection is not an error: it is logged
/// and an empty vector is returned so the run ends cleanly with zero
/// counts. A missing file, unreadable file, or unparsable document is a
/// [`FeedError`].
pub fn read_feed(path: &Path) -> Result<Vec<Value>, FeedError> {
    if !path.exists() {
        return Err(FeedError::NotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|source| FeedError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let document: Value = serde_json::from_str(&content).map_err(|source| FeedError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    let items = match document.get(FEED_COLLECTION_FIELD).and_then(Value::as_array) {
        Some(items) if !items.is_empty() => items.clone(),
        _ => {
            warn!(
                path = %path.display(),
                collection = FEED_COLLECTION_FIELD,
                "No CVE items found in feed document"
            );
            return Ok(Vec::new());
        },
    };

    info!(
        path = %path.display(),
        count = items.len(),
        "Loaded feed document"
    );

    Ok(items)
}
