//! Flattening of raw NVD feed items
//!
//! Public vulnerability feeds are inconsistently populated across years and
//! sources, so every nested lookup here treats a missing or mistyped key as
//! an absent value rather than an error. A whole run must never abort over
//! one malformed entry: the only unrecoverable condition for a single item
//! is a missing identifier, which discards just that item.

use serde_json::Value;
use tracing::warn;

use super::models::CveRecord;

/// Maximum characters of a raw item echoed into skip warnings
const RAW_PREVIEW_CHARS: usize = 200;

/// Flatten one raw feed item into a [`CveRecord`]
///
/// Returns `None` when the item is unusable (no `cve` block or no
/// identifier); the caller counts those as failed. Never panics or errors
/// on malformed input.
pub fn extract(item: &Value) -> Option<CveRecord> {
    let cve = match item.get("cve") {
        Some(cve) if cve.is_object() => cve,
        _ => {
            warn!("CVE item missing 'cve' block, skipping");
            return None;
        },
    };

    let meta = cve.get("CVE_data_meta");

    // Explicit presence check: an empty-string ID is as unusable as an
    // absent one, but neither may be conflated with other falsy values.
    let cve_id = match meta
        .and_then(|m| m.get("ID"))
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
    {
        Some(id) => id.to_string(),
        None => {
            warn!(
                raw = %preview(item),
                "CVE item missing 'ID' in CVE_data_meta, skipping"
            );
            return None;
        },
    };

    let assigner = meta
        .and_then(|m| m.get("ASSIGNER"))
        .and_then(Value::as_str)
        .map(str::to_string);

    // Opaque structured passthroughs: stored as-is, downstream consumers
    // own their interpretation.
    let problem_type_data = cve
        .get("problemtype")
        .and_then(|pt| pt.get("problemtype_data"))
        .cloned();
    let references_data = cve
        .get("references")
        .and_then(|r| r.get("reference_data"))
        .cloned();
    let description_data_full = cve
        .get("description")
        .and_then(|d| d.get("description_data"))
        .cloned();

    let description_text = first_english_description(description_data_full.as_ref());

    Some(CveRecord {
        cve_id,
        assigner,
        problem_type_data,
        references_data,
        description_text,
        description_data_full,
        configurations_data: item.get("configurations").cloned(),
        impact_data: item.get("impact").cloned(),
        published_date: item
            .get("publishedDate")
            .and_then(Value::as_str)
            .map(str::to_string),
        last_modified_date: item
            .get("lastModifiedDate")
            .and_then(Value::as_str)
            .map(str::to_string),
        raw_cve_item: item.clone(),
    })
}

/// First entry in document order with `lang == "en"`, taking its `value`
///
/// Absent list, non-array list, or no English entry all yield `None`.
fn first_english_description(description_data: Option<&Value>) -> Option<String> {
    description_data?
        .as_array()?
        .iter()
        .find(|entry| entry.get("lang").and_then(Value::as_str) == Some("en"))
        .and_then(|entry| entry.get("value"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Bounded, char-boundary-safe preview of a raw item for skip diagnostics
fn preview(item: &Value) -> String {
    let rendered = item.to_string();
    match rendered.char_indices().nth(RAW_PREVIEW_CHARS) {
        Some((byte_offset, _)) => format!("{}...", &rendered[..byte_offset]),
        None => rendered,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn item_with_id(id: &str) -> Value {
        json!({
            "cve": {
                "CVE_data_meta": { "ID": id, "ASSIGNER": "cve@mitre.org" }
            }
        })
    }

    #[test]
    fn test_missing_cve_block_discards_item() {
        assert!(extract(&json!({"configurations": {}})).is_none());
        assert!(extract(&json!({"cve": "not an object"})).is_none());
    }

    #[test]
    fn test_missing_id_discards_item() {
        let item = json!({"cve": {"CVE_data_meta": {"ASSIGNER": "cve@mitre.org"}}});
        assert!(extract(&item).is_none());
    }

    #[test]
    fn test_empty_id_discards_item() {
        let item = json!({"cve": {"CVE_data_meta": {"ID": ""}}});
        assert!(extract(&item).is_none());
    }

    #[test]
    fn test_non_string_id_discards_item() {
        let item = json!({"cve": {"CVE_data_meta": {"ID": 12345}}});
        assert!(extract(&item).is_none());
    }

    #[test]
    fn test_minimal_item_extracts_with_absent_optionals() {
        let record = extract(&item_with_id("CVE-2025-0001")).unwrap();
        assert_eq!(record.cve_id, "CVE-2025-0001");
        assert_eq!(record.assigner.as_deref(), Some("cve@mitre.org"));
        assert!(record.problem_type_data.is_none());
        assert!(record.references_data.is_none());
        assert!(record.description_text.is_none());
        assert!(record.configurations_data.is_none());
        assert!(record.impact_data.is_none());
        assert!(record.published_date.is_none());
        assert!(record.last_modified_date.is_none());
    }

    #[test]
    fn test_first_english_description_wins() {
        let item = json!({
            "cve": {
                "CVE_data_meta": { "ID": "CVE-2025-0002" },
                "description": {
                    "description_data": [
                        { "lang": "fr", "value": "A" },
                        { "lang": "en", "value": "B" },
                        { "lang": "en", "value": "C" }
                    ]
                }
            }
        });
        let record = extract(&item).unwrap();
        assert_eq!(record.description_text.as_deref(), Some("B"));
    }

    #[test]
    fn test_no_english_description_leaves_text_absent() {
        let item = json!({
            "cve": {
                "CVE_data_meta": { "ID": "CVE-2025-0003" },
                "description": {
                    "description_data": [{ "lang": "es", "value": "hola" }]
                }
            }
        });
        let record = extract(&item).unwrap();
        assert!(record.description_text.is_none());
        // The full list is still carried through untouched.
        assert!(record.description_data_full.is_some());
    }

    #[test]
    fn test_description_list_wrong_type_is_tolerated() {
        let item = json!({
            "cve": {
                "CVE_data_meta": { "ID": "CVE-2025-0004" },
                "description": { "description_data": "not a list" }
            }
        });
        let record = extract(&item).unwrap();
        assert!(record.description_text.is_none());
    }

    #[test]
    fn test_structured_fields_pass_through_verbatim() {
        let references = json!([{ "url": "https://example.com/advisory" }]);
        let configurations = json!({ "CVE_data_version": "4.0", "nodes": [] });
        let impact = json!({ "baseMetricV3": { "cvssV3": { "baseScore": 9.8 } } });
        let item = json!({
            "cve": {
                "CVE_data_meta": { "ID": "CVE-2025-0005" },
                "references": { "reference_data": references }
            },
            "configurations": configurations,
            "impact": impact
        });

        let record = extract(&item).unwrap();
        assert_eq!(record.references_data.unwrap(), references);
        assert_eq!(record.configurations_data.unwrap(), configurations);
        assert_eq!(record.impact_data.unwrap(), impact);
        assert_eq!(record.raw_cve_item, item);
    }

    #[test]
    fn test_timestamps_carried_verbatim() {
        let item = json!({
            "cve": { "CVE_data_meta": { "ID": "CVE-2025-0006" } },
            "publishedDate": "2025-01-02T03:04Z",
            "lastModifiedDate": "not even a date"
        });
        let record = extract(&item).unwrap();
        assert_eq!(record.published_date.as_deref(), Some("2025-01-02T03:04Z"));
        assert_eq!(
            record.last_modified_date.as_deref(),
            Some("not even a date")
        );
    }

    #[test]
    fn test_preview_is_bounded_and_char_safe() {
        let long = "é".repeat(500);
        let item = json!({ "description": long });
        let rendered = preview(&item);
        assert!(rendered.ends_with("..."));
        assert!(rendered.chars().count() <= RAW_PREVIEW_CHARS + 3);
    }
}
