//! Translate metadata filters into Qdrant filter payloads.

use serde_json::{Map, Value, json};

use super::types::MetadataFilter;

/// Compose the Qdrant `filter` object for a metadata filter.
///
/// Returns `None` when no constraint is set so the query runs unfiltered.
pub fn build_metadata_filter(filter: &MetadataFilter) -> Option<Value> {
    let mut must: Vec<Value> = Vec::new();

    if let Some(company) = filter.company.as_deref().and_then(non_empty) {
        must.push(json!({
            "key": "company",
            "match": { "value": company }
        }));
    }

    if let Some(year) = filter.year {
        must.push(json!({
            "key": "year",
            "match": { "value": year }
        }));
    }

    if let Some(range) = filter.year_range.as_ref() {
        let mut boundaries = Map::new();
        if let Some(start) = range.start {
            boundaries.insert("gte".into(), Value::from(start));
        }
        if let Some(end) = range.end {
            boundaries.insert("lte".into(), Value::from(end));
        }
        if !boundaries.is_empty() {
            must.push(json!({
                "key": "year",
                "range": Value::Object(boundaries)
            }));
        }
    }

    if let Some(page) = filter.page {
        must.push(json!({
            "key": "page",
            "match": { "value": page }
        }));
    }

    if must.is_empty() {
        None
    } else {
        Some(json!({ "must": must }))
    }
}

fn non_empty(input: &str) -> Option<&str> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}
