//! Mapping helpers for vector store payloads.

use crate::{processing::types::QueryMatch, qdrant::ScoredPoint};
use serde_json::Value;

/// Map a scored point and its metadata payload into a query match.
pub(crate) fn map_scored_point(point: ScoredPoint) -> QueryMatch {
    let ScoredPoint { id, score, payload } = point;

    let mut company = None;
    let mut year = None;
    let mut page = None;
    let mut summarized = None;
    let mut content = None;

    if let Some(mut map) = payload {
        company = take_text(map.remove("company"));
        summarized = take_text(map.remove("summarized"));
        content = take_text(map.remove("content"));
        year = map
            .remove("year")
            .and_then(|value| value.as_i64())
            .and_then(|value| i32::try_from(value).ok());
        page = map
            .remove("page")
            .and_then(|value| value.as_u64())
            .and_then(|value| u32::try_from(value).ok());
    }

    QueryMatch {
        id,
        score,
        company,
        year,
        page,
        summarized,
        content,
    }
}

fn take_text(value: Option<Value>) -> Option<String> {
    match value {
        Some(Value::String(text)) => Some(text),
        _ => None,
    }
}
