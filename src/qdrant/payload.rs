//! Helpers for constructing Qdrant point payloads.

use crate::records::{VectorMetadata, VectorRecord};
use serde_json::{Map, Value, json};

/// Build the payload object stored alongside each page vector.
pub(crate) fn build_payload(metadata: &VectorMetadata) -> Map<String, Value> {
    let mut payload = Map::new();
    payload.insert("company".into(), Value::String(metadata.company.clone()));
    payload.insert("year".into(), Value::from(metadata.year));
    payload.insert("page".into(), Value::from(metadata.page));
    payload.insert(
        "summarized".into(),
        Value::String(metadata.summarized.clone()),
    );
    payload.insert("content".into(), Value::String(metadata.content.clone()));
    payload
}

/// Serialize a vector record into the point shape expected by `PUT /points`.
pub(crate) fn build_point(record: VectorRecord) -> Value {
    let payload = build_payload(&record.metadata);
    json!({
        "id": record.id,
        "vector": record.vector,
        "payload": payload,
    })
}
