//! Helpers for the JSON object stored in every version of a record.

use serde_json::{Map, Value};

use mcps_types::{names, RecordId, Tags, CONTENT_TYPE_JSON};

use crate::config::RecordsConfig;
use crate::error::{RecordError, RecordResult};

/// Field carrying the record id inside the payload.
pub const RECORD_ID_FIELD: &str = "recordId";
pub const AUTHOR_FIELD: &str = "author";

pub fn into_object(payload: Value) -> RecordResult<Map<String, Value>> {
    match payload {
        Value::Object(map) => Ok(map),
        other => Err(RecordError::InvalidPayload(format!(
            "expected a JSON object, got {}",
            kind(&other)
        ))),
    }
}

pub fn record_id_of(object: &Map<String, Value>) -> RecordResult<RecordId> {
    let raw = object
        .get(RECORD_ID_FIELD)
        .and_then(Value::as_str)
        .ok_or_else(|| RecordError::InvalidPayload(format!("missing string field `{RECORD_ID_FIELD}`")))?;
    RecordId::parse(raw).map_err(|e| RecordError::InvalidPayload(e.to_string()))
}

/// Tags shared by every version of a record. `author` is only written when
/// the payload supplies one.
pub fn chain_tags(config: &RecordsConfig, record: &RecordId, object: &Map<String, Value>) -> Tags {
    let mut tags = Tags::new()
        .with(names::CONTENT_TYPE, CONTENT_TYPE_JSON)
        .with(names::CLASS, config.record_class.as_str())
        .with(names::APPLICATION_ID, record.as_str());
    if let Some(author) = object.get(AUTHOR_FIELD).and_then(Value::as_str) {
        tags.push(names::AUTHOR, author);
    }
    tags
}

pub fn to_bytes(object: Map<String, Value>) -> RecordResult<Vec<u8>> {
    serde_json::to_vec(&Value::Object(object)).map_err(|e| RecordError::Serialization(e.to_string()))
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
