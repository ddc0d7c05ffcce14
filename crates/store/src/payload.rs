//! Raw API payload <-> [`Record`].

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use kubeset_core::{is_structural, DeserializationError, Record, ResourceDescriptor};
use kubeset_schema::Kind;
use serde_json::{Map, Value};
use uuid::Uuid;

fn string_map(kind: &str, meta: &Map<String, Value>, key: &str) -> Result<BTreeMap<String, String>, DeserializationError> {
    let Some(raw) = meta.get(key) else {
        return Ok(BTreeMap::new());
    };
    match raw {
        Value::Null => Ok(BTreeMap::new()),
        Value::Object(m) => m
            .iter()
            .map(|(k, v)| match v {
                Value::String(s) => Ok((k.clone(), s.clone())),
                other => Err(DeserializationError {
                    kind: kind.to_string(),
                    reason: format!("metadata.{}.{} is not a string: {}", key, k, other),
                }),
            })
            .collect(),
        other => Err(DeserializationError { kind: kind.to_string(), reason: format!("metadata.{} is not a map: {}", key, other) }),
    }
}

/// Build a record from one listed or returned object.
///
/// The payload must be an object whose `metadata` carries a string `name`;
/// anything else is rejected rather than skipped. Dynamic fields carry the
/// kind's declared types.
pub fn from_payload(kind: &Kind, raw: &Value) -> Result<Record, DeserializationError> {
    let kind_name = kind.descriptor().kind.as_str();
    let record = read_payload(kind_name, raw)?;
    Ok(record.with_field_types(kind.fields()))
}

fn read_payload(kind: &str, raw: &Value) -> Result<Record, DeserializationError> {
    let fail = |reason: String| DeserializationError { kind: kind.to_string(), reason };
    let obj = raw.as_object().ok_or_else(|| fail(format!("expected an object, got {}", raw)))?;
    let meta = obj.get("metadata").and_then(Value::as_object).ok_or_else(|| fail("missing metadata".into()))?;
    let name = meta.get("name").and_then(Value::as_str).ok_or_else(|| fail("missing metadata.name".into()))?;

    let uid = match meta.get("uid").and_then(Value::as_str) {
        Some(s) => Some(Uuid::parse_str(s).map_err(|e| fail(format!("metadata.uid {:?}: {}", s, e)))?),
        None => None,
    };
    let creation_timestamp = match meta.get("creationTimestamp").and_then(Value::as_str) {
        Some(s) => Some(
            DateTime::parse_from_rfc3339(s)
                .map_err(|e| fail(format!("metadata.creationTimestamp {:?}: {}", s, e)))?
                .with_timezone(&Utc),
        ),
        None => None,
    };

    Ok(Record {
        uid,
        name: name.to_string(),
        namespace: meta.get("namespace").and_then(Value::as_str).map(str::to_string),
        labels: string_map(kind, meta, "labels")?,
        annotations: string_map(kind, meta, "annotations")?,
        resource_version: meta.get("resourceVersion").and_then(Value::as_str).map(str::to_string),
        creation_timestamp,
        fields: obj.iter().filter(|(k, _)| !is_structural(k)).map(|(k, v)| (k.clone(), v.clone())).collect(),
        ..Record::default()
    })
}

/// Request body for create/replace.
pub fn to_payload(desc: &ResourceDescriptor, record: &Record) -> Value {
    let mut meta = Map::new();
    meta.insert("name".into(), Value::String(record.name.clone()));
    if let Some(ns) = &record.namespace {
        meta.insert("namespace".into(), Value::String(ns.clone()));
    }
    if !record.labels.is_empty() {
        meta.insert("labels".into(), serde_json::json!(record.labels));
    }
    if !record.annotations.is_empty() {
        meta.insert("annotations".into(), serde_json::json!(record.annotations));
    }
    if let Some(uid) = record.uid {
        meta.insert("uid".into(), Value::String(uid.to_string()));
    }
    if let Some(rv) = &record.resource_version {
        meta.insert("resourceVersion".into(), Value::String(rv.clone()));
    }

    let mut body = Map::new();
    body.insert("apiVersion".into(), Value::String(desc.api_version()));
    body.insert("kind".into(), Value::String(desc.kind.clone()));
    body.insert("metadata".into(), Value::Object(meta));
    for (k, v) in &record.fields {
        if !is_structural(k) {
            body.insert(k.clone(), v.clone());
        }
    }
    Value::Object(body)
}
