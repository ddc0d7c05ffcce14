//! kubeset core types: resource descriptors, field definitions, records.

#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod error;
pub mod settings;
pub mod value;

pub use error::{ConfigurationError, DeserializationError, Error, Result, TransportError};
pub use settings::Settings;
pub use value::{FieldValue, Scalar};

/// Top-level payload keys that describe structure rather than data.
pub const STRUCTURAL_KEYS: [&str; 3] = ["metadata", "apiVersion", "kind"];

pub fn is_structural(name: &str) -> bool {
    STRUCTURAL_KEYS.contains(&name)
}

/// Immutable per-kind metadata, fixed when the kind is declared.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResourceDescriptor {
    /// API group; the core group is stored as the empty string.
    pub group: String,
    pub version: String,
    pub kind: String,
    pub plural: String,
    pub cluster_scoped: bool,
    pub require_schema: bool,
    /// Namespace applied to new records of a namespace-scoped kind.
    pub default_namespace: Option<String>,
}

impl ResourceDescriptor {
    pub fn is_core(&self) -> bool {
        self.group.is_empty()
    }

    pub fn api_version(&self) -> String {
        if self.is_core() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }

    pub fn gvk_key(&self) -> String {
        if self.is_core() {
            format!("{}/{}", self.version, self.kind)
        } else {
            format!("{}/{}/{}", self.group, self.version, self.kind)
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SemanticType {
    String,
    Integer,
    Float,
    Bool,
    Timestamp,
    List,
    Map,
}

impl std::fmt::Display for SemanticType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SemanticType::String => "string",
            SemanticType::Integer => "integer",
            SemanticType::Float => "float",
            SemanticType::Bool => "bool",
            SemanticType::Timestamp => "timestamp",
            SemanticType::List => "list",
            SemanticType::Map => "map",
        };
        f.write_str(s)
    }
}

/// One dynamic field of a kind's record shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldDefinition {
    pub name: String,
    pub semantic_type: SemanticType,
    #[serde(default)]
    pub default_value: serde_json::Value,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
}

fn default_nullable() -> bool {
    true
}

impl FieldDefinition {
    pub fn new(name: impl Into<String>, semantic_type: SemanticType) -> Self {
        let default_value = match semantic_type {
            SemanticType::String => serde_json::Value::String(String::new()),
            SemanticType::Integer => serde_json::json!(0),
            SemanticType::Float => serde_json::json!(0.0),
            SemanticType::Bool => serde_json::Value::Bool(false),
            SemanticType::Timestamp => serde_json::Value::Null,
            SemanticType::List => serde_json::Value::Array(Vec::new()),
            SemanticType::Map => serde_json::Value::Object(serde_json::Map::new()),
        };
        Self { name: name.into(), semantic_type, default_value, nullable: true }
    }

    /// Fill a null default from the semantic type; declarations read from files may omit it.
    pub fn or_type_default(mut self) -> Self {
        if self.default_value.is_null() {
            self.default_value = Self::new(self.name.as_str(), self.semantic_type).default_value;
        }
        self
    }
}

/// One instance of a kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Server-assigned identity; `None` until the record has been created remotely.
    pub uid: Option<Uuid>,
    pub name: String,
    pub namespace: Option<String>,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
    pub resource_version: Option<String>,
    pub creation_timestamp: Option<DateTime<Utc>>,
    /// Dynamic fields keyed by top-level payload key (e.g. `spec`, `status`, `data`).
    pub fields: BTreeMap<String, serde_json::Value>,
    /// Declared type of each dynamic field; [`attribute`](Self::attribute) reads values through it.
    #[serde(skip)]
    pub field_types: BTreeMap<String, SemanticType>,
}

impl Record {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Self::default() }
    }

    pub fn field(&self, name: &str) -> Option<&serde_json::Value> {
        self.fields.get(name)
    }

    pub fn set_field(&mut self, name: impl Into<String>, value: serde_json::Value) {
        self.fields.insert(name.into(), value);
    }

    pub fn with_field_types<'a>(mut self, fields: impl IntoIterator<Item = &'a FieldDefinition>) -> Self {
        self.field_types.extend(fields.into_iter().map(|f| (f.name.clone(), f.semantic_type)));
        self
    }

    /// Stable identity used to deduplicate set unions: the uid when known,
    /// otherwise namespace/name.
    pub fn identity(&self) -> RecordKey {
        match self.uid {
            Some(uid) => RecordKey::Uid(uid),
            None => RecordKey::Name(self.namespace.clone(), self.name.clone()),
        }
    }

    /// Resolve one top-level attribute to a field value.
    pub fn attribute(&self, name: &str) -> FieldValue {
        match name {
            "uid" | "pk" => self.uid.map(FieldValue::from).unwrap_or(FieldValue::Missing),
            "name" => FieldValue::from(self.name.as_str()),
            "namespace" => self.namespace.as_deref().map(FieldValue::from).unwrap_or(FieldValue::Missing),
            "labels" => FieldValue::from(&self.labels),
            "annotations" => FieldValue::from(&self.annotations),
            "resource_version" => self.resource_version.as_deref().map(FieldValue::from).unwrap_or(FieldValue::Missing),
            "creation_timestamp" => self.creation_timestamp.map(FieldValue::from).unwrap_or(FieldValue::Missing),
            other => match (self.fields.get(other), self.field_types.get(other)) {
                (Some(v), Some(ty)) => FieldValue::typed(v, *ty),
                (Some(v), None) => FieldValue::from(v),
                (None, _) => FieldValue::Missing,
            },
        }
    }
}

impl std::fmt::Display for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{} ({})", self.name, ns),
            None => write!(f, "{} (cluster-wide)", self.name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecordKey {
    Uid(Uuid),
    Name(Option<String>, String),
}

pub mod prelude {
    pub use super::{
        ConfigurationError, Error, FieldDefinition, FieldValue, Record, RecordKey, ResourceDescriptor, Result,
        Scalar, SemanticType, TransportError,
    };
}
