//! OpenAPI property -> field definition.

use kubeset_core::{is_structural, FieldDefinition, SemanticType};
use serde_json::Value;

/// Map one property schema onto a field. Unknown shapes become maps; this never fails.
pub fn field_for_property(name: &str, schema: &Value) -> FieldDefinition {
    let ty = schema.get("type").and_then(Value::as_str);
    let format = schema.get("format").and_then(Value::as_str);
    let semantic = match (ty, format) {
        (Some("string"), Some("date-time")) => SemanticType::Timestamp,
        (Some("string"), _) => SemanticType::String,
        (Some("integer"), _) => SemanticType::Integer,
        (Some("number"), _) => SemanticType::Float,
        (Some("boolean"), _) => SemanticType::Bool,
        (Some("array"), _) => SemanticType::List,
        _ => SemanticType::Map,
    };
    FieldDefinition::new(name, semantic)
}

/// One field per top-level property, skipping `metadata`, `apiVersion` and `kind`.
pub fn synthesize_fields(schema: &Value) -> Vec<FieldDefinition> {
    let Some(props) = schema.get("properties").and_then(Value::as_object) else {
        return Vec::new();
    };
    props
        .iter()
        .filter(|(name, _)| !is_structural(name))
        .map(|(name, prop)| field_for_property(name, prop))
        .collect()
}
