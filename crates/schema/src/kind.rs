//! Kind declaration: defaults, validation, field synthesis, memoization.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use kubeset_core::{ConfigurationError, Error, FieldDefinition, Record, ResourceDescriptor};
use kubeset_kubehub::{is_builtin_group, parse_gvk_key};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::cache::{schema_key, SchemaCache};
use crate::fields::synthesize_fields;

/// What application code states about a kind. Everything but `kind` is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KindDeclaration {
    pub group: Option<String>,
    pub version: Option<String>,
    pub kind: Option<String>,
    pub plural: Option<String>,
    pub cluster_scoped: bool,
    pub require_schema: Option<bool>,
    /// Default namespace for new records; only valid for namespace-scoped kinds.
    pub namespace: Option<String>,
    /// Explicit fields; these win over synthesized ones of the same name.
    pub fields: Vec<FieldDefinition>,
}

impl KindDeclaration {
    pub fn new(kind: impl Into<String>) -> Self {
        Self { kind: Some(kind.into()), ..Self::default() }
    }

    /// Start from `v1/Kind` or `group/v1/Kind`.
    pub fn from_gvk(key: &str) -> Option<Self> {
        let (group, version, kind) = parse_gvk_key(key)?;
        let group = if group.is_empty() { None } else { Some(group) };
        Some(Self { group, version: Some(version), kind: Some(kind), ..Self::default() })
    }

    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn plural(mut self, plural: impl Into<String>) -> Self {
        self.plural = Some(plural.into());
        self
    }

    pub fn cluster_scoped(mut self, yes: bool) -> Self {
        self.cluster_scoped = yes;
        self
    }

    pub fn require_schema(mut self, yes: bool) -> Self {
        self.require_schema = Some(yes);
        self
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn field(mut self, field: FieldDefinition) -> Self {
        self.fields.push(field);
        self
    }
}

/// `""`, `core`, a first-party group, or a dotted DNS name.
pub fn is_valid_group(group: &str) -> bool {
    if group.is_empty() || group == "core" || is_builtin_group(group) {
        return true;
    }
    group.contains('.')
        && group.split('.').all(|label| {
            !label.is_empty()
                && label.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
                && !label.starts_with('-')
                && !label.ends_with('-')
        })
}

/// A declared kind: its descriptor and record shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Kind {
    descriptor: ResourceDescriptor,
    fields: Vec<FieldDefinition>,
}

impl Kind {
    pub fn new(descriptor: ResourceDescriptor, fields: Vec<FieldDefinition>) -> Self {
        Self { descriptor, fields }
    }

    pub fn descriptor(&self) -> &ResourceDescriptor {
        &self.descriptor
    }

    pub fn fields(&self) -> &[FieldDefinition] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Unsaved record carrying field defaults and, for namespaced kinds, the default namespace.
    pub fn new_record(&self, name: impl Into<String>) -> Record {
        let mut record = Record::new(name).with_field_types(&self.fields);
        if !self.descriptor.cluster_scoped {
            record.namespace = self.descriptor.default_namespace.clone();
        }
        for f in &self.fields {
            if !f.default_value.is_null() {
                record.set_field(f.name.clone(), f.default_value.clone());
            }
        }
        record
    }
}

fn merge_fields(synthesized: Vec<FieldDefinition>, overrides: &[FieldDefinition]) -> Vec<FieldDefinition> {
    let mut out: Vec<FieldDefinition> =
        synthesized.into_iter().filter(|f| !overrides.iter().any(|o| o.name == f.name)).collect();
    out.extend(overrides.iter().cloned().map(FieldDefinition::or_type_default));
    out
}

/// First descriptor attribute in which a re-declaration disagrees with the memoized kind.
fn conflicting_field(existing: &ResourceDescriptor, new: &ResourceDescriptor) -> Option<&'static str> {
    if existing.cluster_scoped != new.cluster_scoped {
        Some("scope")
    } else if existing.plural != new.plural {
        Some("plural")
    } else if existing.default_namespace != new.default_namespace {
        Some("namespace")
    } else {
        None
    }
}

fn is_empty_schema(schema: &serde_json::Value) -> bool {
    schema.is_null() || schema.as_object().map(|m| m.is_empty()).unwrap_or(false)
}

/// Declared kinds, memoized by `group/version/kind`.
pub struct KindRegistry {
    cache: Arc<SchemaCache>,
    default_namespace: String,
    kinds: Mutex<HashMap<String, Arc<Kind>>>,
}

impl KindRegistry {
    pub fn new(cache: Arc<SchemaCache>, default_namespace: impl Into<String>) -> Self {
        Self { cache, default_namespace: default_namespace.into(), kinds: Mutex::new(HashMap::new()) }
    }

    pub fn cache(&self) -> &Arc<SchemaCache> {
        &self.cache
    }

    pub fn get(&self, gvk_key: &str) -> Option<Arc<Kind>> {
        self.kinds.lock().unwrap_or_else(PoisonError::into_inner).get(gvk_key).cloned()
    }

    pub fn len(&self) -> usize {
        self.kinds.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Validate a declaration into a descriptor without touching the cluster.
    pub fn descriptor_for(&self, decl: &KindDeclaration) -> Result<ResourceDescriptor, ConfigurationError> {
        let kind = decl.kind.clone().filter(|k| !k.is_empty()).ok_or(ConfigurationError::MissingKind)?;
        let group = decl.group.clone().unwrap_or_else(|| "core".to_string());
        if !is_valid_group(&group) {
            return Err(ConfigurationError::InvalidGroup { group, kind });
        }
        if decl.cluster_scoped {
            if let Some(ns) = &decl.namespace {
                return Err(ConfigurationError::ClusterScopedNamespace { kind, namespace: ns.clone() });
            }
        }
        let group = if group == "core" { String::new() } else { group };
        let plural = decl.plural.clone().unwrap_or_else(|| format!("{}s", kind.to_lowercase()));
        let default_namespace = if decl.cluster_scoped {
            None
        } else {
            Some(decl.namespace.clone().unwrap_or_else(|| self.default_namespace.clone()))
        };
        Ok(ResourceDescriptor {
            group,
            version: decl.version.clone().unwrap_or_else(|| "v1".to_string()),
            kind,
            plural,
            cluster_scoped: decl.cluster_scoped,
            require_schema: decl.require_schema.unwrap_or(true),
            default_namespace,
        })
    }

    /// Declare a kind. Re-declaring the same `group/version/kind` returns the
    /// first declaration without consulting the schema again, provided scope,
    /// plural and default namespace agree with it.
    pub async fn declare(&self, decl: KindDeclaration) -> Result<Arc<Kind>, Error> {
        let descriptor = self.descriptor_for(&decl)?;
        let key = descriptor.gvk_key();
        if let Some(existing) = self.get(&key) {
            if let Some(field) = conflicting_field(existing.descriptor(), &descriptor) {
                return Err(ConfigurationError::ConflictingDeclaration { gvk: key, field: field.to_string() }.into());
            }
            debug!(gvk = %key, "kind already declared");
            return Ok(existing);
        }

        let schema = self
            .cache
            .resource_schema(&descriptor.group, &descriptor.version, &descriptor.kind)
            .await?
            .filter(|s| !is_empty_schema(s));
        let synthesized = match &schema {
            Some(s) => synthesize_fields(s),
            None if descriptor.require_schema => {
                return Err(ConfigurationError::SchemaNotFound {
                    kind: descriptor.kind.clone(),
                    key: schema_key(&descriptor.group, &descriptor.version, &descriptor.kind),
                }
                .into());
            }
            None => Vec::new(),
        };
        let fields = merge_fields(synthesized, &decl.fields);
        info!(gvk = %key, fields = fields.len(), schema = schema.is_some(), "kind declared");

        let kind = Arc::new(Kind::new(descriptor, fields));
        let mut kinds = self.kinds.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(kinds.entry(key).or_insert(kind).clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::DEFAULT_TTL;
    use kubeset_core::SemanticType;
    use kubeset_kubehub::MockClusterApi;
    use serde_json::json;

    fn pod_schema() -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "apiVersion": {"type": "string"},
                "kind": {"type": "string"},
                "metadata": {"$ref": "#/definitions/io.k8s.apimachinery.pkg.apis.meta.v1.ObjectMeta"},
                "spec": {"$ref": "#/definitions/io.k8s.api.core.v1.PodSpec"},
                "status": {"$ref": "#/definitions/io.k8s.api.core.v1.PodStatus"}
            }
        })
    }

    fn registry(api: Arc<MockClusterApi>) -> KindRegistry {
        KindRegistry::new(Arc::new(SchemaCache::new(api, DEFAULT_TTL)), "default")
    }

    #[tokio::test]
    async fn declares_pod_with_defaults() {
        let api = Arc::new(MockClusterApi::new().with_definition("io.k8s.api.core.v1.Pod", pod_schema()));
        let reg = registry(api);
        let pod = reg.declare(KindDeclaration::new("Pod")).await.unwrap();
        let d = pod.descriptor();
        assert_eq!(d.group, "");
        assert_eq!(d.version, "v1");
        assert_eq!(d.plural, "pods");
        assert!(!d.cluster_scoped);
        assert_eq!(d.default_namespace.as_deref(), Some("default"));
        let names: Vec<_> = pod.fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["spec", "status"]);
    }

    #[tokio::test]
    async fn declaration_errors() {
        let api = Arc::new(MockClusterApi::new());
        let reg = registry(api);
        let err = reg.declare(KindDeclaration::default()).await.unwrap_err();
        assert!(matches!(err, Error::Configuration(ConfigurationError::MissingKind)));

        let err = reg.declare(KindDeclaration::new("Widget").group("invalid")).await.unwrap_err();
        assert!(matches!(err, Error::Configuration(ConfigurationError::InvalidGroup { .. })));

        let err = reg
            .declare(KindDeclaration::new("Namespace").cluster_scoped(true).namespace("kube-system"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(ConfigurationError::ClusterScopedNamespace { .. })));

        let err = reg.declare(KindDeclaration::new("Addon").group("k3s.cattle.io")).await.unwrap_err();
        match err {
            Error::Configuration(ConfigurationError::SchemaNotFound { key, .. }) => {
                assert_eq!(key, "io.cattle.k3s.v1.Addon")
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn optional_schema_and_overrides() {
        let api = Arc::new(MockClusterApi::new().with_definition("io.k8s.api.core.v1.Pod", pod_schema()));
        let reg = registry(api);
        let widget = reg
            .declare(
                KindDeclaration::new("Widget")
                    .group("example.com")
                    .require_schema(false)
                    .field(FieldDefinition::new("spec", SemanticType::Map)),
            )
            .await
            .unwrap();
        assert_eq!(widget.fields().len(), 1);

        let pod = reg
            .declare(KindDeclaration::new("Pod").field(FieldDefinition::new("status", SemanticType::String)))
            .await
            .unwrap();
        assert_eq!(pod.field("status").unwrap().semantic_type, SemanticType::String);
        assert_eq!(pod.field("spec").unwrap().semantic_type, SemanticType::Map);
    }

    #[tokio::test]
    async fn redeclaring_is_memoized() {
        let api = Arc::new(MockClusterApi::new().with_definition("io.k8s.api.core.v1.Pod", pod_schema()));
        let reg = KindRegistry::new(Arc::new(SchemaCache::new(api.clone(), std::time::Duration::ZERO)), "default");
        let a = reg.declare(KindDeclaration::new("Pod")).await.unwrap();
        let b = reg.declare(KindDeclaration::from_gvk("v1/Pod").unwrap()).await.unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(api.document_fetches(), 1);
        assert_eq!(reg.len(), 1);
    }

    #[tokio::test]
    async fn conflicting_redeclaration_is_rejected() {
        let api = Arc::new(MockClusterApi::new());
        let reg = registry(api);
        let widget = || KindDeclaration::new("Widget").group("example.com").require_schema(false);
        reg.declare(widget()).await.unwrap();

        let err = reg.declare(widget().cluster_scoped(true)).await.unwrap_err();
        match err {
            Error::Configuration(ConfigurationError::ConflictingDeclaration { gvk, field }) => {
                assert_eq!(gvk, "example.com/v1/Widget");
                assert_eq!(field, "scope");
            }
            other => panic!("unexpected {other:?}"),
        }
        let err = reg.declare(widget().plural("widgetz")).await.unwrap_err();
        assert!(matches!(err, Error::Configuration(ConfigurationError::ConflictingDeclaration { .. })));
        let err = reg.declare(widget().namespace("apps")).await.unwrap_err();
        assert!(matches!(err, Error::Configuration(ConfigurationError::ConflictingDeclaration { .. })));

        // same shape, different schema requirement: still the memoized kind
        assert!(reg.declare(widget().require_schema(true)).await.is_ok());
        assert_eq!(reg.len(), 1);
    }

    #[tokio::test]
    async fn new_record_uses_defaults() {
        let api = Arc::new(MockClusterApi::new());
        let reg = registry(api);
        let cm = reg
            .declare(
                KindDeclaration::new("ConfigMap")
                    .require_schema(false)
                    .namespace("apps")
                    .field(FieldDefinition::new("data", SemanticType::Map)),
            )
            .await
            .unwrap();
        let r = cm.new_record("settings");
        assert_eq!(r.namespace.as_deref(), Some("apps"));
        assert_eq!(r.field("data"), Some(&json!({})));
        assert!(r.uid.is_none());
    }

    #[test]
    fn groups() {
        assert!(is_valid_group(""));
        assert!(is_valid_group("core"));
        assert!(is_valid_group("apps"));
        assert!(is_valid_group("k3s.cattle.io"));
        assert!(!is_valid_group("invalid"));
        assert!(!is_valid_group("bad..group"));
    }
}
