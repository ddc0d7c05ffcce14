use std::sync::Arc;

use kubeset_core::{ConfigurationError, Error, SemanticType};
use kubeset_kubehub::MockClusterApi;
use kubeset_schema::{KindDeclaration, KindRegistry, SchemaCache, DEFAULT_TTL};
use serde_json::json;

const DECLARATIONS: &str = r#"
- kind: Addon
  group: k3s.cattle.io
  namespace: kube-system
- kind: ClusterRole
  group: rbac.authorization.k8s.io
  cluster_scoped: true
- kind: Widget
  group: example.com
  plural: widgetry
  require_schema: false
  fields:
    - name: spec
      semantic_type: map
"#;

fn api() -> Arc<MockClusterApi> {
    Arc::new(
        MockClusterApi::new()
            .with_definition(
                "io.cattle.k3s.v1.Addon",
                json!({"properties": {
                    "metadata": {"type": "object"},
                    "spec": {"type": "object"},
                    "status": {"type": "object"}
                }}),
            )
            .with_definition(
                "io.k8s.api.rbac.v1.ClusterRole",
                json!({"properties": {
                    "aggregationRule": {"$ref": "#/definitions/io.k8s.api.rbac.v1.AggregationRule"},
                    "rules": {"type": "array", "items": {"$ref": "#/definitions/io.k8s.api.rbac.v1.PolicyRule"}}
                }}),
            ),
    )
}

#[tokio::test]
async fn yaml_declarations_resolve() {
    let decls: Vec<KindDeclaration> = serde_yaml::from_str(DECLARATIONS).unwrap();
    let reg = KindRegistry::new(Arc::new(SchemaCache::new(api(), DEFAULT_TTL)), "default");

    let addon = reg.declare(decls[0].clone()).await.unwrap();
    assert_eq!(addon.descriptor().gvk_key(), "k3s.cattle.io/v1/Addon");
    assert_eq!(addon.descriptor().default_namespace.as_deref(), Some("kube-system"));
    assert_eq!(addon.fields().len(), 2);

    let role = reg.declare(decls[1].clone()).await.unwrap();
    assert!(role.descriptor().cluster_scoped);
    assert_eq!(role.descriptor().default_namespace, None);
    assert_eq!(role.field("rules").unwrap().semantic_type, SemanticType::List);
    assert_eq!(role.field("aggregationRule").unwrap().semantic_type, SemanticType::Map);

    let widget = reg.declare(decls[2].clone()).await.unwrap();
    assert_eq!(widget.descriptor().plural, "widgetry");
    assert_eq!(widget.field("spec").unwrap().default_value, json!({}));
    assert_eq!(reg.len(), 3);
}

#[tokio::test]
async fn empty_schema_counts_as_missing() {
    let api = Arc::new(MockClusterApi::new().with_definition("io.k8s.api.core.v1.Secret", json!({})));
    let reg = KindRegistry::new(Arc::new(SchemaCache::new(api, DEFAULT_TTL)), "default");
    let err = reg.declare(KindDeclaration::new("Secret")).await.unwrap_err();
    assert!(matches!(err, Error::Configuration(ConfigurationError::SchemaNotFound { .. })));
    assert!(reg.is_empty());
}
