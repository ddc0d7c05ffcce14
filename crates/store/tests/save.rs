mod common;

use std::sync::Arc;

use kubeset_core::{ConfigurationError, Error, FieldDefinition, SemanticType};
use kubeset_kubehub::{MockClusterApi, Verb};
use kubeset_schema::KindDeclaration;
use serde_json::json;

use common::session;

fn config_map_decl() -> KindDeclaration {
    KindDeclaration::new("ConfigMap").require_schema(false).field(FieldDefinition::new("data", SemanticType::Map))
}

#[tokio::test]
async fn new_record_is_created_then_replaced() {
    let api = Arc::new(MockClusterApi::new());
    let objects = session(&api).objects(config_map_decl()).await.unwrap();

    let mut record = objects.new_record("settings");
    record.namespace = None;
    record.set_field("data", json!({"mode": "fast"}));
    let created = objects.save(&record).await.unwrap();
    assert!(created.uid.is_some());
    assert_eq!(created.namespace.as_deref(), Some("default"));
    assert_eq!(created.field("data"), Some(&json!({"mode": "fast"})));

    let replaced = objects.save(&created).await.unwrap();
    assert_eq!(replaced.uid, created.uid);
    assert_ne!(replaced.resource_version, created.resource_version);

    let calls = api.mutations();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].0.verb, Verb::Create);
    assert_eq!(calls[0].0.operation_id, "create_namespaced_config_map");
    assert_eq!(calls[0].1["apiVersion"], "v1");
    assert_eq!(calls[0].1["kind"], "ConfigMap");
    assert_eq!(calls[1].0.operation_id, "replace_namespaced_config_map");
    assert_eq!(calls[1].0.name.as_deref(), Some("settings"));
}

#[tokio::test]
async fn custom_resources_use_custom_object_calls() {
    let api = Arc::new(MockClusterApi::new());
    let decl = KindDeclaration::new("Addon").group("k3s.cattle.io").require_schema(false).namespace("kube-system");
    let objects = session(&api).objects(decl).await.unwrap();
    objects.save(&objects.new_record("traefik")).await.unwrap();
    let mutations = api.mutations();
    let (call, body) = &mutations[0];
    assert_eq!(call.operation_id, "create_namespaced_custom_object");
    assert_eq!(call.namespace.as_deref(), Some("kube-system"));
    assert_eq!(body["apiVersion"], "k3s.cattle.io/v1");
}

#[tokio::test]
async fn cluster_scoped_record_rejects_namespace() {
    let api = Arc::new(MockClusterApi::new());
    let decl = KindDeclaration::new("Namespace").cluster_scoped(true).require_schema(false);
    let objects = session(&api).objects(decl).await.unwrap();
    let mut record = objects.new_record("team-a");
    assert_eq!(record.namespace, None);
    record.namespace = Some("default".into());
    let err = objects.save(&record).await.unwrap_err();
    assert!(matches!(err, Error::Configuration(ConfigurationError::ClusterScopedNamespace { .. })));
    assert!(api.mutations().is_empty());
}
