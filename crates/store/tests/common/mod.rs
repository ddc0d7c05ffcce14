#![allow(dead_code)]

use std::sync::Arc;

use kubeset_core::Settings;
use kubeset_kubehub::MockClusterApi;
use kubeset_store::Session;
use serde_json::{json, Value};

pub fn obj(name: &str, ns: Option<&str>, labels: Value) -> Value {
    let mut meta = json!({ "name": name, "labels": labels });
    if let Some(ns) = ns {
        meta["namespace"] = json!(ns);
    }
    json!({ "metadata": meta, "spec": {} })
}

pub fn pod_schema() -> Value {
    json!({"properties": {
        "apiVersion": {"type": "string"},
        "kind": {"type": "string"},
        "metadata": {"type": "object"},
        "spec": {"type": "object"},
        "status": {"type": "object"}
    }})
}

pub fn pods() -> Vec<Value> {
    vec![
        obj("pod1", Some("default"), json!({"app": "myapp", "env": "prod"})),
        obj("pod2", Some("kube-system"), json!({"app": "system", "env": "prod"})),
        obj("pod3", Some("default"), json!({"app": "myapp", "env": "dev"})),
    ]
}

pub fn session(api: &Arc<MockClusterApi>) -> Session {
    Session::new(api.clone(), &Settings::default())
}
