//! In-memory [`ClusterApi`] for tests and offline demos.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use kubeset_core::TransportError;
use serde_json::{json, Value};

use crate::{ApiSurface, BuiltinSurface, ClusterApi, ListCall, MutationCall, Verb};

type ListKey = (String, Option<String>);

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Scripted cluster: list responses are keyed by `(plural, namespace)`, where
/// a `None` namespace answers cluster-wide and all-namespace listings.
/// Unscripted listings return an empty list.
pub struct MockClusterApi {
    document: Mutex<Value>,
    document_fault: Mutex<Option<TransportError>>,
    items: Mutex<HashMap<ListKey, Vec<Value>>>,
    faults: Mutex<HashMap<ListKey, TransportError>>,
    namespaces: Mutex<Vec<String>>,
    surface: BuiltinSurface,
    use_k8s_surface: bool,
    document_fetches: AtomicUsize,
    namespace_listings: AtomicUsize,
    list_calls: Mutex<Vec<ListCall>>,
    mutations: Mutex<Vec<(MutationCall, Value)>>,
    next_version: AtomicU64,
}

impl Default for MockClusterApi {
    fn default() -> Self {
        Self {
            document: Mutex::new(json!({ "definitions": {} })),
            document_fault: Mutex::new(None),
            items: Mutex::new(HashMap::new()),
            faults: Mutex::new(HashMap::new()),
            namespaces: Mutex::new(Vec::new()),
            surface: BuiltinSurface::default(),
            use_k8s_surface: true,
            document_fetches: AtomicUsize::new(0),
            namespace_listings: AtomicUsize::new(0),
            list_calls: Mutex::new(Vec::new()),
            mutations: Mutex::new(Vec::new()),
            next_version: AtomicU64::new(1),
        }
    }
}

impl MockClusterApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(self, doc: Value) -> Self {
        *lock(&self.document) = doc;
        self
    }

    /// Add one `definitions` entry to the capability document.
    pub fn with_definition(self, key: &str, schema: Value) -> Self {
        {
            let mut doc = lock(&self.document);
            if !doc.get("definitions").map(Value::is_object).unwrap_or(false) {
                doc["definitions"] = json!({});
            }
            doc["definitions"][key] = schema;
        }
        self
    }

    pub fn with_items(self, plural: &str, namespace: Option<&str>, items: Vec<Value>) -> Self {
        lock(&self.items).insert((plural.to_string(), namespace.map(str::to_string)), items);
        self
    }

    pub fn with_list_fault(self, plural: &str, namespace: Option<&str>, err: TransportError) -> Self {
        lock(&self.faults).insert((plural.to_string(), namespace.map(str::to_string)), err);
        self
    }

    pub fn with_namespaces(self, namespaces: &[&str]) -> Self {
        *lock(&self.namespaces) = namespaces.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Replace the k8s-openapi surface with an explicit one.
    pub fn with_surface(mut self, surface: BuiltinSurface) -> Self {
        self.surface = surface;
        self.use_k8s_surface = false;
        self
    }

    pub fn set_document(&self, doc: Value) {
        *lock(&self.document) = doc;
    }

    pub fn set_document_fault(&self, err: Option<TransportError>) {
        *lock(&self.document_fault) = err;
    }

    pub fn document_fetches(&self) -> usize {
        self.document_fetches.load(Ordering::SeqCst)
    }

    pub fn namespace_listings(&self) -> usize {
        self.namespace_listings.load(Ordering::SeqCst)
    }

    pub fn list_calls(&self) -> Vec<ListCall> {
        lock(&self.list_calls).clone()
    }

    pub fn mutations(&self) -> Vec<(MutationCall, Value)> {
        lock(&self.mutations).clone()
    }
}

impl ApiSurface for MockClusterApi {
    fn has_operation(&self, group: &str, version: &str, operation_id: &str) -> bool {
        if self.use_k8s_surface {
            BuiltinSurface::k8s_openapi().has_operation(group, version, operation_id)
        } else {
            self.surface.has_operation(group, version, operation_id)
        }
    }
}

#[async_trait]
impl ClusterApi for MockClusterApi {
    async fn openapi_document(&self) -> Result<Value, TransportError> {
        self.document_fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = lock(&self.document_fault).clone() {
            return Err(err);
        }
        Ok(lock(&self.document).clone())
    }

    async fn list(&self, call: &ListCall) -> Result<Vec<Value>, TransportError> {
        lock(&self.list_calls).push(call.clone());
        let key = (call.resource.plural.clone(), call.namespace.clone());
        if let Some(err) = lock(&self.faults).get(&key) {
            return Err(err.clone());
        }
        Ok(lock(&self.items).get(&key).cloned().unwrap_or_default())
    }

    async fn list_namespaces(&self) -> Result<Vec<String>, TransportError> {
        self.namespace_listings.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = lock(&self.faults).get(&("namespaces".to_string(), None)) {
            return Err(err.clone());
        }
        Ok(lock(&self.namespaces).clone())
    }

    /// Echoes the body back, assigning a uid on create and a fresh resourceVersion.
    async fn mutate(&self, call: &MutationCall, body: Value) -> Result<Value, TransportError> {
        if call.verb == Verb::Replace && call.name.is_none() {
            return Err(TransportError::new(Some(422), "replace requires an object name"));
        }
        let mut out = body.clone();
        if !out.get("metadata").map(Value::is_object).unwrap_or(false) {
            return Err(TransportError::new(Some(422), "body has no metadata"));
        }
        let version = self.next_version.fetch_add(1, Ordering::SeqCst);
        let meta = &mut out["metadata"];
        if call.verb == Verb::Create {
            meta["uid"] = Value::String(format!("00000000-0000-0000-0000-{:012}", version));
        }
        meta["resourceVersion"] = Value::String(version.to_string());
        lock(&self.mutations).push((call.clone(), body));
        Ok(out)
    }
}
