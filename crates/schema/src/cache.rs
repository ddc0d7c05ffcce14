//! Memoized capability document.

use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwapOption;
use kubeset_core::TransportError;
use kubeset_kubehub::{is_builtin_group, ClusterApi};
use serde_json::Value;
use tracing::{debug, warn};

pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

struct CachedDocument {
    fetched_at: Instant,
    document: Arc<Value>,
}

/// One process-wide slot holding the last fetched document. Readers never
/// block each other; a refresh swaps the slot atomically.
pub struct SchemaCache {
    api: Arc<dyn ClusterApi>,
    ttl: Duration,
    slot: ArcSwapOption<CachedDocument>,
    refresh: tokio::sync::Mutex<()>,
}

impl SchemaCache {
    pub fn new(api: Arc<dyn ClusterApi>, ttl: Duration) -> Self {
        Self { api, ttl, slot: ArcSwapOption::empty(), refresh: tokio::sync::Mutex::new(()) }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn api(&self) -> &Arc<dyn ClusterApi> {
        &self.api
    }

    fn fresh(&self) -> Option<Arc<Value>> {
        let guard = self.slot.load();
        match guard.as_ref() {
            Some(c) if c.fetched_at.elapsed() < self.ttl => Some(c.document.clone()),
            _ => None,
        }
    }

    /// The capability document, refetched once older than the TTL.
    pub async fn document(&self) -> Result<Arc<Value>, TransportError> {
        if let Some(doc) = self.fresh() {
            metrics::counter!("schema_document_cache_hit_total", 1u64);
            return Ok(doc);
        }
        // serialize refreshes; a concurrent caller may have refilled the slot meanwhile
        let _refresh = self.refresh.lock().await;
        if let Some(doc) = self.fresh() {
            metrics::counter!("schema_document_cache_hit_total", 1u64);
            return Ok(doc);
        }
        let started = Instant::now();
        let document = Arc::new(self.api.openapi_document().await?);
        metrics::counter!("schema_document_fetch_total", 1u64);
        debug!(took_ms = %started.elapsed().as_millis(), "capability document fetched");
        self.slot.store(Some(Arc::new(CachedDocument { fetched_at: Instant::now(), document: document.clone() })));
        Ok(document)
    }

    pub fn invalidate(&self) {
        self.slot.store(None);
    }

    /// Schema of one kind, or `None` when the document has no entry for it.
    pub async fn resource_schema(&self, group: &str, version: &str, kind: &str) -> Result<Option<Value>, TransportError> {
        let doc = self.document().await?;
        let key = schema_key(group, version, kind);
        match doc.get("definitions").and_then(|d| d.get(&key)) {
            Some(schema) => Ok(Some(schema.clone())),
            None => {
                warn!(%key, "no schema entry in capability document");
                Ok(None)
            }
        }
    }
}

/// Groups served by aggregated API servers, whose definitions live outside `io.k8s.api`.
const SCHEMA_PREFIX_OVERRIDES: [(&str, &str); 2] = [
    ("apiextensions.k8s.io", "io.k8s.apiextensions-apiserver.pkg.apis.apiextensions"),
    ("apiregistration.k8s.io", "io.k8s.kube-aggregator.pkg.apis.apiregistration"),
];

/// Key of a kind's entry in the document's `definitions` map.
///
/// `rbac.authorization.k8s.io/v1/Role` -> `io.k8s.api.rbac.v1.Role`,
/// `k3s.cattle.io/v1/Addon` -> `io.cattle.k3s.v1.Addon`.
pub fn schema_key(group: &str, version: &str, kind: &str) -> String {
    if group.is_empty() || group == "core" {
        return format!("io.k8s.api.core.{}.{}", version, kind);
    }
    if let Some((_, prefix)) = SCHEMA_PREFIX_OVERRIDES.iter().find(|(g, _)| *g == group) {
        return format!("{}.{}.{}", prefix, version, kind);
    }
    if is_builtin_group(group) {
        let short = group.strip_suffix(".k8s.io").unwrap_or(group);
        let first = short.split('.').next().unwrap_or(short);
        return format!("io.k8s.api.{}.{}.{}", first, version, kind);
    }
    let reversed: Vec<&str> = group.split('.').rev().collect();
    format!("{}.{}.{}", reversed.join("."), version, kind)
}
