//! One-shot listing of every instance of a kind.

use std::sync::Arc;
use std::time::Instant;

use kubeset_core::{Error, Record, TransportError};
use kubeset_kubehub::{resolve_list, ClusterApi, ListOperation};
use kubeset_schema::Kind;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::payload::from_payload;

/// A namespace whose probe failed with something other than "not found".
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedNamespace {
    pub namespace: String,
    pub error: TransportError,
}

/// How a fetch went. Only per-namespace listings can be partial.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FetchReport {
    pub operation: String,
    pub namespaces_probed: usize,
    /// Namespaces that answered "not found".
    pub absent: Vec<String>,
    pub skipped: Vec<SkippedNamespace>,
}

impl FetchReport {
    pub fn is_partial(&self) -> bool {
        !self.skipped.is_empty()
    }
}

async fn list_per_namespace(
    api: &dyn ClusterApi,
    op: &ListOperation,
    report: &mut FetchReport,
) -> Result<Vec<serde_json::Value>, TransportError> {
    let namespaces = api.list_namespaces().await?;
    let mut items = Vec::new();
    for ns in namespaces {
        report.namespaces_probed += 1;
        match api.list(&op.call(Some(&ns))).await {
            Ok(mut batch) => items.append(&mut batch),
            Err(e) if e.is_not_found() => {
                debug!(namespace = %ns, plural = %op.resource().plural, "resource not present in namespace");
                report.absent.push(ns);
            }
            Err(e) => {
                warn!(namespace = %ns, plural = %op.resource().plural, error = %e, "namespace probe failed; skipping");
                metrics::counter!("store_namespace_probe_skipped_total", 1u64, "plural" => op.resource().plural.clone());
                report.skipped.push(SkippedNamespace { namespace: ns, error: e });
            }
        }
    }
    Ok(items)
}

/// List and deserialize every instance of `kind`. Any fault outside a
/// per-namespace probe, or any malformed payload, fails the whole fetch.
pub async fn fetch_all(api: &dyn ClusterApi, kind: &Kind) -> Result<(Vec<Arc<Record>>, FetchReport), Error> {
    let desc = kind.descriptor();
    let started = Instant::now();
    let op = resolve_list(desc, api)?;
    let mut report = FetchReport { operation: op.operation_id().to_string(), ..FetchReport::default() };
    let mode = match &op {
        ListOperation::Builtin { .. } => "builtin",
        ListOperation::ClusterCustom { .. } => "cluster_custom",
        ListOperation::PerNamespaceCustom { .. } => "per_namespace",
    };
    metrics::counter!("store_fetch_total", 1u64, "mode" => mode);

    let raw = match &op {
        ListOperation::PerNamespaceCustom { .. } => list_per_namespace(api, &op, &mut report).await,
        _ => api.list(&op.call(None)).await,
    }
    .map_err(|e| {
        warn!(gvk = %desc.gvk_key(), op = %report.operation, error = %e, "fetch failed");
        e
    })?;

    let records = raw
        .iter()
        .map(|item| from_payload(kind, item).map(Arc::new))
        .collect::<Result<Vec<_>, _>>()?;

    let took_ms = started.elapsed().as_secs_f64() * 1000.0;
    metrics::histogram!("store_fetch_ms", took_ms, "mode" => mode);
    metrics::histogram!("store_fetch_records", records.len() as f64, "mode" => mode);
    info!(
        gvk = %desc.gvk_key(),
        op = %report.operation,
        records = records.len(),
        skipped = report.skipped.len(),
        took_ms = took_ms as u64,
        "fetched"
    );
    Ok((records, report))
}
