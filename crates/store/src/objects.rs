//! Per-kind manager: query entry point, record factory and persistence.

use std::sync::Arc;

use kubeset_core::{ConfigurationError, Record, ResourceDescriptor, Result};
use kubeset_kubehub::{resolve_mutation, ClusterApi, Verb};
use kubeset_schema::Kind;
use tracing::info;

use crate::payload::{from_payload, to_payload};
use crate::queryset::RecordStore;

#[derive(Clone)]
pub struct Objects {
    kind: Arc<Kind>,
    api: Arc<dyn ClusterApi>,
}

impl Objects {
    pub fn new(kind: Arc<Kind>, api: Arc<dyn ClusterApi>) -> Self {
        Self { kind, api }
    }

    pub fn kind(&self) -> &Arc<Kind> {
        &self.kind
    }

    pub fn descriptor(&self) -> &ResourceDescriptor {
        self.kind.descriptor()
    }

    /// A new, unfetched store.
    pub fn query(&self) -> RecordStore {
        RecordStore::new(self.kind.clone(), self.api.clone())
    }

    pub fn new_record(&self, name: impl Into<String>) -> Record {
        self.kind.new_record(name)
    }

    /// Create the record when it has no uid yet, replace it otherwise.
    /// Returns the record as the server stored it.
    pub async fn save(&self, record: &Record) -> Result<Record> {
        let desc = self.descriptor();
        let mut record = record.clone();
        if desc.cluster_scoped {
            if let Some(ns) = &record.namespace {
                return Err(ConfigurationError::ClusterScopedNamespace { kind: desc.kind.clone(), namespace: ns.clone() }.into());
            }
        } else if record.namespace.is_none() {
            record.namespace = desc.default_namespace.clone();
        }

        let verb = if record.uid.is_none() { Verb::Create } else { Verb::Replace };
        let op = resolve_mutation(desc, verb, self.api.as_ref())?;
        let call = op.call(record.namespace.as_deref(), Some(&record.name));
        let response = self.api.mutate(&call, to_payload(desc, &record)).await?;
        let saved = from_payload(&self.kind, &response)?;
        info!(gvk = %desc.gvk_key(), op = %call.operation_id, record = %saved, "saved");
        Ok(saved)
    }
}
