//! kubeset store: query sets over declared kinds and their persistence.
//!
//! ```text
//! Session ──declare──> Objects ──query()──> RecordStore ──filter/order_by/get──> RecordStore
//!                         └──save()──> ClusterApi::mutate
//! ```

#![forbid(unsafe_code)]

use std::sync::Arc;

use kubeset_core::{Result, Settings};
use kubeset_kubehub::ClusterApi;
use kubeset_schema::{KindDeclaration, KindRegistry, SchemaCache};

pub mod fetch;
pub mod objects;
pub mod payload;
pub mod queryset;

pub use fetch::{fetch_all, FetchReport, SkippedNamespace};
pub use objects::Objects;
pub use payload::{from_payload, to_payload};
pub use queryset::{GetOutcome, RecordStore};

/// Shared entry point: one API collaborator, one schema cache, one registry of declared kinds.
pub struct Session {
    api: Arc<dyn ClusterApi>,
    registry: KindRegistry,
}

impl Session {
    pub fn new(api: Arc<dyn ClusterApi>, settings: &Settings) -> Self {
        let cache = Arc::new(SchemaCache::new(api.clone(), settings.schema_ttl));
        Self { registry: KindRegistry::new(cache, settings.default_namespace.clone()), api }
    }

    pub fn api(&self) -> &Arc<dyn ClusterApi> {
        &self.api
    }

    pub fn registry(&self) -> &KindRegistry {
        &self.registry
    }

    /// Declare (or look up) a kind and return its manager.
    pub async fn objects(&self, decl: KindDeclaration) -> Result<Objects> {
        let kind = self.registry.declare(decl).await?;
        Ok(Objects::new(kind, self.api.clone()))
    }
}
