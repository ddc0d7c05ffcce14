//! kubeset kubehub: the remote API collaborator and operation dispatch.
//!
//! The query layer never talks to the cluster directly. It resolves a
//! [`ResourceDescriptor`] into a [`ListOperation`] or [`MutationOperation`]
//! (pure, see [`dispatch`]) and hands the resulting call to a [`ClusterApi`].

#![forbid(unsafe_code)]

use async_trait::async_trait;
use kubeset_core::{ResourceDescriptor, TransportError};
use serde::{Deserialize, Serialize};

pub mod builtin;
pub mod dispatch;
pub mod kube_api;
pub mod mock;

pub use builtin::{is_builtin_group, snake_case, BuiltinSurface, BUILTIN_GROUPS};
pub use dispatch::{resolve_list, resolve_mutation, ListOperation, MutationOperation};
pub use kube_api::{connect, load_config, KubeClusterApi};
pub use mock::MockClusterApi;

/// Group/version/kind/plural of the resource a call addresses.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceCoords {
    /// Empty for the core group.
    pub group: String,
    pub version: String,
    pub kind: String,
    pub plural: String,
}

impl ResourceCoords {
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }
}

impl From<&ResourceDescriptor> for ResourceCoords {
    fn from(d: &ResourceDescriptor) -> Self {
        let group = if d.group == "core" { String::new() } else { d.group.clone() };
        Self { group, version: d.version.clone(), kind: d.kind.clone(), plural: d.plural.clone() }
    }
}

/// One concrete listing request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListCall {
    pub operation_id: String,
    pub resource: ResourceCoords,
    /// `None` lists cluster-wide (or across all namespaces for namespaced kinds).
    pub namespace: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verb {
    Create,
    Replace,
}

impl Verb {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Create => "create",
            Verb::Replace => "replace",
        }
    }
}

/// One concrete create/replace request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationCall {
    pub operation_id: String,
    pub verb: Verb,
    pub resource: ResourceCoords,
    pub namespace: Option<String>,
    /// Target object name; required for `Replace`.
    pub name: Option<String>,
}

/// The set of named operations the remote API offers.
pub trait ApiSurface: Send + Sync {
    fn has_operation(&self, group: &str, version: &str, operation_id: &str) -> bool;
}

/// Remote API collaborator. Implementations return decoded payloads or a
/// [`TransportError`] carrying the HTTP status when there is one.
#[async_trait]
pub trait ClusterApi: ApiSurface {
    /// Capability document (`/openapi/v2`).
    async fn openapi_document(&self) -> Result<serde_json::Value, TransportError>;

    async fn list(&self, call: &ListCall) -> Result<Vec<serde_json::Value>, TransportError>;

    /// Names of every namespace in the cluster.
    async fn list_namespaces(&self) -> Result<Vec<String>, TransportError>;

    async fn mutate(&self, call: &MutationCall, body: serde_json::Value) -> Result<serde_json::Value, TransportError>;
}

/// Parse `v1/Kind` or `group/v1/Kind`.
pub fn parse_gvk_key(key: &str) -> Option<(String, String, String)> {
    let parts: Vec<&str> = key.split('/').collect();
    match parts.as_slice() {
        [version, kind] if !version.is_empty() && !kind.is_empty() => {
            Some((String::new(), (*version).to_string(), (*kind).to_string()))
        }
        [group, version, kind] if !version.is_empty() && !kind.is_empty() => {
            Some(((*group).to_string(), (*version).to_string(), (*kind).to_string()))
        }
        _ => None,
    }
}
