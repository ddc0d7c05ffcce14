//! Resolve a resource descriptor to the remote operation that lists or
//! mutates it. Resolution is a pure function of the descriptor and the API
//! surface; nothing here performs I/O.

use kubeset_core::{ConfigurationError, ResourceDescriptor};
use tracing::debug;

use crate::builtin::{is_builtin_group, snake_case};
use crate::{ApiSurface, ListCall, MutationCall, ResourceCoords, Verb};

pub const LIST_CLUSTER_CUSTOM_OBJECT: &str = "list_cluster_custom_object";
pub const LIST_NAMESPACED_CUSTOM_OBJECT: &str = "list_namespaced_custom_object";
pub const LIST_NAMESPACE: &str = "list_namespace";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListOperation {
    /// Named first-party operation: cluster-wide for cluster-scoped kinds,
    /// `_for_all_namespaces` for namespaced kinds.
    Builtin { operation_id: String, resource: ResourceCoords },
    /// Generic custom-resource listing parameterized by group/version/plural.
    ClusterCustom { resource: ResourceCoords },
    /// Enumerate namespaces, then list the custom resource in each one.
    PerNamespaceCustom { resource: ResourceCoords },
}

impl ListOperation {
    pub fn operation_id(&self) -> &str {
        match self {
            ListOperation::Builtin { operation_id, .. } => operation_id,
            ListOperation::ClusterCustom { .. } => LIST_CLUSTER_CUSTOM_OBJECT,
            ListOperation::PerNamespaceCustom { .. } => LIST_NAMESPACED_CUSTOM_OBJECT,
        }
    }

    pub fn resource(&self) -> &ResourceCoords {
        match self {
            ListOperation::Builtin { resource, .. }
            | ListOperation::ClusterCustom { resource }
            | ListOperation::PerNamespaceCustom { resource } => resource,
        }
    }

    /// Concrete call for one namespace (`None` = cluster-wide / all namespaces).
    pub fn call(&self, namespace: Option<&str>) -> ListCall {
        ListCall {
            operation_id: self.operation_id().to_string(),
            resource: self.resource().clone(),
            namespace: namespace.map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationOperation {
    pub operation_id: String,
    pub verb: Verb,
    pub resource: ResourceCoords,
    pub namespaced: bool,
}

impl MutationOperation {
    pub fn call(&self, namespace: Option<&str>, name: Option<&str>) -> MutationCall {
        MutationCall {
            operation_id: self.operation_id.clone(),
            verb: self.verb,
            resource: self.resource.clone(),
            namespace: if self.namespaced { namespace.map(str::to_string) } else { None },
            name: name.map(str::to_string),
        }
    }
}

fn ensure_resolvable(desc: &ResourceDescriptor) -> Result<(), ConfigurationError> {
    if desc.kind.is_empty() || desc.version.is_empty() || desc.plural.is_empty() {
        return Err(ConfigurationError::UnsupportedResource(format!(
            "{}/{}/{} (plural {:?})",
            desc.group, desc.version, desc.kind, desc.plural
        )));
    }
    Ok(())
}

pub fn resolve_list<S>(desc: &ResourceDescriptor, surface: &S) -> Result<ListOperation, ConfigurationError>
where
    S: ApiSurface + ?Sized,
{
    ensure_resolvable(desc)?;
    let resource = ResourceCoords::from(desc);
    if is_builtin_group(&desc.group) {
        let snake = snake_case(&desc.kind);
        let operation_id = if desc.cluster_scoped {
            format!("list_{}", snake)
        } else {
            format!("list_{}_for_all_namespaces", snake)
        };
        if surface.has_operation(&resource.group, &resource.version, &operation_id) {
            debug!(gvk = %desc.gvk_key(), op = %operation_id, "resolved builtin list operation");
            return Ok(ListOperation::Builtin { operation_id, resource });
        }
        debug!(gvk = %desc.gvk_key(), op = %operation_id, "builtin operation not offered; using custom-object listing");
    }
    Ok(if desc.cluster_scoped {
        ListOperation::ClusterCustom { resource }
    } else {
        ListOperation::PerNamespaceCustom { resource }
    })
}

pub fn resolve_mutation<S>(desc: &ResourceDescriptor, verb: Verb, surface: &S) -> Result<MutationOperation, ConfigurationError>
where
    S: ApiSurface + ?Sized,
{
    ensure_resolvable(desc)?;
    let resource = ResourceCoords::from(desc);
    let namespaced = !desc.cluster_scoped;
    if is_builtin_group(&desc.group) {
        let snake = snake_case(&desc.kind);
        let operation_id = if namespaced {
            format!("{}_namespaced_{}", verb.as_str(), snake)
        } else {
            format!("{}_{}", verb.as_str(), snake)
        };
        if surface.has_operation(&resource.group, &resource.version, &operation_id) {
            return Ok(MutationOperation { operation_id, verb, resource, namespaced });
        }
        debug!(gvk = %desc.gvk_key(), op = %operation_id, "builtin mutation not offered; using custom-object call");
    }
    let operation_id = if namespaced {
        format!("{}_namespaced_custom_object", verb.as_str())
    } else {
        format!("{}_cluster_custom_object", verb.as_str())
    };
    Ok(MutationOperation { operation_id, verb, resource, namespaced })
}
