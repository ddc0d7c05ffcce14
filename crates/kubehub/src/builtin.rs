//! First-party API groups and the operation surface they ship.

use std::any::TypeId;
use std::collections::HashSet;

use k8s_openapi::{NamespaceResourceScope, Resource};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::ApiSurface;

/// API groups served by the orchestrator itself. Everything else is a custom resource.
pub const BUILTIN_GROUPS: &[&str] = &[
    "",
    "core",
    "admission.k8s.io",
    "admissionregistration.k8s.io",
    "apiextensions.k8s.io",
    "apiregistration.k8s.io",
    "apps",
    "authentication.k8s.io",
    "authorization.k8s.io",
    "autoscaling",
    "batch",
    "certificates.k8s.io",
    "coordination.k8s.io",
    "discovery.k8s.io",
    "events.k8s.io",
    "extensions",
    "flowcontrol.apiserver.k8s.io",
    "imagepolicy.k8s.io",
    "internal.apiserver.k8s.io",
    "metrics.k8s.io",
    "networking.k8s.io",
    "node.k8s.io",
    "policy",
    "rbac.authorization.k8s.io",
    "resource.k8s.io",
    "scheduling.k8s.io",
    "storage.k8s.io",
    "storagemigration.k8s.io",
];

pub fn is_builtin_group(group: &str) -> bool {
    BUILTIN_GROUPS.contains(&group)
}

static CAMEL_BOUNDARY: Lazy<Regex> = Lazy::new(|| Regex::new(r"([a-z])([A-Z])").expect("static regex"));

/// `RoleBinding` -> `role_binding`; acronym runs are not split (`CSIDriver` -> `csidriver`).
pub fn snake_case(kind: &str) -> String {
    CAMEL_BOUNDARY.replace_all(kind, "${1}_${2}").to_lowercase()
}

fn surface_key(group: &str, version: &str, operation_id: &str) -> String {
    format!("{}/{}:{}", group, version, operation_id)
}

/// Operation names offered for built-in kinds, derived from k8s-openapi types.
#[derive(Debug, Clone, Default)]
pub struct BuiltinSurface {
    ops: HashSet<String>,
}

impl BuiltinSurface {
    /// Shared surface for the k8s-openapi version this crate is built against.
    pub fn k8s_openapi() -> &'static BuiltinSurface {
        static SURFACE: Lazy<BuiltinSurface> = Lazy::new(BuiltinSurface::from_k8s_openapi);
        &SURFACE
    }

    /// Register the list/create/replace operations of one kind.
    pub fn insert_kind(&mut self, group: &str, version: &str, kind: &str, namespaced: bool) {
        let s = snake_case(kind);
        let ops = if namespaced {
            vec![
                format!("list_namespaced_{}", s),
                format!("list_{}_for_all_namespaces", s),
                format!("create_namespaced_{}", s),
                format!("replace_namespaced_{}", s),
            ]
        } else {
            vec![format!("list_{}", s), format!("create_{}", s), format!("replace_{}", s)]
        };
        for op in ops {
            self.ops.insert(surface_key(group, version, &op));
        }
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    fn insert_type<K>(&mut self)
    where
        K: Resource + 'static,
    {
        let namespaced = TypeId::of::<K::Scope>() == TypeId::of::<NamespaceResourceScope>();
        self.insert_kind(K::GROUP, K::VERSION, K::KIND, namespaced);
    }

    fn from_k8s_openapi() -> Self {
        use k8s_openapi::api::{
            apps::v1::{ControllerRevision, DaemonSet, Deployment, ReplicaSet, StatefulSet},
            autoscaling::v2::HorizontalPodAutoscaler,
            batch::v1::{CronJob, Job},
            certificates::v1::CertificateSigningRequest,
            coordination::v1::Lease,
            core::v1::{
                ConfigMap, Endpoints, Event, LimitRange, Namespace, Node, PersistentVolume, PersistentVolumeClaim,
                Pod, ReplicationController, ResourceQuota, Secret, Service, ServiceAccount,
            },
            discovery::v1::EndpointSlice,
            networking::v1::{Ingress, IngressClass, NetworkPolicy},
            node::v1::RuntimeClass,
            policy::v1::PodDisruptionBudget,
            rbac::v1::{ClusterRole, ClusterRoleBinding, Role, RoleBinding},
            scheduling::v1::PriorityClass,
            storage::v1::{CSIDriver, StorageClass, VolumeAttachment},
        };
        use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;

        let mut s = BuiltinSurface::default();
        macro_rules! register {
            ($($ty:ty),* $(,)?) => { $( s.insert_type::<$ty>(); )* };
        }
        register!(
            ConfigMap, Endpoints, Event, LimitRange, Namespace, Node, PersistentVolume, PersistentVolumeClaim, Pod,
            ReplicationController, ResourceQuota, Secret, Service, ServiceAccount,
            ControllerRevision, DaemonSet, Deployment, ReplicaSet, StatefulSet,
            HorizontalPodAutoscaler, CronJob, Job, CertificateSigningRequest, Lease, EndpointSlice,
            Ingress, IngressClass, NetworkPolicy, RuntimeClass, PodDisruptionBudget,
            ClusterRole, ClusterRoleBinding, Role, RoleBinding, PriorityClass,
            CSIDriver, StorageClass, VolumeAttachment, CustomResourceDefinition,
        );
        s
    }
}

impl ApiSurface for BuiltinSurface {
    fn has_operation(&self, group: &str, version: &str, operation_id: &str) -> bool {
        let group = if group == "core" { "" } else { group };
        self.ops.contains(&surface_key(group, version, operation_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snake_case_follows_client_naming() {
        assert_eq!(snake_case("Pod"), "pod");
        assert_eq!(snake_case("RoleBinding"), "role_binding");
        assert_eq!(snake_case("CustomResourceDefinition"), "custom_resource_definition");
        assert_eq!(snake_case("CSIDriver"), "csidriver");
    }

    #[test]
    fn builtin_groups() {
        assert!(is_builtin_group(""));
        assert!(is_builtin_group("core"));
        assert!(is_builtin_group("rbac.authorization.k8s.io"));
        assert!(!is_builtin_group("k3s.cattle.io"));
        assert!(!is_builtin_group("invalid"));
    }

    #[test]
    fn k8s_openapi_surface_knows_scopes() {
        let s = BuiltinSurface::k8s_openapi();
        assert!(s.has_operation("", "v1", "list_pod_for_all_namespaces"));
        assert!(s.has_operation("core", "v1", "list_namespace"));
        assert!(!s.has_operation("", "v1", "list_namespace_for_all_namespaces"));
        assert!(s.has_operation("rbac.authorization.k8s.io", "v1", "create_namespaced_role_binding"));
        assert!(s.has_operation("rbac.authorization.k8s.io", "v1", "list_cluster_role"));
        assert!(!s.has_operation("apps", "v1beta1", "list_deployment_for_all_namespaces"));
    }

    #[test]
    fn manual_surface() {
        let mut s = BuiltinSurface::default();
        assert!(s.is_empty());
        s.insert_kind("apps", "v1", "Deployment", true);
        assert_eq!(s.len(), 4);
        assert!(s.has_operation("apps", "v1", "replace_namespaced_deployment"));
    }
}
