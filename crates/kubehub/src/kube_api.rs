//! kube-rs backed [`ClusterApi`].

use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Namespace;
use kube::{
    api::{Api, ListParams, PostParams},
    config::{KubeConfigOptions, Kubeconfig},
    core::{ApiResource, DynamicObject},
    Client, Config,
};
use kubeset_core::TransportError;
use tracing::{debug, info};

use crate::{ApiSurface, BuiltinSurface, ClusterApi, ListCall, MutationCall, ResourceCoords, Verb};

/// Resolve client configuration.
///
/// An explicit kubeconfig file or context loads that kubeconfig (the default
/// file when only a context is given). With neither, the in-cluster service
/// account is tried first and the default kubeconfig second.
pub async fn load_config(kubeconfig: Option<&Path>, context: Option<&str>) -> Result<Config> {
    let opts = KubeConfigOptions { context: context.map(str::to_string), ..Default::default() };
    match (kubeconfig, context) {
        (Some(path), _) => {
            info!(path = %path.display(), "loading kubeconfig");
            let kc = Kubeconfig::read_from(path).with_context(|| format!("reading kubeconfig {}", path.display()))?;
            Config::from_custom_kubeconfig(kc, &opts)
                .await
                .with_context(|| format!("loading kubeconfig {} (context {:?})", path.display(), context))
        }
        (None, Some(ctx)) => {
            Config::from_kubeconfig(&opts).await.with_context(|| format!("loading kubeconfig context {}", ctx))
        }
        (None, None) => match Config::incluster() {
            Ok(config) => Ok(config),
            Err(e) => {
                info!(error = %e, "in-cluster config unavailable; falling back to default kubeconfig");
                Config::from_kubeconfig(&opts).await.context("loading default kubeconfig")
            }
        },
    }
}

pub async fn connect(kubeconfig: Option<&Path>, context: Option<&str>) -> Result<KubeClusterApi> {
    let config = load_config(kubeconfig, context).await?;
    let client = Client::try_from(config).context("building kube client")?;
    info!(kubeconfig = ?kubeconfig, context = ?context, "kube client ready");
    Ok(KubeClusterApi::new(client))
}

pub struct KubeClusterApi {
    client: Client,
    surface: &'static BuiltinSurface,
}

impl KubeClusterApi {
    pub fn new(client: Client) -> Self {
        Self { client, surface: BuiltinSurface::k8s_openapi() }
    }

    fn dynamic_api(&self, resource: &ResourceCoords, namespace: Option<&str>) -> Api<DynamicObject> {
        let ar = api_resource(resource);
        match namespace {
            Some(ns) => Api::namespaced_with(self.client.clone(), ns, &ar),
            None => Api::all_with(self.client.clone(), &ar),
        }
    }
}

fn api_resource(r: &ResourceCoords) -> ApiResource {
    ApiResource {
        group: r.group.clone(),
        version: r.version.clone(),
        api_version: r.api_version(),
        kind: r.kind.clone(),
        plural: r.plural.clone(),
    }
}

fn transport_error(e: kube::Error) -> TransportError {
    match e {
        kube::Error::Api(resp) => TransportError::new(Some(resp.code), resp.message),
        other => TransportError::new(None, other.to_string()),
    }
}

fn encode<T: serde::Serialize>(obj: &T) -> Result<serde_json::Value, TransportError> {
    serde_json::to_value(obj).map_err(|e| TransportError::new(None, format!("encoding response: {}", e)))
}

impl ApiSurface for KubeClusterApi {
    fn has_operation(&self, group: &str, version: &str, operation_id: &str) -> bool {
        self.surface.has_operation(group, version, operation_id)
    }
}

#[async_trait]
impl ClusterApi for KubeClusterApi {
    async fn openapi_document(&self) -> Result<serde_json::Value, TransportError> {
        let req = http::Request::get("/openapi/v2")
            .body(Vec::new())
            .map_err(|e| TransportError::new(None, e.to_string()))?;
        debug!("fetching /openapi/v2");
        self.client.request::<serde_json::Value>(req).await.map_err(transport_error)
    }

    async fn list(&self, call: &ListCall) -> Result<Vec<serde_json::Value>, TransportError> {
        let api = self.dynamic_api(&call.resource, call.namespace.as_deref());
        debug!(op = %call.operation_id, ns = ?call.namespace, "list");
        let list = api.list(&ListParams::default()).await.map_err(transport_error)?;
        list.items.iter().map(encode).collect()
    }

    async fn list_namespaces(&self) -> Result<Vec<String>, TransportError> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        let list = api.list(&ListParams::default()).await.map_err(transport_error)?;
        Ok(list.items.into_iter().filter_map(|ns| ns.metadata.name).collect())
    }

    async fn mutate(&self, call: &MutationCall, body: serde_json::Value) -> Result<serde_json::Value, TransportError> {
        let obj: DynamicObject = serde_json::from_value(body)
            .map_err(|e| TransportError::new(None, format!("encoding request body: {}", e)))?;
        let api = self.dynamic_api(&call.resource, call.namespace.as_deref());
        let pp = PostParams::default();
        debug!(op = %call.operation_id, ns = ?call.namespace, name = ?call.name, "mutate");
        let out = match call.verb {
            Verb::Create => api.create(&pp, &obj).await,
            Verb::Replace => {
                let name = call
                    .name
                    .as_deref()
                    .ok_or_else(|| TransportError::new(None, "replace requires an object name"))?;
                api.replace(name, &pp, &obj).await
            }
        }
        .map_err(transport_error)?;
        encode(&out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KUBECONFIG: &str = r#"
apiVersion: v1
kind: Config
current-context: dev
clusters:
  - name: dev
    cluster:
      server: https://10.0.0.1:6443
  - name: staging
    cluster:
      server: https://10.0.0.2:6443
contexts:
  - name: dev
    context: {cluster: dev, user: ci}
  - name: staging
    context: {cluster: staging, user: ci, namespace: team-a}
users:
  - name: ci
    user: {token: abc}
"#;

    fn write_kubeconfig(tag: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("kubeset-{}-{}.yaml", tag, std::process::id()));
        std::fs::write(&path, KUBECONFIG).unwrap();
        path
    }

    #[tokio::test]
    async fn explicit_kubeconfig_file_and_context() {
        let path = write_kubeconfig("ctx");
        let config = load_config(Some(path.as_path()), Some("staging")).await.unwrap();
        assert_eq!(config.cluster_url.host(), Some("10.0.0.2"));
        assert_eq!(config.default_namespace, "team-a");

        let current = load_config(Some(path.as_path()), None).await.unwrap();
        assert_eq!(current.cluster_url.host(), Some("10.0.0.1"));

        assert!(load_config(Some(path.as_path()), Some("prod")).await.is_err());
        std::fs::remove_file(&path).unwrap();
    }

    #[tokio::test]
    async fn unreadable_kubeconfig_is_an_error() {
        let missing = std::env::temp_dir().join("kubeset-does-not-exist.yaml");
        let err = load_config(Some(missing.as_path()), None).await.unwrap_err();
        assert!(err.to_string().contains("kubeset-does-not-exist.yaml"));
    }
}
