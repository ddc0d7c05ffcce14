//! Process settings read from `KUBESET_*` environment variables.

use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

pub const DEFAULT_NAMESPACE: &str = "default";
pub const DEFAULT_SCHEMA_TTL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Namespace given to new namespace-scoped records that do not name one.
    pub default_namespace: String,
    /// How long the capability document stays memoized.
    pub schema_ttl: Duration,
    /// Kubeconfig file to load instead of the default one.
    pub kubeconfig: Option<PathBuf>,
    /// Kubeconfig context. With no file and no context the in-cluster
    /// service account is tried before the default kubeconfig.
    pub context: Option<String>,
    pub metrics_addr: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_namespace: DEFAULT_NAMESPACE.to_string(),
            schema_ttl: DEFAULT_SCHEMA_TTL,
            kubeconfig: None,
            context: None,
            metrics_addr: None,
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup; unset or unparsable values keep defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut s = Self::default();
        if let Some(ns) = lookup("KUBESET_DEFAULT_NAMESPACE").filter(|v| !v.is_empty()) {
            s.default_namespace = ns;
        }
        if let Some(raw) = lookup("KUBESET_SCHEMA_TTL_SECS") {
            match raw.parse::<u64>() {
                Ok(secs) => s.schema_ttl = Duration::from_secs(secs),
                Err(_) => warn!(value = %raw, "invalid KUBESET_SCHEMA_TTL_SECS; keeping default"),
            }
        }
        s.kubeconfig = lookup("KUBESET_KUBECONFIG").filter(|v| !v.is_empty()).map(PathBuf::from);
        s.context = lookup("KUBESET_CONTEXT").filter(|v| !v.is_empty());
        s.metrics_addr = lookup("KUBESET_METRICS_ADDR").filter(|v| !v.is_empty());
        s
    }
}
