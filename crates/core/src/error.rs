//! Error taxonomy shared by every kubeset crate.

use serde::{Deserialize, Serialize};

/// Fatal problems with a kind declaration or with a record's scope.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigurationError {
    #[error("kind declaration is missing the required `kind` name")]
    MissingKind,
    #[error("schema required but not found for {kind} (looked up {key})")]
    SchemaNotFound { kind: String, key: String },
    #[error("invalid resource group {group:?} for {kind}")]
    InvalidGroup { group: String, kind: String },
    #[error("cluster-scoped {kind} cannot carry namespace {namespace:?}")]
    ClusterScopedNamespace { kind: String, namespace: String },
    #[error("{gvk} already declared with a different {field}")]
    ConflictingDeclaration { gvk: String, field: String },
    #[error("unsupported resource type: {0}")]
    UnsupportedResource(String),
}

/// Fault raised by the remote API collaborator.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq, Serialize, Deserialize)]
#[error("transport: {message} (status {})", .status.map(|s| s.to_string()).unwrap_or_else(|| "n/a".into()))]
pub struct TransportError {
    pub status: Option<u16>,
    pub message: String,
}

impl TransportError {
    pub fn new(status: Option<u16>, message: impl Into<String>) -> Self {
        Self { status, message: message.into() }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(Some(404), message)
    }

    /// The one status treated as "absent, not broken" by per-namespace probes.
    pub fn is_not_found(&self) -> bool {
        self.status == Some(404)
    }
}

/// A payload that cannot be turned into a record.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[error("cannot deserialize {kind} payload: {reason}")]
pub struct DeserializationError {
    pub kind: String,
    pub reason: String,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Deserialization(#[from] DeserializationError),
    #[error("{kind} matching query does not exist")]
    NotFound { kind: String },
    #[error("get() returned more than one {kind} -- it returned {count}")]
    MultipleResults { kind: String, count: usize },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_is_only_404() {
        assert!(TransportError::not_found("gone").is_not_found());
        assert!(!TransportError::new(Some(403), "forbidden").is_not_found());
        assert!(!TransportError::new(None, "connection reset").is_not_found());
    }

    #[test]
    fn messages_are_readable() {
        let e = Error::MultipleResults { kind: "Pod".into(), count: 2 };
        assert_eq!(e.to_string(), "get() returned more than one Pod -- it returned 2");
        let t = TransportError::new(Some(500), "boom");
        assert_eq!(t.to_string(), "transport: boom (status 500)");
    }
}
