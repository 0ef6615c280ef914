pub mod gcs;
pub mod glob;
pub mod in_memory;
pub mod local;

pub use gcs::GcsBackend;
pub use glob::GlobQuery;
pub use in_memory::InMemoryBackend;
pub use local::LocalBackend;

use crate::config::StorageConfig;
use crate::error::{PreflightError, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Read-only view of a storage backend, just enough to classify a path
#[async_trait]
pub trait StorageBackend: Send + Sync {
    async fn exists(&self, path: &str) -> Result<bool>;
    async fn is_directory(&self, path: &str) -> Result<bool>;
    /// Paths matching `query`, in the same scheme as its base
    async fn glob(&self, query: &GlobQuery) -> Result<Vec<String>>;
    /// Identifiers the backend answers to, e.g. `["gs", "gcs"]`
    fn protocols(&self) -> &[&'static str];
}

/// Split `scheme://rest` into its parts. Bare paths have no scheme.
pub fn split_scheme(path: &str) -> (Option<&str>, &str) {
    match path.split_once("://") {
        Some((scheme, rest)) if !scheme.is_empty() && !scheme.contains('/') => (Some(scheme), rest),
        _ => (None, path),
    }
}

/// Picks the backend for a path from its scheme prefix
pub struct StorageFactory {
    gcs: Arc<GcsBackend>,
    local: Arc<LocalBackend>,
}

impl StorageFactory {
    pub fn new(config: &StorageConfig) -> Self {
        let token = std::env::var(&config.access_token_env).ok();
        if token.is_none() {
            debug!(
                "{} not set, object storage requests will be anonymous",
                config.access_token_env
            );
        }
        Self {
            gcs: Arc::new(GcsBackend::new(config.gcs_endpoint.clone(), token)),
            local: Arc::new(LocalBackend::new()),
        }
    }

    pub fn backend_for(&self, path: &str) -> Result<Arc<dyn StorageBackend>> {
        match split_scheme(path).0 {
            Some("gs") | Some("gcs") => Ok(self.gcs.clone() as Arc<dyn StorageBackend>),
            Some("file") | None => Ok(self.local.clone() as Arc<dyn StorageBackend>),
            Some(other) => Err(PreflightError::UnsupportedScheme(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_scheme() {
        assert_eq!(split_scheme("gs://bucket/data"), (Some("gs"), "bucket/data"));
        assert_eq!(split_scheme("file:///tmp/x"), (Some("file"), "/tmp/x"));
        assert_eq!(split_scheme("/tmp/x"), (None, "/tmp/x"));
        assert_eq!(split_scheme("relative/dir"), (None, "relative/dir"));
    }

    #[test]
    fn test_factory_dispatches_on_scheme() {
        let factory = StorageFactory::new(&StorageConfig::default());

        let gcs = factory.backend_for("gs://bucket/data").unwrap();
        assert_eq!(gcs.protocols(), &["gs", "gcs"]);

        let gcs_alias = factory.backend_for("gcs://bucket/data").unwrap();
        assert_eq!(gcs_alias.protocols(), &["gs", "gcs"]);

        let local = factory.backend_for("/tmp/data").unwrap();
        assert_eq!(local.protocols(), &["file", "local"]);

        let err = factory.backend_for("s3://bucket/data").err().unwrap();
        assert!(matches!(err, PreflightError::UnsupportedScheme(s) if s == "s3"));
    }
}
