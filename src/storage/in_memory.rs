use super::glob::GlobQuery;
use super::StorageBackend;
use crate::constants::GCS_PROTOCOL_ALIASES;
use crate::error::Result;
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use tracing::debug;

/// In-memory object store for development/testing.
///
/// Holds full object paths (`gs://bucket/data/a.csv`); directories exist
/// implicitly through the objects beneath them. Every trait call is counted.
pub struct InMemoryBackend {
    objects: Arc<RwLock<BTreeSet<String>>>,
    protocols: &'static [&'static str],
    calls: AtomicUsize,
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new(GCS_PROTOCOL_ALIASES)
    }
}

impl InMemoryBackend {
    pub fn new(protocols: &'static [&'static str]) -> Self {
        Self {
            objects: Arc::new(RwLock::new(BTreeSet::new())),
            protocols,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_objects<I, S>(self, objects: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for object in objects {
            self.insert(object);
        }
        self
    }

    pub fn insert(&self, object: impl Into<String>) {
        let object = object.into();
        debug!("Stored object {}", object);
        self.objects
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(object);
    }

    /// Number of backend calls served so far
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn record_call(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    fn snapshot(&self) -> Vec<String> {
        self.objects
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .cloned()
            .collect()
    }

    fn has_children(&self, path: &str) -> bool {
        let prefix = format!("{}/", path.trim_end_matches('/'));
        self.snapshot().iter().any(|o| o.starts_with(&prefix))
    }
}

#[async_trait]
impl StorageBackend for InMemoryBackend {
    async fn exists(&self, path: &str) -> Result<bool> {
        self.record_call();
        let trimmed = path.trim_end_matches('/');
        let exact = self.snapshot().iter().any(|o| o == trimmed);
        Ok(exact || self.has_children(path))
    }

    async fn is_directory(&self, path: &str) -> Result<bool> {
        self.record_call();
        Ok(self.has_children(path))
    }

    async fn glob(&self, query: &GlobQuery) -> Result<Vec<String>> {
        self.record_call();
        Ok(self
            .snapshot()
            .into_iter()
            .filter(|o| query.matches(o))
            .collect())
    }

    fn protocols(&self) -> &[&'static str] {
        self.protocols
    }
}
