use super::descriptor::{Extension, PathDescriptor, PathKind, PathRole, PathStatus};
use crate::config::StorageConfig;
use crate::constants::{normalize_protocol, GCS_PROTOCOL};
use crate::error::{PreflightError, Result};
use crate::storage::{GlobQuery, StorageBackend, StorageFactory};
use std::sync::Arc;
use tracing::{debug, info};

/// Classifies paths against one storage backend.
///
/// Domain outcomes (missing path, foreign protocol, no matching files) come
/// back as a [`PathDescriptor`]. Backend failures come back as `Err` and are
/// never folded into an invalid descriptor.
#[derive(Clone)]
pub struct PathValidator {
    backend: Arc<dyn StorageBackend>,
    expected_protocol: String,
}

impl PathValidator {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self {
            backend,
            expected_protocol: GCS_PROTOCOL.to_string(),
        }
    }

    pub fn with_expected_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.expected_protocol = protocol.into();
        self
    }

    /// Validator bound to whichever backend serves `path`'s scheme
    pub fn for_path(path: &str, factory: &StorageFactory, config: &StorageConfig) -> Result<Self> {
        let backend = factory.backend_for(path)?;
        Ok(Self::new(backend).with_expected_protocol(config.expected_protocol.clone()))
    }

    pub fn expected_protocol(&self) -> &str {
        &self.expected_protocol
    }

    pub async fn validate(
        &self,
        path: &str,
        extension: &Extension,
        recursive: bool,
        role: PathRole,
    ) -> Result<PathDescriptor> {
        if path.is_empty() {
            return Err(PreflightError::EmptyPath);
        }

        let status = match role {
            // Destinations are created by the step that writes them
            PathRole::Destination => PathStatus::Unchecked,
            PathRole::Source => self.inspect_source(path, extension, recursive).await?,
        };

        let descriptor = PathDescriptor::new(path, role, status);
        info!(
            path = %descriptor.path(),
            valid = descriptor.is_valid(),
            file_count = ?descriptor.file_count(),
            "Validated path"
        );
        Ok(descriptor)
    }

    async fn inspect_source(
        &self,
        path: &str,
        extension: &Extension,
        recursive: bool,
    ) -> Result<PathStatus> {
        if !self.backend.exists(path).await? {
            debug!("{} does not exist", path);
            return Ok(PathStatus::NotFound);
        }

        let protocol = normalize_protocol(self.backend.protocols());
        if protocol != self.expected_protocol {
            debug!(
                "{} is served by '{}', expected '{}'",
                path, protocol, self.expected_protocol
            );
            return Ok(PathStatus::WrongBackend { protocol });
        }

        let (kind, file_count) = if self.backend.is_directory(path).await? {
            (PathKind::Directory, self.count_in_directory(path, extension, recursive).await?)
        } else {
            // Files without the extension are not counted
            let count = usize::from(path.ends_with(&extension.suffix()));
            (PathKind::File, count)
        };

        Ok(PathStatus::Classified {
            protocol,
            kind,
            file_count,
        })
    }

    async fn count_in_directory(
        &self,
        path: &str,
        extension: &Extension,
        recursive: bool,
    ) -> Result<usize> {
        let query = directory_query(path, extension, recursive)?;
        let matches = self.backend.glob(&query).await?;
        debug!("{} files match {}", matches.len(), query);
        Ok(matches.len())
    }
}

/// `dir/*.ext`, or `dir/**.ext` when searching recursively. `dir` is taken
/// literally, glob metacharacters in directory names included.
pub fn directory_query(path: &str, extension: &Extension, recursive: bool) -> Result<GlobQuery> {
    let dir = format!("{}/", path.trim_end_matches('/'));
    let wildcard = if recursive { "**" } else { "*" };
    GlobQuery::new(dir, &format!("{}{}", wildcard, extension.suffix()))
}
