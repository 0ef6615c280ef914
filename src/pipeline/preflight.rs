use crate::config::{PipelineConfig, StorageConfig};
use crate::error::{PreflightError, Result};
use crate::storage::StorageFactory;
use crate::validation::{Extension, PathDescriptor, PathRole, PathValidator};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn, Instrument};

/// Outcome of checking every path a pipeline run touches
#[derive(Debug, Clone, Serialize)]
pub struct PreflightReport {
    pub pipeline: String,
    pub checked_at: DateTime<Utc>,
    pub paths: Vec<PathDescriptor>,
}

impl PreflightReport {
    pub fn invalid_sources(&self) -> Vec<&PathDescriptor> {
        self.paths
            .iter()
            .filter(|d| d.role() == PathRole::Source && !d.is_valid())
            .collect()
    }

    pub fn is_ready(&self) -> bool {
        self.paths.iter().all(PathDescriptor::is_valid)
    }

    /// Refuse to continue when any source path failed validation
    pub fn ensure_ready(&self) -> Result<()> {
        let invalid: Vec<String> = self
            .invalid_sources()
            .into_iter()
            .map(|d| d.path().to_string())
            .collect();
        if invalid.is_empty() {
            Ok(())
        } else {
            Err(PreflightError::InvalidSources(invalid))
        }
    }
}

/// Validates pipeline inputs and outputs before a run is submitted
pub struct Preflight {
    factory: Arc<StorageFactory>,
    storage: StorageConfig,
}

impl Preflight {
    pub fn new(factory: Arc<StorageFactory>, storage: StorageConfig) -> Self {
        Self { factory, storage }
    }

    pub async fn run(&self, pipeline: &PipelineConfig) -> Result<PreflightReport> {
        if pipeline.train_paths.is_empty() {
            return Err(PreflightError::Config(
                "pipeline.train_paths must list at least one path".to_string(),
            ));
        }
        let extension = Extension::new(pipeline.input_extension.clone())?;

        let sources = pipeline.train_paths.iter().chain(&pipeline.valid_paths);
        let destinations = [
            &pipeline.output_converted,
            &pipeline.workflow_path,
            &pipeline.output_transformed,
        ];

        let mut paths = Vec::new();
        for path in sources {
            paths.push(self.check(path, &extension, pipeline.recursive, PathRole::Source).await?);
        }
        for path in destinations.into_iter().filter(|p| !p.is_empty()) {
            paths.push(self.check(path, &extension, false, PathRole::Destination).await?);
        }

        let report = PreflightReport {
            pipeline: pipeline.name.clone(),
            checked_at: Utc::now(),
            paths,
        };

        for descriptor in report.invalid_sources() {
            warn!("Source path rejected: {}", descriptor);
        }
        info!(
            pipeline = %report.pipeline,
            checked = report.paths.len(),
            ready = report.is_ready(),
            "Preflight finished"
        );
        Ok(report)
    }

    async fn check(
        &self,
        path: &str,
        extension: &Extension,
        recursive: bool,
        role: PathRole,
    ) -> Result<PathDescriptor> {
        let validator = PathValidator::for_path(path, &self.factory, &self.storage)?;
        validator
            .validate(path, extension, recursive, role)
            .instrument(tracing::info_span!("preflight_path", path = %path))
            .await
    }
}
