use crate::constants::*;
use crate::error::{PreflightError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub resources: ResourceConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Only paths under this protocol are inspected further
    pub expected_protocol: String,
    pub gcs_endpoint: String,
    /// Name of the environment variable holding the OAuth access token
    pub access_token_env: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            expected_protocol: GCS_PROTOCOL.to_string(),
            gcs_endpoint: GCS_DEFAULT_ENDPOINT.to_string(),
            access_token_env: GCS_TOKEN_ENV.to_string(),
        }
    }
}

/// Runtime parameters of the preprocessing pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub name: String,
    pub train_paths: Vec<String>,
    pub valid_paths: Vec<String>,
    pub output_converted: String,
    pub output_transformed: String,
    pub workflow_path: String,
    pub columns: Vec<String>,
    pub cols_dtype: BTreeMap<String, String>,
    pub sep: String,
    pub gpus: String,
    pub shuffle: String,
    pub recursive: bool,
    pub input_extension: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_PIPELINE_NAME.to_string(),
            train_paths: Vec::new(),
            valid_paths: Vec::new(),
            output_converted: String::new(),
            output_transformed: String::new(),
            workflow_path: String::new(),
            columns: Vec::new(),
            cols_dtype: BTreeMap::new(),
            sep: ",".to_string(),
            gpus: "0".to_string(),
            shuffle: "PER_PARTITION".to_string(),
            recursive: false,
            input_extension: DEFAULT_INPUT_EXTENSION.to_string(),
        }
    }
}

/// Limits and node placement applied to every pipeline step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceConfig {
    pub cpu_limit: String,
    pub memory_limit: String,
    pub gpu_limit: String,
    pub node_selector_label: String,
    pub accelerator: String,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            cpu_limit: DEFAULT_CPU_LIMIT.to_string(),
            memory_limit: DEFAULT_MEMORY_LIMIT.to_string(),
            gpu_limit: DEFAULT_GPU_LIMIT.to_string(),
            node_selector_label: ACCELERATOR_NODE_LABEL.to_string(),
            accelerator: DEFAULT_ACCELERATOR.to_string(),
        }
    }
}

impl Config {
    pub fn load(config_path: &Path) -> Result<Self> {
        let config_content = fs::read_to_string(config_path).map_err(|e| {
            PreflightError::Config(format!(
                "Failed to read config file '{}': {}",
                config_path.display(),
                e
            ))
        })?;

        Self::from_toml_str(&config_content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_sections() {
        let config = Config::from_toml_str(
            r#"
            [pipeline]
            train_paths = ["gs://bucket/train"]
            "#,
        )
        .unwrap();

        assert_eq!(config.storage.expected_protocol, "gs");
        assert_eq!(config.storage.access_token_env, "GOOGLE_OAUTH_ACCESS_TOKEN");
        assert_eq!(config.pipeline.name, "nvt-gcs-pipeline");
        assert_eq!(config.pipeline.train_paths, vec!["gs://bucket/train"]);
        assert_eq!(config.pipeline.input_extension, "csv");
        assert!(!config.pipeline.recursive);
        assert_eq!(config.resources, ResourceConfig::default());
    }

    #[test]
    fn test_full_config() {
        let config = Config::from_toml_str(
            r#"
            [storage]
            expected_protocol = "file"
            gcs_endpoint = "http://localhost:4443"

            [pipeline]
            train_paths = ["gs://bucket/train"]
            valid_paths = ["gs://bucket/valid"]
            output_converted = "gs://bucket/converted"
            output_transformed = "gs://bucket/transformed"
            workflow_path = "gs://bucket/workflow"
            columns = ["label", "I1", "C1"]
            sep = "\t"
            gpus = "0,1"
            recursive = true

            [pipeline.cols_dtype]
            label = "int32"
            C1 = "hex"

            [resources]
            memory_limit = "64G"
            accelerator = "nvidia-tesla-a100"
            "#,
        )
        .unwrap();

        assert_eq!(config.storage.expected_protocol, "file");
        assert_eq!(config.storage.gcs_endpoint, "http://localhost:4443");
        assert_eq!(config.pipeline.sep, "\t");
        assert_eq!(config.pipeline.cols_dtype.get("C1").map(String::as_str), Some("hex"));
        assert!(config.pipeline.recursive);
        assert_eq!(config.resources.memory_limit, "64G");
        assert_eq!(config.resources.cpu_limit, "8");
        assert_eq!(config.resources.accelerator, "nvidia-tesla-a100");
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let err = Config::from_toml_str("[pipeline\ntrain_paths = 1").unwrap_err();
        assert!(matches!(err, PreflightError::Toml(_)));
    }

    #[test]
    fn test_missing_file_is_a_config_error() {
        let err = Config::load(Path::new("/nonexistent/preflight.toml")).unwrap_err();
        assert!(matches!(err, PreflightError::Config(_)));
    }
}
