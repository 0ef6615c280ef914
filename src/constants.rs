/// Protocol and pipeline constants shared across the crate

// Canonical protocol codes
pub const GCS_PROTOCOL: &str = "gs";
pub const LOCAL_PROTOCOL: &str = "file";

// Every identifier the object storage backend may report for itself
pub const GCS_PROTOCOL_ALIASES: &[&str] = &["gs", "gcs"];
pub const LOCAL_PROTOCOL_ALIASES: &[&str] = &["file", "local"];

pub const GCS_DEFAULT_ENDPOINT: &str = "https://storage.googleapis.com";
pub const GCS_TOKEN_ENV: &str = "GOOGLE_OAUTH_ACCESS_TOKEN";

pub const DEFAULT_PIPELINE_NAME: &str = "nvt-gcs-pipeline";
pub const DEFAULT_INPUT_EXTENSION: &str = "csv";

// Step names as the orchestrator knows them
pub const CONVERT_STEP: &str = "convert_csv_to_parquet";
pub const FIT_STEP: &str = "fit_dataset";
pub const TRANSFORM_STEP: &str = "transform_dataset";

// Per-step defaults for the GPU node pool
pub const DEFAULT_CPU_LIMIT: &str = "8";
pub const DEFAULT_MEMORY_LIMIT: &str = "32G";
pub const DEFAULT_GPU_LIMIT: &str = "1";
pub const ACCELERATOR_NODE_LABEL: &str = "cloud.google.com/gke-accelerator";
pub const DEFAULT_ACCELERATOR: &str = "nvidia-tesla-t4";

/// Collapse the identifiers a backend reports into one protocol code.
///
/// Any object storage alias maps to `gs`; everything else keeps the first
/// identifier the backend reported.
pub fn normalize_protocol(reported: &[&str]) -> String {
    if reported
        .iter()
        .any(|p| GCS_PROTOCOL_ALIASES.iter().any(|alias| alias == p))
    {
        return GCS_PROTOCOL.to_string();
    }
    reported.first().map(|p| p.to_string()).unwrap_or_default()
}
