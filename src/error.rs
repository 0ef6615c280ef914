use thiserror::Error;

#[derive(Error, Debug)]
pub enum PreflightError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("storage backend returned {status} for {url}: {body}")]
    Backend {
        status: u16,
        url: String,
        body: String,
    },

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("invalid glob pattern: {0}")]
    Glob(#[from] globset::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("path must not be empty")]
    EmptyPath,

    #[error("invalid extension '{0}': expected a bare token such as 'csv'")]
    InvalidExtension(String),

    #[error("unsupported storage scheme '{0}'")]
    UnsupportedScheme(String),

    #[error("malformed storage path '{0}'")]
    MalformedPath(String),

    #[error("{} source path(s) failed validation: {}", .0.len(), .0.join(", "))]
    InvalidSources(Vec<String>),
}

pub type Result<T> = std::result::Result<T, PreflightError>;
