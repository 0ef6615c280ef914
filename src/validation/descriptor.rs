use crate::error::{PreflightError, Result};
use serde::Serialize;
use std::fmt;

/// A bare file extension such as `csv` or `parquet`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Extension(String);

impl Extension {
    pub fn new(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        let well_formed = !raw.is_empty()
            && raw
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !well_formed {
            return Err(PreflightError::InvalidExtension(raw));
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `.csv` for `csv`
    pub fn suffix(&self) -> String {
        format!(".{}", self.0)
    }
}

impl fmt::Display for Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PathRole {
    /// Input that must already hold matching files
    Source,
    /// Output that the downstream step creates
    Destination,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PathKind {
    File,
    Directory,
}

/// How far validation got, and what it found
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PathStatus {
    /// Destination paths are accepted without touching the backend
    Unchecked,
    NotFound,
    WrongBackend {
        protocol: String,
    },
    Classified {
        protocol: String,
        kind: PathKind,
        file_count: usize,
    },
}

/// Validation result for one path
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathDescriptor {
    path: String,
    role: PathRole,
    status: PathStatus,
}

impl PathDescriptor {
    pub fn new(path: impl Into<String>, role: PathRole, status: PathStatus) -> Self {
        Self {
            path: path.into(),
            role,
            status,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn role(&self) -> PathRole {
        self.role
    }

    pub fn status(&self) -> &PathStatus {
        &self.status
    }

    /// `None` when the backend was never asked
    pub fn exists(&self) -> Option<bool> {
        match self.status {
            PathStatus::Unchecked => None,
            PathStatus::NotFound => Some(false),
            PathStatus::WrongBackend { .. } | PathStatus::Classified { .. } => Some(true),
        }
    }

    pub fn protocol(&self) -> Option<&str> {
        match &self.status {
            PathStatus::WrongBackend { protocol } | PathStatus::Classified { protocol, .. } => {
                Some(protocol.as_str())
            }
            _ => None,
        }
    }

    pub fn is_directory(&self) -> Option<bool> {
        match self.status {
            PathStatus::Classified { kind, .. } => Some(kind == PathKind::Directory),
            _ => None,
        }
    }

    pub fn file_count(&self) -> Option<usize> {
        match self.status {
            PathStatus::Classified { file_count, .. } => Some(file_count),
            _ => None,
        }
    }

    pub fn is_valid(&self) -> bool {
        match self.role {
            PathRole::Destination => true,
            PathRole::Source => self.file_count().is_some_and(|count| count > 0),
        }
    }
}

impl fmt::Display for PathDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verdict = if self.is_valid() { "valid" } else { "invalid" };
        match &self.status {
            PathStatus::Unchecked => write!(f, "{} ({}, not checked)", self.path, verdict),
            PathStatus::NotFound => write!(f, "{} ({}, not found)", self.path, verdict),
            PathStatus::WrongBackend { protocol } => {
                write!(f, "{} ({}, unexpected protocol '{}')", self.path, verdict, protocol)
            }
            PathStatus::Classified {
                kind, file_count, ..
            } => write!(
                f,
                "{} ({}, {:?} with {} matching file(s))",
                self.path, verdict, kind, file_count
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_accepts_bare_tokens() {
        assert_eq!(Extension::new("csv").unwrap().as_str(), "csv");
        assert_eq!(Extension::new("tar-gz").unwrap().suffix(), ".tar-gz");
        assert!(Extension::new("snappy_parquet").is_ok());
    }

    #[test]
    fn test_extension_rejects_dots_and_wildcards() {
        for bad in ["", ".csv", "foo.csv", "*", "c?v", "dir/csv", "csv "] {
            let err = Extension::new(bad).unwrap_err();
            assert!(matches!(err, PreflightError::InvalidExtension(ref s) if s == bad));
        }
    }

    #[test]
    fn test_field_availability_follows_state() {
        let missing = PathDescriptor::new("gs://b/x", PathRole::Source, PathStatus::NotFound);
        assert_eq!(missing.exists(), Some(false));
        assert_eq!(missing.protocol(), None);
        assert_eq!(missing.is_directory(), None);
        assert_eq!(missing.file_count(), None);
        assert!(!missing.is_valid());

        let foreign = PathDescriptor::new(
            "s3://b/x",
            PathRole::Source,
            PathStatus::WrongBackend {
                protocol: "s3".to_string(),
            },
        );
        assert_eq!(foreign.exists(), Some(true));
        assert_eq!(foreign.protocol(), Some("s3"));
        assert_eq!(foreign.file_count(), None);
        assert!(!foreign.is_valid());

        let empty = PathDescriptor::new(
            "gs://b/x",
            PathRole::Source,
            PathStatus::Classified {
                protocol: "gs".to_string(),
                kind: PathKind::Directory,
                file_count: 0,
            },
        );
        assert_eq!(empty.is_directory(), Some(true));
        assert_eq!(empty.file_count(), Some(0));
        assert!(!empty.is_valid());

        let out = PathDescriptor::new("gs://b/out", PathRole::Destination, PathStatus::Unchecked);
        assert_eq!(out.exists(), None);
        assert!(out.is_valid());
    }

    #[test]
    fn test_serializes_with_state_tag() {
        let descriptor = PathDescriptor::new(
            "gs://b/data",
            PathRole::Source,
            PathStatus::Classified {
                protocol: "gs".to_string(),
                kind: PathKind::Directory,
                file_count: 2,
            },
        );
        let value = serde_json::to_value(&descriptor).unwrap();
        assert_eq!(value["role"], "source");
        assert_eq!(value["status"]["state"], "classified");
        assert_eq!(value["status"]["kind"], "directory");
        assert_eq!(value["status"]["file_count"], 2);
    }
}
