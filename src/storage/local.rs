use super::glob::GlobQuery;
use super::{split_scheme, StorageBackend};
use crate::constants::LOCAL_PROTOCOL_ALIASES;
use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

/// Local filesystem backend. Accepts `file://` URIs and bare paths.
#[derive(Debug, Default, Clone)]
pub struct LocalBackend;

impl LocalBackend {
    pub fn new() -> Self {
        Self
    }
}

fn fs_path(path: &str) -> &Path {
    Path::new(split_scheme(path).1)
}

#[async_trait]
impl StorageBackend for LocalBackend {
    async fn exists(&self, path: &str) -> Result<bool> {
        Ok(fs_path(path).try_exists()?)
    }

    async fn is_directory(&self, path: &str) -> Result<bool> {
        Ok(std::fs::metadata(fs_path(path))?.is_dir())
    }

    async fn glob(&self, query: &GlobQuery) -> Result<Vec<String>> {
        let root = fs_path(query.base());
        if !root.is_dir() {
            return Ok(Vec::new());
        }

        let mut walker = WalkDir::new(root)
            .min_depth(1)
            .follow_links(true)
            .sort_by_file_name();
        if !query.is_recursive() {
            walker = walker.max_depth(1);
        }

        let mut matches = Vec::new();
        for entry in walker {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(root)
                .unwrap_or(entry.path())
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            if query.matches_relative(&relative) {
                matches.push(format!("{}{}", query.base(), relative));
            }
        }

        debug!("{} local files matched {}", matches.len(), query);
        Ok(matches)
    }

    fn protocols(&self) -> &[&'static str] {
        LOCAL_PROTOCOL_ALIASES
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    async fn glob(backend: &LocalBackend, pattern: &str) -> Vec<String> {
        let query = GlobQuery::parse(pattern).unwrap();
        backend.glob(&query).await.unwrap()
    }

    #[tokio::test]
    async fn test_local_backend_classifies_paths() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.csv"), "x").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested").join("b.csv"), "y").unwrap();

        let root = dir.path().to_str().unwrap().to_string();
        let backend = LocalBackend::new();

        assert!(backend.exists(&root).await.unwrap());
        assert!(backend.is_directory(&root).await.unwrap());
        assert!(!backend.is_directory(&format!("{root}/a.csv")).await.unwrap());
        assert!(!backend.exists(&format!("{root}/missing")).await.unwrap());

        let flat = glob(&backend, &format!("{root}/*.csv")).await;
        assert_eq!(flat, vec![format!("{root}/a.csv")]);

        let deep = glob(&backend, &format!("{root}/**.csv")).await;
        assert_eq!(deep.len(), 2);
    }

    #[tokio::test]
    async fn test_file_uri_scheme() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.csv"), "x").unwrap();
        let uri = format!("file://{}", dir.path().to_str().unwrap());

        let backend = LocalBackend::new();
        assert!(backend.exists(&uri).await.unwrap());
        let found = glob(&backend, &format!("{uri}/*.csv")).await;
        assert_eq!(found, vec![format!("{uri}/a.csv")]);
    }

    #[tokio::test]
    async fn test_directory_names_with_glob_metacharacters() {
        let dir = tempdir().unwrap();
        for name in ["v{1}", "run[1]"] {
            let sub = dir.path().join(name);
            fs::create_dir(&sub).unwrap();
            fs::write(sub.join("a.csv"), "x").unwrap();

            let base = format!("{}/", sub.to_str().unwrap());
            let query = GlobQuery::new(base.clone(), "*.csv").unwrap();
            let found = LocalBackend::new().glob(&query).await.unwrap();
            assert_eq!(found, vec![format!("{base}a.csv")]);
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlinked_files_are_listed() {
        let data = tempdir().unwrap();
        fs::write(data.path().join("real.csv"), "x").unwrap();

        let dir = tempdir().unwrap();
        std::os::unix::fs::symlink(data.path().join("real.csv"), dir.path().join("linked.csv"))
            .unwrap();

        let root = dir.path().to_str().unwrap().to_string();
        let found = glob(&LocalBackend::new(), &format!("{root}/*.csv")).await;
        assert_eq!(found, vec![format!("{root}/linked.csv")]);
    }
}
