use super::glob::GlobQuery;
use super::{split_scheme, StorageBackend};
use crate::constants::{GCS_DEFAULT_ENDPOINT, GCS_PROTOCOL_ALIASES};
use crate::error::{PreflightError, Result};
use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use tracing::debug;

/// Google Cloud Storage backend speaking the JSON API.
///
/// Object names are flat; a "directory" is any prefix ending in `/` that has
/// at least one object beneath it, or the bucket root.
pub struct GcsBackend {
    client: reqwest::Client,
    endpoint: String,
    token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectList {
    #[serde(default)]
    items: Vec<ObjectItem>,
    #[serde(default)]
    prefixes: Vec<String>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ObjectItem {
    name: String,
}

/// Split `gs://bucket/key` into bucket and object key. The key may be empty.
pub fn parse_gcs_path(path: &str) -> Result<(&str, &str)> {
    let (scheme, rest) = split_scheme(path);
    if !matches!(scheme, Some(s) if GCS_PROTOCOL_ALIASES.iter().any(|alias| *alias == s)) {
        return Err(PreflightError::MalformedPath(path.to_string()));
    }
    let (bucket, key) = rest.split_once('/').unwrap_or((rest, ""));
    if bucket.is_empty() {
        return Err(PreflightError::MalformedPath(path.to_string()));
    }
    Ok((bucket, key))
}

impl Default for GcsBackend {
    fn default() -> Self {
        Self::new(GCS_DEFAULT_ENDPOINT, None)
    }
}

impl GcsBackend {
    pub fn new(endpoint: impl Into<String>, token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            token,
        }
    }

    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.endpoint).map_err(|e| {
            PreflightError::Config(format!("invalid storage endpoint '{}': {}", self.endpoint, e))
        })?;
        url.path_segments_mut()
            .map_err(|_| {
                PreflightError::Config(format!(
                    "storage endpoint '{}' cannot be a base",
                    self.endpoint
                ))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn get(&self, url: Url) -> reqwest::RequestBuilder {
        let request = self.client.get(url);
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// GET a metadata resource: `Ok(false)` on 404, error on any other failure
    async fn resource_exists(&self, url: Url) -> Result<bool> {
        debug!("GET {}", url);
        let resp = self.get(url.clone()).send().await?;
        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(PreflightError::Backend {
                status: status.as_u16(),
                url: url.to_string(),
                body,
            });
        }
        Ok(true)
    }

    async fn bucket_exists(&self, bucket: &str) -> Result<bool> {
        self.resource_exists(self.url(&["storage", "v1", "b", bucket])?).await
    }

    async fn object_exists(&self, bucket: &str, key: &str) -> Result<bool> {
        self.resource_exists(self.url(&["storage", "v1", "b", bucket, "o", key])?)
            .await
    }

    /// One page of a listing; `None` when the bucket itself is missing (404)
    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        delimiter: Option<&str>,
        max_results: Option<u32>,
        page_token: Option<&str>,
    ) -> Result<Option<ObjectList>> {
        let url = self.url(&["storage", "v1", "b", bucket, "o"])?;
        let mut query: Vec<(&str, String)> = vec![("prefix", prefix.to_string())];
        if let Some(delimiter) = delimiter {
            query.push(("delimiter", delimiter.to_string()));
        }
        if let Some(max) = max_results {
            query.push(("maxResults", max.to_string()));
        }
        if let Some(token) = page_token {
            query.push(("pageToken", token.to_string()));
        }

        debug!("LIST {} prefix={}", url, prefix);
        let resp = self.get(url.clone()).query(&query).send().await?;
        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            debug!("Bucket {} not found while listing", bucket);
            return Ok(None);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(PreflightError::Backend {
                status: status.as_u16(),
                url: url.to_string(),
                body,
            });
        }
        Ok(Some(resp.json::<ObjectList>().await?))
    }

    async fn has_children(&self, bucket: &str, key: &str) -> Result<bool> {
        let prefix = format!("{}/", key.trim_end_matches('/'));
        let page = self.list_page(bucket, &prefix, None, Some(1), None).await?;
        Ok(page.is_some_and(|page| !page.items.is_empty() || !page.prefixes.is_empty()))
    }
}

#[async_trait]
impl StorageBackend for GcsBackend {
    async fn exists(&self, path: &str) -> Result<bool> {
        let (bucket, key) = parse_gcs_path(path)?;
        if key.is_empty() {
            return self.bucket_exists(bucket).await;
        }
        if !key.ends_with('/') && self.object_exists(bucket, key).await? {
            return Ok(true);
        }
        self.has_children(bucket, key).await
    }

    async fn is_directory(&self, path: &str) -> Result<bool> {
        let (bucket, key) = parse_gcs_path(path)?;
        if key.is_empty() || key.ends_with('/') {
            return Ok(true);
        }
        if self.object_exists(bucket, key).await? {
            return Ok(false);
        }
        self.has_children(bucket, key).await
    }

    async fn glob(&self, query: &GlobQuery) -> Result<Vec<String>> {
        let (bucket, prefix) = parse_gcs_path(query.base())?;
        let delimiter = if query.is_recursive() { None } else { Some("/") };

        let mut matches = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let Some(page) = self
                .list_page(bucket, prefix, delimiter, None, page_token.as_deref())
                .await?
            else {
                break;
            };
            for item in page.items {
                let Some(relative) = item.name.strip_prefix(prefix) else {
                    continue;
                };
                if query.matches_relative(relative) {
                    matches.push(format!("{}{}", query.base(), relative));
                }
            }
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        debug!("{} objects matched {}", matches.len(), query);
        Ok(matches)
    }

    fn protocols(&self) -> &[&'static str] {
        GCS_PROTOCOL_ALIASES
    }
}
