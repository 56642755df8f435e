//! Blob storage backends for captured verification images.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;
use tracing::debug;

use super::BaseBlobStore;

/// Reject absolute paths and `..` segments so uploads stay under the store root.
fn checked_relative_path(path: &str) -> Result<&Path> {
    let relative = Path::new(path);
    if path.is_empty()
        || !relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
    {
        bail!("invalid blob path: {path}");
    }
    Ok(relative)
}

// =============================================================================
// Local filesystem store
// =============================================================================

/// Writes blobs under a directory served at `public_base_url`.
pub struct LocalBlobStore {
    root: PathBuf,
    public_base_url: String,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl BaseBlobStore for LocalBlobStore {
    async fn put(&self, path: &str, content_type: &str, bytes: Bytes) -> Result<String> {
        let relative = checked_relative_path(path)?;
        let target = self.root.join(relative);

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create blob directory {}", parent.display()))?;
        }

        tokio::fs::write(&target, &bytes)
            .await
            .with_context(|| format!("Failed to write blob {}", target.display()))?;

        debug!(path, content_type, size = bytes.len(), "Stored blob");
        Ok(format!("{}/{}", self.public_base_url, path))
    }
}

// =============================================================================
// In-memory store
// =============================================================================

#[derive(Debug, Clone)]
pub struct StoredBlob {
    pub content_type: String,
    pub bytes: Bytes,
}

/// Keeps blobs in a map. Used by tests and local runs without a disk.
#[derive(Clone)]
pub struct InMemoryBlobStore {
    blobs: Arc<RwLock<HashMap<String, StoredBlob>>>,
    public_base_url: String,
}

impl InMemoryBlobStore {
    pub fn new(public_base_url: impl Into<String>) -> Self {
        Self {
            blobs: Arc::new(RwLock::new(HashMap::new())),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub async fn get(&self, path: &str) -> Option<StoredBlob> {
        self.blobs.read().await.get(path).cloned()
    }

    pub async fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.blobs.read().await.keys().cloned().collect();
        paths.sort();
        paths
    }
}

impl Default for InMemoryBlobStore {
    fn default() -> Self {
        Self::new("memory://blobs")
    }
}

#[async_trait]
impl BaseBlobStore for InMemoryBlobStore {
    async fn put(&self, path: &str, content_type: &str, bytes: Bytes) -> Result<String> {
        checked_relative_path(path)?;
        self.blobs.write().await.insert(
            path.to_string(),
            StoredBlob {
                content_type: content_type.to_string(),
                bytes,
            },
        );
        Ok(format!("{}/{}", self.public_base_url, path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_escaping_paths() {
        assert!(checked_relative_path("../etc/passwd").is_err());
        assert!(checked_relative_path("/etc/passwd").is_err());
        assert!(checked_relative_path("a/../../b").is_err());
        assert!(checked_relative_path("").is_err());
        assert!(checked_relative_path("verifications/u1/s1/selfie.jpg").is_ok());
    }

    #[tokio::test]
    async fn test_local_store_writes_file_and_returns_url() {
        let root = std::env::temp_dir().join(format!("blob-test-{}", uuid::Uuid::new_v4()));
        let store = LocalBlobStore::new(root.clone(), "https://cdn.example.com/uploads/");

        let url = store
            .put("verifications/u1/s1/selfie.jpg", "image/jpeg", Bytes::from_static(b"jpeg"))
            .await
            .unwrap();

        assert_eq!(url, "https://cdn.example.com/uploads/verifications/u1/s1/selfie.jpg");
        let written = tokio::fs::read(root.join("verifications/u1/s1/selfie.jpg")).await.unwrap();
        assert_eq!(written, b"jpeg");

        let _ = tokio::fs::remove_dir_all(&root).await;
    }

    #[tokio::test]
    async fn test_in_memory_store_keeps_content_type() {
        let store = InMemoryBlobStore::default();
        let url = store
            .put("a/b.png", "image/png", Bytes::from_static(b"png"))
            .await
            .unwrap();
        assert_eq!(url, "memory://blobs/a/b.png");
        let blob = store.get("a/b.png").await.unwrap();
        assert_eq!(blob.content_type, "image/png");
        assert_eq!(store.paths().await, vec!["a/b.png".to_string()]);
    }
}
