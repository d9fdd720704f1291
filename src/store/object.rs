//! Blob storage for file-backed document sources.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::ObjectStoreError;

const URI_SCHEME: &str = "kbfs://";

/// Storage for uploaded file bytes, addressed by opaque URIs.
///
/// Production deployments put an S3-compatible service behind this trait; the
/// in-tree implementation writes to a local directory.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store bytes under `key` and return the URI to fetch them later.
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<String, ObjectStoreError>;

    async fn get(&self, uri: &str) -> Result<Vec<u8>, ObjectStoreError>;

    /// Remove the blob. Deleting a missing blob is a no-op.
    async fn delete(&self, uri: &str) -> Result<(), ObjectStoreError>;
}

/// Local-directory object store.
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, uri: &str) -> Result<PathBuf, ObjectStoreError> {
        let key = uri
            .strip_prefix(URI_SCHEME)
            .ok_or_else(|| ObjectStoreError::InvalidUri(uri.to_string()))?;
        if key.is_empty() || key.split('/').any(|part| part == "..") {
            return Err(ObjectStoreError::InvalidUri(uri.to_string()));
        }
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<String, ObjectStoreError> {
        let uri = format!("{}{}", URI_SCHEME, key);
        let path = self.path_for(&uri)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        Ok(uri)
    }

    async fn get(&self, uri: &str) -> Result<Vec<u8>, ObjectStoreError> {
        let path = self.path_for(uri)?;
        Ok(tokio::fs::read(&path).await?)
    }

    async fn delete(&self, uri: &str) -> Result<(), ObjectStoreError> {
        let path = self.path_for(uri)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Build the object key for an uploaded file:
/// `knowledge/{workspace|global}/{yyyy/mm/dd}/{hash16}{ext}`.
pub(crate) fn object_key(
    workspace_id: Option<&str>,
    content_hash: &str,
    filename: &str,
) -> String {
    let scope = workspace_id.filter(|ws| !ws.is_empty()).unwrap_or("global");
    let date = chrono::Utc::now().format("%Y/%m/%d");
    let ext = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_lowercase()))
        .unwrap_or_default();
    let hash16 = &content_hash[..content_hash.len().min(16)];
    format!("knowledge/{}/{}/{}{}", scope, date, hash16, ext)
}
