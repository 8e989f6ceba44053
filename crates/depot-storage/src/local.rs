use crate::traits::{Resolved, Storage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;

static PARTIAL_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Local filesystem storage implementation
#[derive(Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
    base_url: String,
}

impl LocalStorage {
    /// Create a new LocalStorage instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory for file storage (e.g., "/var/lib/depot/uploads")
    /// * `base_url` - URL prefix recorded on uploads (e.g., "/uploads/default")
    pub async fn new(base_path: impl Into<PathBuf>, base_url: String) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStorage {
            base_path,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Convert storage key to filesystem path with security validation
    ///
    /// Rejects keys containing traversal sequences that could escape the base directory.
    fn key_to_path(&self, storage_key: &str) -> StorageResult<PathBuf> {
        if storage_key.is_empty()
            || storage_key.contains("..")
            || storage_key.starts_with('/')
            || storage_key.contains('\\')
        {
            return Err(StorageError::InvalidKey(
                "Storage key contains invalid characters".to_string(),
            ));
        }

        let path = self.base_path.join(storage_key);

        let base_canonical = self.base_path.canonicalize().map_err(|e| {
            StorageError::ConfigError(format!("Failed to canonicalize base path: {}", e))
        })?;

        if let Ok(canonical) = path.canonicalize() {
            if canonical.strip_prefix(&base_canonical).is_err() {
                return Err(StorageError::InvalidKey(
                    "Storage key resolves outside storage directory".to_string(),
                ));
            }
        }

        Ok(path)
    }

    /// URL recorded for a key
    fn generate_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url, key)
    }

    /// Ensure parent directory exists
    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    async fn read(&self, storage_key: &str) -> StorageResult<Bytes> {
        let path = self.key_to_path(storage_key)?;
        let start = std::time::Instant::now();

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(StorageError::NotFound(storage_key.to_string()));
        }

        let data = fs::read(&path).await.map_err(|e| {
            StorageError::DownloadFailed(format!("Failed to read file {}: {}", path.display(), e))
        })?;

        tracing::debug!(
            path = %path.display(),
            key = %storage_key,
            size_bytes = data.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage read successful"
        );

        Ok(Bytes::from(data))
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn store(&self, key: &str, data: Bytes, _content_type: &str) -> StorageResult<String> {
        let path = self.key_to_path(key)?;
        let size = data.len();

        self.ensure_parent_dir(&path).await?;

        let start = std::time::Instant::now();

        // Readers never observe a partially written file: write a sibling, then rename.
        let tmp_path = path.with_extension(format!(
            "{}.partial",
            PARTIAL_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        let mut file = fs::File::create(&tmp_path).await.map_err(|e| {
            StorageError::UploadFailed(format!(
                "Failed to create file {}: {}",
                tmp_path.display(),
                e
            ))
        })?;

        file.write_all(&data).await.map_err(|e| {
            StorageError::UploadFailed(format!(
                "Failed to write file {}: {}",
                tmp_path.display(),
                e
            ))
        })?;

        file.sync_all().await.map_err(|e| {
            StorageError::UploadFailed(format!(
                "Failed to sync file {}: {}",
                tmp_path.display(),
                e
            ))
        })?;

        fs::rename(&tmp_path, &path).await.map_err(|e| {
            StorageError::UploadFailed(format!(
                "Failed to move file into place {}: {}",
                path.display(),
                e
            ))
        })?;

        let url = self.generate_url(key);

        tracing::info!(
            path = %path.display(),
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage write successful"
        );

        Ok(url)
    }

    async fn resolve(&self, url: &str) -> StorageResult<Resolved> {
        let key = self.key_for_url(url).ok_or_else(|| {
            tracing::warn!(url = %url, base_url = %self.base_url, "URL does not belong to local storage");
            StorageError::NotFound(url.to_string())
        })?;

        // A key that fails validation can never have been written here.
        let data = match self.read(&key).await {
            Err(StorageError::InvalidKey(_)) => {
                return Err(StorageError::NotFound(url.to_string()))
            }
            other => other?,
        };

        Ok(Resolved::Bytes(data))
    }

    fn key_for_url(&self, url: &str) -> Option<String> {
        url.strip_prefix(&self.base_url)
            .and_then(|rest| rest.strip_prefix('/'))
            .filter(|key| !key.is_empty())
            .map(String::from)
    }

    async fn get_presigned_url(&self, key: &str, _expires_in: Duration) -> StorageResult<String> {
        self.key_to_path(key)?;
        Ok(self.generate_url(key))
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        let path = self.key_to_path(key)?;
        Ok(fs::try_exists(&path).await.unwrap_or(false))
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

#[cfg(all(test, feature = "storage-local"))]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const KEY: &str = "original/da/da39a3ee5e6b4b0d3255bfef95601890afd80709.txt";

    async fn storage(dir: &Path) -> LocalStorage {
        LocalStorage::new(dir, "/uploads/default/".to_string())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_store_then_resolve_returns_bytes() {
        let dir = tempdir().unwrap();
        let storage = storage(dir.path()).await;

        let url = storage
            .store(KEY, Bytes::from_static(b"test data"), "text/plain")
            .await
            .unwrap();
        assert_eq!(url, format!("/uploads/default/{}", KEY));
        assert!(storage.exists(KEY).await.unwrap());

        let resolved = storage.resolve(&url).await.unwrap();
        assert_eq!(resolved, Resolved::Bytes(Bytes::from_static(b"test data")));
    }

    #[tokio::test]
    async fn test_store_leaves_no_partial_file() {
        let dir = tempdir().unwrap();
        let storage = storage(dir.path()).await;

        storage
            .store(KEY, Bytes::from_static(b"abc"), "text/plain")
            .await
            .unwrap();

        let shard = dir.path().join("original/da");
        let leftovers: Vec<_> = std::fs::read_dir(&shard)
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().ends_with(".partial"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn test_foreign_url_is_not_found() {
        let dir = tempdir().unwrap();
        let storage = storage(dir.path()).await;

        let foreign = format!("//bucket.s3.us-east-1.amazonaws.com/{}", KEY);
        assert!(storage.key_for_url(&foreign).is_none());
        let result = storage.resolve(&foreign).await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let dir = tempdir().unwrap();
        let storage = storage(dir.path()).await;

        let result = storage.resolve(&format!("/uploads/default/{}", KEY)).await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_path_traversal_rejected() {
        let dir = tempdir().unwrap();
        let storage = storage(dir.path()).await;

        let result = storage.exists("../../../etc/passwd").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));

        let result = storage
            .store("../escape.txt", Bytes::from_static(b"x"), "text/plain")
            .await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));

        let result = storage.resolve("/uploads/default/../../etc/passwd").await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }
}
