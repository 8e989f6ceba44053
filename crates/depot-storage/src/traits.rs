use async_trait::async_trait;
use bytes::Bytes;
use depot_core::StorageBackend;
use std::time::Duration;

/// Storage-specific errors
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// How a stored file should be handed to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    /// Serve these bytes directly.
    Bytes(Bytes),
    /// Redirect the caller here. Signed and time limited for private buckets.
    Redirect(String),
}

/// Storage abstraction trait
///
/// Both backends share one contract: `store` writes bytes under a key and returns the
/// URL to record, `resolve` turns a recorded URL back into something servable.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Write `data` under `key`, returning the URL to record on the upload.
    async fn store(&self, key: &str, data: Bytes, content_type: &str) -> StorageResult<String>;

    /// Resolve a URL previously returned by `store`.
    ///
    /// URLs this backend did not produce yield `StorageError::NotFound`.
    async fn resolve(&self, url: &str) -> StorageResult<Resolved>;

    /// Storage key behind a URL produced by this backend, `None` for foreign URLs.
    fn key_for_url(&self, url: &str) -> Option<String>;

    /// Time-limited URL for reading `key`. Backends without signing return the plain URL.
    async fn get_presigned_url(&self, key: &str, expires_in: Duration) -> StorageResult<String>;

    /// Whether `key` exists
    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}
