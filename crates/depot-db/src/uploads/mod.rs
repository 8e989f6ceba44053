//! Upload repository trait and its implementations.

mod memory;
mod postgres;

pub use memory::MemoryUploadRepository;
pub use postgres::PgUploadRepository;

use depot_core::models::Upload;
use depot_core::AppError;
use uuid::Uuid;

/// Result of inserting an upload whose hash may already be recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The record was written.
    Created(Upload),
    /// Another record already holds this hash; it is returned unchanged.
    Existing(Upload),
}

impl InsertOutcome {
    pub fn into_upload(self) -> Upload {
        match self {
            InsertOutcome::Created(upload) | InsertOutcome::Existing(upload) => upload,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, InsertOutcome::Created(_))
    }
}

#[async_trait::async_trait]
pub trait UploadRepository: Send + Sync {
    async fn find_by_sha1(&self, sha1: &str) -> Result<Option<Upload>, AppError>;

    async fn find_by_url(&self, url: &str) -> Result<Option<Upload>, AppError>;

    /// Insert unless a record with the same `sha1` exists. Must be atomic per hash.
    async fn insert(&self, upload: Upload) -> Result<InsertOutcome, AppError>;

    /// Administrative retention override.
    async fn set_retain_hours(
        &self,
        id: Uuid,
        retain_hours: Option<i32>,
    ) -> Result<Option<Upload>, AppError>;
}
