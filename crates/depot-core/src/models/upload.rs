use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// One stored file, identified by the SHA-1 of its bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Upload {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub sha1: String,
    pub original_filename: String,
    pub extension: Option<String>,
    pub filesize: i64,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub url: String,
    pub retain_hours: Option<i32>,
    pub created_at: DateTime<Utc>,
}

impl Upload {
    /// Extension used when serving: the stored one, else a generic fallback.
    pub fn served_extension(&self) -> &str {
        self.extension
            .as_deref()
            .filter(|ext| !ext.is_empty())
            .unwrap_or("bin")
    }
}

/// Descriptive metadata returned by the lookup endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UploadMetadata {
    pub original_filename: String,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub human_filesize: String,
}

impl From<&Upload> for UploadMetadata {
    fn from(upload: &Upload) -> Self {
        Self {
            original_filename: upload.original_filename.clone(),
            width: upload.width,
            height: upload.height,
            human_filesize: crate::human_filesize(upload.filesize.max(0) as u64),
        }
    }
}
