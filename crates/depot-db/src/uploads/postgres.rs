use async_trait::async_trait;
use depot_core::models::Upload;
use depot_core::AppError;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use super::{InsertOutcome, UploadRepository};

const UPLOAD_COLUMNS: &str = "id, user_id, sha1, original_filename, extension, filesize, \
     width, height, url, retain_hours, created_at";

/// Repository for the `uploads` table. The `UNIQUE (sha1)` constraint arbitrates
/// concurrent inserts of identical content.
#[derive(Clone)]
pub struct PgUploadRepository {
    pool: PgPool,
}

impl PgUploadRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UploadRepository for PgUploadRepository {
    #[tracing::instrument(skip(self), fields(db.table = "uploads", db.operation = "select"))]
    async fn find_by_sha1(&self, sha1: &str) -> Result<Option<Upload>, AppError> {
        let row = sqlx::query_as::<Postgres, Upload>(&format!(
            "SELECT {} FROM uploads WHERE sha1 = $1",
            UPLOAD_COLUMNS
        ))
        .bind(sha1)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    #[tracing::instrument(skip(self), fields(db.table = "uploads", db.operation = "select"))]
    async fn find_by_url(&self, url: &str) -> Result<Option<Upload>, AppError> {
        let row = sqlx::query_as::<Postgres, Upload>(&format!(
            "SELECT {} FROM uploads WHERE url = $1",
            UPLOAD_COLUMNS
        ))
        .bind(url)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    #[tracing::instrument(
        skip(self, upload),
        fields(db.table = "uploads", db.operation = "insert", sha1 = %upload.sha1)
    )]
    async fn insert(&self, upload: Upload) -> Result<InsertOutcome, AppError> {
        let inserted = sqlx::query_as::<Postgres, Upload>(&format!(
            r#"
            INSERT INTO uploads (
                id, user_id, sha1, original_filename, extension, filesize,
                width, height, url, retain_hours, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (sha1) DO NOTHING
            RETURNING {}
            "#,
            UPLOAD_COLUMNS
        ))
        .bind(upload.id)
        .bind(upload.user_id)
        .bind(&upload.sha1)
        .bind(&upload.original_filename)
        .bind(&upload.extension)
        .bind(upload.filesize)
        .bind(upload.width)
        .bind(upload.height)
        .bind(&upload.url)
        .bind(upload.retain_hours)
        .bind(upload.created_at)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(created) = inserted {
            return Ok(InsertOutcome::Created(created));
        }

        tracing::debug!(sha1 = %upload.sha1, "Upload with identical hash already recorded");
        let existing = self.find_by_sha1(&upload.sha1).await?.ok_or_else(|| {
            AppError::Internal(format!(
                "Upload {} conflicted on insert but could not be read back",
                upload.sha1
            ))
        })?;
        Ok(InsertOutcome::Existing(existing))
    }

    #[tracing::instrument(skip(self), fields(db.table = "uploads", db.operation = "update", db.record_id = %id))]
    async fn set_retain_hours(
        &self,
        id: Uuid,
        retain_hours: Option<i32>,
    ) -> Result<Option<Upload>, AppError> {
        let row = sqlx::query_as::<Postgres, Upload>(&format!(
            "UPDATE uploads SET retain_hours = $2 WHERE id = $1 RETURNING {}",
            UPLOAD_COLUMNS
        ))
        .bind(id)
        .bind(retain_hours)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }
}
