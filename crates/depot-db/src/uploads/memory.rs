use async_trait::async_trait;
use depot_core::models::Upload;
use depot_core::AppError;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{InsertOutcome, UploadRepository};

/// In-process repository keyed by hash. The map lock makes insert-if-absent atomic,
/// matching the unique constraint of the Postgres table.
#[derive(Clone, Default)]
pub struct MemoryUploadRepository {
    inner: Arc<Mutex<HashMap<String, Upload>>>,
}

impl MemoryUploadRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }

    /// Rewrite a stored URL, as a backend migration would.
    pub async fn replace_url(&self, sha1: &str, url: &str) -> Option<Upload> {
        let mut guard = self.inner.lock().await;
        let upload = guard.get_mut(sha1)?;
        upload.url = url.to_string();
        Some(upload.clone())
    }
}

#[async_trait]
impl UploadRepository for MemoryUploadRepository {
    async fn find_by_sha1(&self, sha1: &str) -> Result<Option<Upload>, AppError> {
        Ok(self.inner.lock().await.get(sha1).cloned())
    }

    async fn find_by_url(&self, url: &str) -> Result<Option<Upload>, AppError> {
        Ok(self
            .inner
            .lock()
            .await
            .values()
            .find(|upload| upload.url == url)
            .cloned())
    }

    async fn insert(&self, upload: Upload) -> Result<InsertOutcome, AppError> {
        let mut guard = self.inner.lock().await;
        if let Some(existing) = guard.get(&upload.sha1) {
            return Ok(InsertOutcome::Existing(existing.clone()));
        }
        guard.insert(upload.sha1.clone(), upload.clone());
        Ok(InsertOutcome::Created(upload))
    }

    async fn set_retain_hours(
        &self,
        id: Uuid,
        retain_hours: Option<i32>,
    ) -> Result<Option<Upload>, AppError> {
        let mut guard = self.inner.lock().await;
        let updated = guard.values_mut().find(|upload| upload.id == id).map(|upload| {
            upload.retain_hours = retain_hours;
            upload.clone()
        });
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn upload(sha1: &str) -> Upload {
        Upload {
            id: Uuid::new_v4(),
            user_id: None,
            sha1: sha1.to_string(),
            original_filename: "logo.png".to_string(),
            extension: Some("png".to_string()),
            filesize: 10,
            width: Some(1),
            height: Some(1),
            url: format!("/uploads/default/original/{}/{}.png", &sha1[..2], sha1),
            retain_hours: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_second_insert_returns_existing() {
        let repo = MemoryUploadRepository::new();
        let sha1 = "a".repeat(40);

        let first = repo.insert(upload(&sha1)).await.unwrap();
        let second = repo.insert(upload(&sha1)).await.unwrap();

        assert!(first.is_created());
        assert!(!second.is_created());
        assert_eq!(first.into_upload().id, second.into_upload().id);
        assert_eq!(repo.len().await, 1);
    }

    #[tokio::test]
    async fn test_concurrent_inserts_converge() {
        let repo = MemoryUploadRepository::new();
        let sha1 = "b".repeat(40);

        let attempts = (0..16).map(|_| {
            let repo = repo.clone();
            let candidate = upload(&sha1);
            tokio::spawn(async move { repo.insert(candidate).await.unwrap() })
        });
        let outcomes: Vec<InsertOutcome> = futures::future::join_all(attempts)
            .await
            .into_iter()
            .map(|joined| joined.unwrap())
            .collect();

        assert_eq!(outcomes.iter().filter(|o| o.is_created()).count(), 1);
        let ids: std::collections::HashSet<Uuid> =
            outcomes.into_iter().map(|o| o.into_upload().id).collect();
        assert_eq!(ids.len(), 1);
    }

    #[tokio::test]
    async fn test_lookup_by_url_and_retain_hours() {
        let repo = MemoryUploadRepository::new();
        let sha1 = "c".repeat(40);
        let created = repo.insert(upload(&sha1)).await.unwrap().into_upload();

        let found = repo.find_by_url(&created.url).await.unwrap().unwrap();
        assert_eq!(found.id, created.id);

        let updated = repo
            .set_retain_hours(created.id, Some(72))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.retain_hours, Some(72));
        assert!(repo
            .set_retain_hours(Uuid::new_v4(), Some(1))
            .await
            .unwrap()
            .is_none());
    }
}
