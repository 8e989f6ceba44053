//! Upload acceptance.
//!
//! `UploadPipeline::accept` turns an `UploadRequest` into a persisted `Upload`. Each
//! step can reject the request:
//!
//! 1. a file or URL must be present
//! 2. URLs are fetched once, with a timeout
//! 3. the extension is authorized for the caller and purpose
//! 4. the size fits the image or attachment limit
//! 5. images must have readable dimensions
//! 6. known content is returned as-is (deduplication)
//! 7. bytes are stored under a hash-derived key
//! 8. the record is inserted, converging with concurrent inserts of the same hash
//! 9. avatar uploads request thumbnail generation
//!
//! Admin callers may set `retain_hours`; it is ignored for everyone else.

use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use depot_core::models::{Upload, UploadRequest, UploadSource};
use depot_core::UploadSettings;
use depot_db::{InsertOutcome, UploadRepository};
use depot_storage::{storage_key, Storage};
use uuid::Uuid;

use crate::addresser::ContentAddresser;
use crate::error::UploadError;
use crate::fetch::RemoteFetcher;
use crate::filename::{extension_of, sanitize_filename};
use crate::inspector::ImageInspector;
use crate::policy::{ExtensionPolicy, PolicyContext, SizeCategory, SizePolicy};
use crate::signal::{JobSignal, ThumbnailSignal};

pub struct UploadPipeline {
    storage: Arc<dyn Storage>,
    repository: Arc<dyn UploadRepository>,
    fetcher: Arc<dyn RemoteFetcher>,
    signal: Arc<dyn ThumbnailSignal>,
    extensions: ExtensionPolicy,
    sizes: SizePolicy,
    inspector: ImageInspector,
}

impl UploadPipeline {
    pub fn new(
        storage: Arc<dyn Storage>,
        repository: Arc<dyn UploadRepository>,
        settings: &UploadSettings,
        fetcher: Arc<dyn RemoteFetcher>,
        signal: Arc<dyn ThumbnailSignal>,
    ) -> Self {
        Self {
            storage,
            repository,
            fetcher,
            signal,
            extensions: ExtensionPolicy::from_settings(settings),
            sizes: SizePolicy::from_settings(settings),
            inspector: ImageInspector::new(),
        }
    }

    #[tracing::instrument(
        skip(self, request),
        fields(purpose = %request.purpose, user_id = ?request.caller.user_id, role = %request.caller.role)
    )]
    pub async fn accept(&self, request: UploadRequest) -> Result<Upload, UploadError> {
        let start = std::time::Instant::now();

        let (filename, data) = match request.source.clone() {
            None => return Err(UploadError::FileMissing),
            Some(UploadSource::Bytes { filename, data }) => (sanitize_filename(&filename), data),
            Some(UploadSource::Url(url)) => {
                let fetched = self.fetcher.fetch(&url).await?;
                (fetched.filename, fetched.data)
            }
        };

        if data.is_empty() {
            return Err(UploadError::FileMissing);
        }

        let extension = extension_of(&filename)
            .or_else(|| ImageInspector::sniff_extension(&data).map(String::from));
        let is_image = ImageInspector::is_image(extension.as_deref(), &data);

        let ctx = PolicyContext::for_request(&request, is_image);
        let rule = self
            .extensions
            .authorize(extension.as_deref().unwrap_or(""), &ctx)?;

        let size = data.len() as u64;
        self.sizes.check(size, SizeCategory::for_content(is_image))?;

        let dimensions = if is_image {
            Some(self.inspector.dimensions(data.clone()).await?)
        } else {
            None
        };

        let digest = ContentAddresser::hash(&data);
        let sha1 = digest.to_hex();
        let retain_hours = request
            .retain_hours
            .filter(|_| request.caller.role.is_admin());

        if let Some(existing) = self
            .repository
            .find_by_sha1(&sha1)
            .await
            .map_err(UploadError::Repository)?
        {
            tracing::info!(
                sha1 = %sha1,
                upload_id = %existing.id,
                "Upload deduplicated against existing record"
            );
            return self.apply_retain_hours(existing, retain_hours).await;
        }

        let url = self.store(&sha1, extension.as_deref(), data).await?;

        let upload = Upload {
            id: Uuid::new_v4(),
            user_id: request.caller.user_id,
            sha1: sha1.clone(),
            original_filename: filename,
            extension: extension.clone(),
            filesize: size as i64,
            width: dimensions.and_then(|(w, _)| i32::try_from(w).ok()),
            height: dimensions.and_then(|(_, h)| i32::try_from(h).ok()),
            url,
            retain_hours,
            created_at: Utc::now(),
        };

        let upload = match self
            .repository
            .insert(upload)
            .await
            .map_err(UploadError::Repository)?
        {
            InsertOutcome::Created(upload) => {
                if request.purpose.is_avatar() {
                    self.signal.emit(JobSignal::AvatarThumbnails {
                        upload_id: upload.id,
                        user_id: upload.user_id,
                    });
                }
                upload
            }
            InsertOutcome::Existing(existing) => {
                tracing::info!(
                    sha1 = %sha1,
                    upload_id = %existing.id,
                    "Concurrent upload of identical content, using existing record"
                );
                return self.apply_retain_hours(existing, retain_hours).await;
            }
        };

        tracing::info!(
            upload_id = %upload.id,
            sha1 = %upload.sha1,
            extension = ?upload.extension,
            size_bytes = size,
            rule = rule.name(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Upload accepted"
        );

        Ok(upload)
    }

    async fn store(
        &self,
        sha1: &str,
        extension: Option<&str>,
        data: Bytes,
    ) -> Result<String, UploadError> {
        let key = storage_key(sha1, extension);
        let content_type = content_type_for(extension);

        // Identical content maps to an identical key, so rewriting is harmless.
        Ok(self.storage.store(&key, data, &content_type).await?)
    }

    async fn apply_retain_hours(
        &self,
        upload: Upload,
        retain_hours: Option<i32>,
    ) -> Result<Upload, UploadError> {
        let Some(hours) = retain_hours else {
            return Ok(upload);
        };

        let updated = self
            .repository
            .set_retain_hours(upload.id, Some(hours))
            .await
            .map_err(UploadError::Repository)?;
        Ok(updated.unwrap_or(upload))
    }
}

/// MIME type for an extension, `application/octet-stream` when unknown.
pub fn content_type_for(extension: Option<&str>) -> String {
    extension
        .and_then(|ext| mime_guess::from_ext(ext).first())
        .map(|mime| mime.essence_str().to_string())
        .unwrap_or_else(|| "application/octet-stream".to_string())
}
