use crate::traits::{Resolved, Storage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use http::Method;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path;
use object_store::signer::Signer;
use object_store::Error as ObjectStoreError;
use object_store::{
    Attribute, Attributes, ObjectStore, ObjectStoreExt, PutOptions, PutPayload,
    Result as ObjectResult,
};
use std::time::Duration;

/// S3 storage implementation
///
/// Uploads record protocol-relative URLs (`//host/key`). Public buckets redirect to the
/// plain object URL. Private buckets redirect to a presigned GET URL that expires after
/// `presign_expiry`.
#[derive(Clone)]
pub struct S3Storage {
    store: AmazonS3,
    bucket: String,
    region: String,
    endpoint_url: Option<String>, // Custom endpoint for S3-compatible providers
    private: bool,
    presign_expiry: Duration,
}

impl S3Storage {
    /// Create a new S3Storage instance with credentials taken from the environment
    ///
    /// # Arguments
    /// * `bucket` - S3 bucket name
    /// * `region` - AWS region (or region identifier for S3-compatible providers)
    /// * `endpoint_url` - Optional custom endpoint URL for S3-compatible providers
    ///   (e.g., "http://localhost:9000" for MinIO)
    pub async fn new(
        bucket: String,
        region: String,
        endpoint_url: Option<String>,
    ) -> StorageResult<Self> {
        Self::from_builder(AmazonS3Builder::from_env(), bucket, region, endpoint_url)
    }

    /// Build from a preconfigured builder; bucket, region and endpoint are applied here.
    pub fn from_builder(
        builder: AmazonS3Builder,
        bucket: String,
        region: String,
        endpoint_url: Option<String>,
    ) -> StorageResult<Self> {
        let mut builder = builder
            .with_region(region.clone())
            .with_bucket_name(bucket.clone());

        if let Some(ref endpoint) = endpoint_url {
            let allow_http = endpoint.starts_with("http://");
            builder = builder
                .with_endpoint(endpoint.clone())
                .with_allow_http(allow_http);
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;

        Ok(S3Storage {
            store,
            bucket,
            region,
            endpoint_url,
            private: false,
            presign_expiry: Duration::from_secs(300),
        })
    }

    /// Serve reads through presigned URLs valid for `expiry`.
    pub fn with_private_access(mut self, expiry: Duration) -> Self {
        self.private = true;
        self.presign_expiry = expiry;
        self
    }

    pub fn is_private(&self) -> bool {
        self.private
    }

    /// URL prefix shared by every object in this bucket
    ///
    /// For AWS S3: `https://{bucket}.s3.{region}.amazonaws.com`.
    /// For S3-compatible providers, path style: `{endpoint}/{bucket}`.
    fn base_url(&self) -> String {
        match self.endpoint_url {
            Some(ref endpoint) => format!("{}/{}", endpoint.trim_end_matches('/'), self.bucket),
            None => format!("https://{}.s3.{}.amazonaws.com", self.bucket, self.region),
        }
    }

    fn generate_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url(), key)
    }

    /// URL stored on the upload record: the object URL without its scheme.
    fn recorded_url(&self, key: &str) -> String {
        let url = self.generate_url(key);
        match url.split_once("//") {
            Some((_, rest)) => format!("//{}", rest),
            None => url,
        }
    }
}

#[async_trait]
impl Storage for S3Storage {
    async fn store(&self, key: &str, data: Bytes, content_type: &str) -> StorageResult<String> {
        let size = data.len() as u64;
        let location = Path::from(key.to_string());
        let start = std::time::Instant::now();

        let mut attributes = Attributes::new();
        attributes.insert(Attribute::ContentType, content_type.to_string().into());
        let options = PutOptions {
            attributes,
            ..Default::default()
        };

        let result: ObjectResult<_> = self
            .store
            .put_opts(&location, PutPayload::from(data), options)
            .await;

        result.map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %self.bucket,
                key = %key,
                size_bytes = size,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 upload failed"
            );
            StorageError::UploadFailed(e.to_string())
        })?;

        let url = self.recorded_url(key);

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 upload successful"
        );

        Ok(url)
    }

    async fn resolve(&self, url: &str) -> StorageResult<Resolved> {
        let key = self.key_for_url(url).ok_or_else(|| {
            tracing::warn!(url = %url, bucket = %self.bucket, "URL does not belong to this bucket");
            StorageError::NotFound(url.to_string())
        })?;

        if !self.private {
            return Ok(Resolved::Redirect(self.generate_url(&key)));
        }

        let signed = self.get_presigned_url(&key, self.presign_expiry).await?;
        Ok(Resolved::Redirect(signed))
    }

    fn key_for_url(&self, url: &str) -> Option<String> {
        let base = self.base_url();
        // Protocol-relative URLs are recorded by some older uploads.
        let base_without_scheme = base.split_once("//").map(|(_, rest)| rest);
        let rest = url.strip_prefix(base.as_str()).or_else(|| {
            let without_scheme = url.split_once("//").map(|(_, rest)| rest)?;
            without_scheme.strip_prefix(base_without_scheme?)
        })?;
        rest.strip_prefix('/')
            .filter(|key| !key.is_empty() && !key.contains(".."))
            .map(String::from)
    }

    async fn get_presigned_url(&self, key: &str, expires_in: Duration) -> StorageResult<String> {
        let location = Path::from(key.to_string());
        let url_result: ObjectResult<_> = self
            .store
            .signed_url(Method::GET, &location, expires_in)
            .await;

        let url = url_result
            .map_err(|e| StorageError::BackendError(e.to_string()))?
            .to_string();

        tracing::debug!(
            bucket = %self.bucket,
            key = %key,
            expires_in_secs = expires_in.as_secs(),
            "Generated presigned URL"
        );

        Ok(url)
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        let location = Path::from(key.to_string());
        match self.store.head(&location).await {
            Ok(_) => Ok(true),
            Err(ObjectStoreError::NotFound { .. }) => Ok(false),
            Err(e) => Err(StorageError::BackendError(e.to_string())),
        }
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }
}
