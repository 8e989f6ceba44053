//! Serving uploads back by hash, short URL or stored URL.

use std::sync::{Arc, LazyLock};

use bytes::Bytes;
use depot_core::models::{Caller, Upload, UploadMetadata};
use depot_core::UploadSettings;
use depot_db::UploadRepository;
use depot_storage::{Resolved, Storage};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::addresser::{ContentAddresser, Sha1Digest};
use crate::error::ResolveError;
use crate::filename::disposition_filename;
use crate::inspector::ImageInspector;
use crate::pipeline::content_type_for;

static LOOKUP_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9a-fA-F]{40})(?:\.([A-Za-z0-9]+))?$").expect("lookup key pattern is valid")
});

const SHORT_URL_SCHEME: &str = "upload://";

/// `<sha1>[.<ext>]` as it appears in a download path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupKey {
    pub sha1: String,
    pub extension: Option<String>,
}

impl LookupKey {
    pub fn parse(key: &str) -> Result<Self, ResolveError> {
        let captures = LOOKUP_KEY
            .captures(key)
            .ok_or_else(|| ResolveError::InvalidLookupKey(key.to_string()))?;

        Ok(Self {
            sha1: captures[1].to_lowercase(),
            extension: captures.get(2).map(|ext| ext.as_str().to_lowercase()),
        })
    }
}

/// How a found upload should be delivered.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedUpload {
    /// Send the bytes inline, as an attachment named `filename`.
    File {
        upload: Upload,
        data: Bytes,
        filename: String,
        content_type: String,
    },
    /// Send the client elsewhere; the location may be presigned.
    Redirect { upload: Upload, location: String },
}

impl ResolvedUpload {
    pub fn upload(&self) -> &Upload {
        match self {
            ResolvedUpload::File { upload, .. } | ResolvedUpload::Redirect { upload, .. } => {
                upload
            }
        }
    }
}

/// One recognized entry of a short URL batch lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortUrlLookup {
    pub short_url: String,
    pub short_path: String,
    pub url: String,
}

pub struct UploadResolver {
    storage: Arc<dyn Storage>,
    repository: Arc<dyn UploadRepository>,
    site_name: String,
    prevent_anonymous_downloads: bool,
}

impl UploadResolver {
    pub fn new(
        storage: Arc<dyn Storage>,
        repository: Arc<dyn UploadRepository>,
        site_name: impl Into<String>,
        settings: &UploadSettings,
    ) -> Self {
        Self {
            storage,
            repository,
            site_name: site_name.into(),
            prevent_anonymous_downloads: settings.prevent_anonymous_downloads,
        }
    }

    /// Resolve `/uploads/{site}/{sha1}[.{ext}]`.
    #[tracing::instrument(skip(self, caller), fields(authenticated = caller.is_authenticated()))]
    pub async fn show(
        &self,
        site: &str,
        key: &str,
        caller: &Caller,
    ) -> Result<ResolvedUpload, ResolveError> {
        if site != self.site_name {
            tracing::debug!(site = %site, "Lookup for unknown site");
            return Err(ResolveError::NotFound);
        }

        let key = LookupKey::parse(key)?;
        self.serve(&key.sha1, caller).await
    }

    /// Resolve `/uploads/short-url/{short_id}[.{ext}]`.
    #[tracing::instrument(skip(self, caller), fields(authenticated = caller.is_authenticated()))]
    pub async fn show_short(
        &self,
        short: &str,
        caller: &Caller,
    ) -> Result<ResolvedUpload, ResolveError> {
        let digest = parse_short(short)
            .ok_or_else(|| ResolveError::InvalidLookupKey(short.to_string()))?;
        self.serve(&digest.to_hex(), caller).await
    }

    /// Map `upload://` short URLs to their canonical paths and stored URLs.
    ///
    /// Results keep input order; entries that do not decode or have no record are skipped.
    pub async fn lookup_urls(
        &self,
        short_urls: &[String],
    ) -> Result<Vec<ShortUrlLookup>, ResolveError> {
        let mut found = Vec::with_capacity(short_urls.len());

        for short_url in short_urls {
            let Some(digest) = short_url
                .strip_prefix(SHORT_URL_SCHEME)
                .and_then(parse_short)
            else {
                tracing::debug!(short_url = %short_url, "Skipping unrecognized short URL");
                continue;
            };

            let Some(upload) = self.find(&digest.to_hex()).await? else {
                continue;
            };

            found.push(ShortUrlLookup {
                short_url: short_url.clone(),
                short_path: ContentAddresser::short_path(&digest, upload.extension.as_deref()),
                url: upload.url,
            });
        }

        Ok(found)
    }

    /// Descriptive metadata for a stored URL or an `upload://` short URL.
    pub async fn lookup_metadata(&self, url: &str) -> Result<UploadMetadata, ResolveError> {
        let upload = match url.strip_prefix(SHORT_URL_SCHEME) {
            Some(short) => {
                let digest = parse_short(short).ok_or(ResolveError::NotFound)?;
                self.find(&digest.to_hex()).await?
            }
            None => self
                .repository
                .find_by_url(url)
                .await
                .map_err(ResolveError::Repository)?,
        };

        upload
            .as_ref()
            .map(UploadMetadata::from)
            .ok_or(ResolveError::NotFound)
    }

    async fn find(&self, sha1: &str) -> Result<Option<Upload>, ResolveError> {
        self.repository
            .find_by_sha1(sha1)
            .await
            .map_err(ResolveError::Repository)
    }

    async fn serve(&self, sha1: &str, caller: &Caller) -> Result<ResolvedUpload, ResolveError> {
        if self.prevent_anonymous_downloads && !caller.is_authenticated() {
            tracing::debug!(sha1 = %sha1, "Anonymous download refused");
            return Err(ResolveError::NotFound);
        }

        let upload = self.find(sha1).await?.ok_or(ResolveError::NotFound)?;

        let resolved = match self.storage.resolve(&upload.url).await {
            Ok(resolved) => resolved,
            Err(e) => {
                tracing::warn!(
                    sha1 = %sha1,
                    url = %upload.url,
                    backend = %self.storage.backend_type(),
                    error = %e,
                    "Stored URL could not be resolved"
                );
                return Err(ResolveError::NotFound);
            }
        };

        Ok(match resolved {
            Resolved::Redirect(location) => ResolvedUpload::Redirect { upload, location },
            Resolved::Bytes(data) => {
                let extension = served_extension(&upload, &data);
                let filename =
                    disposition_filename(&upload.original_filename, &upload.sha1, &extension);
                let content_type = content_type_for(Some(&extension));
                ResolvedUpload::File {
                    upload,
                    data,
                    filename,
                    content_type,
                }
            }
        })
    }
}

/// Short id with an optional `.ext` suffix.
fn parse_short(short: &str) -> Option<Sha1Digest> {
    let id = short.split_once('.').map_or(short, |(id, _)| id);
    ContentAddresser::from_short_id(id)
}

/// The record's extension, else one sniffed from the bytes, else `bin`.
fn served_extension(upload: &Upload, data: &[u8]) -> String {
    match upload.extension.as_deref().filter(|ext| !ext.is_empty()) {
        Some(ext) => ext.to_string(),
        None => ImageInspector::sniff_extension(data)
            .unwrap_or(upload.served_extension())
            .to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use depot_core::models::Role;
    use depot_db::MemoryUploadRepository;
    use depot_storage::{storage_key, LocalStorage, StorageError, StorageResult};
    use depot_storage::StorageBackend;
    use std::time::Duration;
    use tempfile::TempDir;
    use uuid::Uuid;

    const SITE: &str = "default";

    struct Fixture {
        resolver: UploadResolver,
        repository: MemoryUploadRepository,
        storage: Arc<LocalStorage>,
        _dir: TempDir,
    }

    async fn fixture(settings: UploadSettings) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(
            LocalStorage::new(dir.path(), format!("/uploads/{}", SITE))
                .await
                .unwrap(),
        );
        let repository = MemoryUploadRepository::new();
        let resolver = UploadResolver::new(
            storage.clone(),
            Arc::new(repository.clone()),
            SITE,
            &settings,
        );
        Fixture {
            resolver,
            repository,
            storage,
            _dir: dir,
        }
    }

    impl Fixture {
        async fn put(&self, data: &'static [u8], filename: &str, extension: Option<&str>) -> Upload {
            let digest = ContentAddresser::hash(data);
            let sha1 = digest.to_hex();
            let url = self
                .storage
                .store(
                    &storage_key(&sha1, extension),
                    Bytes::from_static(data),
                    "application/octet-stream",
                )
                .await
                .unwrap();
            let upload = Upload {
                id: Uuid::new_v4(),
                user_id: None,
                sha1,
                original_filename: filename.to_string(),
                extension: extension.map(String::from),
                filesize: data.len() as i64,
                width: None,
                height: None,
                url,
                retain_hours: None,
                created_at: Utc::now(),
            };
            self.repository.insert(upload).await.unwrap().into_upload()
        }
    }

    fn user() -> Caller {
        Caller::user(Uuid::new_v4(), Role::Regular)
    }

    #[test]
    fn test_lookup_key_parsing() {
        let key = LookupKey::parse("DA39A3EE5E6B4B0D3255BFEF95601890AFD80709.PNG").unwrap();
        assert_eq!(key.sha1, "da39a3ee5e6b4b0d3255bfef95601890afd80709");
        assert_eq!(key.extension.as_deref(), Some("png"));

        assert!(LookupKey::parse("da39a3ee5e6b4b0d3255bfef95601890afd80709")
            .unwrap()
            .extension
            .is_none());
        for bad in ["", "abc", "../../etc/passwd", "da39a3ee5e6b4b0d3255bfef95601890afd80709.p/g"] {
            assert!(matches!(
                LookupKey::parse(bad),
                Err(ResolveError::InvalidLookupKey(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_show_returns_bytes_with_original_filename() {
        let f = fixture(UploadSettings::default()).await;
        let upload = f.put(b"%PDF-1.7", "report.pdf", Some("pdf")).await;

        let resolved = f
            .resolver
            .show(SITE, &format!("{}.pdf", upload.sha1), &user())
            .await
            .unwrap();

        match resolved {
            ResolvedUpload::File {
                data,
                filename,
                content_type,
                ..
            } => {
                assert_eq!(data, Bytes::from_static(b"%PDF-1.7"));
                assert_eq!(filename, "report.pdf");
                assert_eq!(content_type, "application/pdf");
            }
            other => panic!("Expected file, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_extensionless_filename_gets_default_extension() {
        let f = fixture(UploadSettings::default()).await;
        let with_ext = f.put(b"first", "image_file", Some("png")).await;
        let without_ext = f.put(b"second", "notes", None).await;

        let resolved = f.resolver.show(SITE, &with_ext.sha1, &user()).await.unwrap();
        assert!(matches!(resolved, ResolvedUpload::File { ref filename, .. } if filename == "image_file.png"));

        let resolved = f
            .resolver
            .show(SITE, &without_ext.sha1, &user())
            .await
            .unwrap();
        assert!(matches!(resolved, ResolvedUpload::File { ref filename, .. } if filename == "notes.bin"));
    }

    #[tokio::test]
    async fn test_empty_filename_falls_back_to_hash() {
        let f = fixture(UploadSettings::default()).await;
        let upload = f.put(b"anonymous bytes", "", Some("txt")).await;

        let resolved = f.resolver.show(SITE, &upload.sha1, &user()).await.unwrap();
        let expected = format!("{}.txt", upload.sha1);
        assert!(matches!(resolved, ResolvedUpload::File { ref filename, .. } if *filename == expected));
    }

    #[tokio::test]
    async fn test_unknown_site_and_hash_are_not_found() {
        let f = fixture(UploadSettings::default()).await;
        let upload = f.put(b"content", "a.txt", Some("txt")).await;

        assert!(matches!(
            f.resolver.show("other", &upload.sha1, &user()).await,
            Err(ResolveError::NotFound)
        ));
        assert!(matches!(
            f.resolver
                .show(SITE, "0000000000000000000000000000000000000000", &user())
                .await,
            Err(ResolveError::NotFound)
        ));
        assert!(matches!(
            f.resolver.show(SITE, "not-a-hash", &user()).await,
            Err(ResolveError::InvalidLookupKey(_))
        ));
    }

    #[tokio::test]
    async fn test_anonymous_downloads_can_be_prevented() {
        let settings = UploadSettings {
            prevent_anonymous_downloads: true,
            ..UploadSettings::default()
        };
        let f = fixture(settings).await;
        let upload = f.put(b"members only", "a.txt", Some("txt")).await;

        assert!(matches!(
            f.resolver.show(SITE, &upload.sha1, &Caller::anonymous()).await,
            Err(ResolveError::NotFound)
        ));
        assert!(f.resolver.show(SITE, &upload.sha1, &user()).await.is_ok());
    }

    #[tokio::test]
    async fn test_migrated_url_is_not_found() {
        let f = fixture(UploadSettings::default()).await;
        let upload = f.put(b"moved away", "a.txt", Some("txt")).await;
        f.repository
            .replace_url(
                &upload.sha1,
                &format!("//bucket.s3.us-east-1.amazonaws.com/original/{}", upload.sha1),
            )
            .await
            .unwrap();

        assert!(matches!(
            f.resolver.show(SITE, &upload.sha1, &user()).await,
            Err(ResolveError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_show_short_matches_show() {
        let f = fixture(UploadSettings::default()).await;
        let upload = f.put(b"short", "s.txt", Some("txt")).await;
        let digest: Sha1Digest = upload.sha1.parse().unwrap();
        let short = format!("{}.txt", ContentAddresser::short_id(&digest));

        let by_short = f.resolver.show_short(&short, &user()).await.unwrap();
        let by_hash = f.resolver.show(SITE, &upload.sha1, &user()).await.unwrap();
        assert_eq!(by_short, by_hash);

        assert!(matches!(
            f.resolver.show_short("0OIl", &user()).await,
            Err(ResolveError::InvalidLookupKey(_))
        ));
    }

    #[tokio::test]
    async fn test_lookup_urls_keeps_order_and_skips_unknown() {
        let f = fixture(UploadSettings::default()).await;
        let a = f.put(b"first", "a.png", Some("png")).await;
        let b = f.put(b"second", "b.pdf", Some("pdf")).await;
        let a_digest: Sha1Digest = a.sha1.parse().unwrap();
        let b_digest: Sha1Digest = b.sha1.parse().unwrap();
        let unknown = ContentAddresser::hash(b"never uploaded");

        let input = vec![
            ContentAddresser::short_url(&b_digest, Some("pdf")),
            ContentAddresser::short_url(&unknown, Some("png")),
            "https://example.com/not-a-short-url.png".to_string(),
            ContentAddresser::short_url(&a_digest, Some("png")),
        ];

        let found = f.resolver.lookup_urls(&input).await.unwrap();
        assert_eq!(
            found,
            vec![
                ShortUrlLookup {
                    short_url: input[0].clone(),
                    short_path: ContentAddresser::short_path(&b_digest, Some("pdf")),
                    url: b.url.clone(),
                },
                ShortUrlLookup {
                    short_url: input[3].clone(),
                    short_path: ContentAddresser::short_path(&a_digest, Some("png")),
                    url: a.url.clone(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_lookup_metadata() {
        let f = fixture(UploadSettings::default()).await;
        let upload = f.put(b"metadata please", "doc.txt", Some("txt")).await;

        let metadata = f.resolver.lookup_metadata(&upload.url).await.unwrap();
        assert_eq!(metadata.original_filename, "doc.txt");
        assert_eq!(metadata.human_filesize, "15 Bytes");

        let digest: Sha1Digest = upload.sha1.parse().unwrap();
        let by_short = f
            .resolver
            .lookup_metadata(&ContentAddresser::short_url(&digest, Some("txt")))
            .await
            .unwrap();
        assert_eq!(by_short.original_filename, "doc.txt");

        assert!(matches!(
            f.resolver.lookup_metadata("/uploads/default/missing.txt").await,
            Err(ResolveError::NotFound)
        ));
    }

    /// Backend that always redirects, standing in for a private object store.
    struct RedirectStorage;

    #[async_trait::async_trait]
    impl Storage for RedirectStorage {
        async fn store(&self, key: &str, _data: Bytes, _ct: &str) -> StorageResult<String> {
            Ok(format!("//bucket.example.com/{}", key))
        }

        async fn resolve(&self, url: &str) -> StorageResult<Resolved> {
            let key = self
                .key_for_url(url)
                .ok_or_else(|| StorageError::NotFound(url.to_string()))?;
            Ok(Resolved::Redirect(format!(
                "https://bucket.example.com/{}?X-Amz-Expires=300&X-Amz-Signature=abc",
                key
            )))
        }

        fn key_for_url(&self, url: &str) -> Option<String> {
            url.strip_prefix("//bucket.example.com/").map(String::from)
        }

        async fn get_presigned_url(&self, key: &str, _expires_in: Duration) -> StorageResult<String> {
            Ok(format!("https://bucket.example.com/{}", key))
        }

        async fn exists(&self, _key: &str) -> StorageResult<bool> {
            Ok(true)
        }

        fn backend_type(&self) -> StorageBackend {
            StorageBackend::S3
        }
    }

    #[tokio::test]
    async fn test_object_store_redirects() {
        let repository = MemoryUploadRepository::new();
        let sha1 = ContentAddresser::hash(b"remote").to_hex();
        repository
            .insert(Upload {
                id: Uuid::new_v4(),
                user_id: None,
                sha1: sha1.clone(),
                original_filename: "remote.png".to_string(),
                extension: Some("png".to_string()),
                filesize: 6,
                width: Some(1),
                height: Some(1),
                url: format!("//bucket.example.com/{}", storage_key(&sha1, Some("png"))),
                retain_hours: None,
                created_at: Utc::now(),
            })
            .await
            .unwrap();

        let resolver = UploadResolver::new(
            Arc::new(RedirectStorage),
            Arc::new(repository),
            SITE,
            &UploadSettings::default(),
        );

        match resolver.show(SITE, &sha1, &user()).await.unwrap() {
            ResolvedUpload::Redirect { location, .. } => {
                assert!(location.contains("X-Amz-Signature="));
                assert!(location.contains("X-Amz-Expires="));
            }
            other => panic!("Expected redirect, got {:?}", other),
        }
    }
}
