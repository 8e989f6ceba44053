//! Test helpers: build AppState and router for integration tests.
//!
//! Every app gets its own temp dir for local storage and an in-memory repository, so
//! tests run without Postgres or network access.

pub mod fixtures;

use async_trait::async_trait;
use axum_test::TestServer;
use bytes::Bytes;
use depot_api::setup::{build_state, routes};
use depot_core::models::Role;
use depot_core::{ApiToken, Config, DepotConfig, StorageBackend, UploadSettings};
use depot_db::MemoryUploadRepository;
use depot_processing::{ChannelSignal, FetchedFile, JobSignal, RemoteFetcher, UploadError};
use depot_storage::LocalStorage;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::mpsc::UnboundedReceiver;
use uuid::Uuid;

pub const SITE: &str = "default";
pub const REGULAR_TOKEN: &str = "regular-token";
pub const MODERATOR_TOKEN: &str = "moderator-token";
pub const ADMIN_TOKEN: &str = "admin-token";

/// Remote URL the stub fetcher serves a PNG for; every other URL fails.
pub const REMOTE_PNG_URL: &str = "https://images.example.com/photos/remote.png";

/// Test application: server plus the resources it owns.
pub struct TestApp {
    pub server: TestServer,
    pub repository: MemoryUploadRepository,
    pub signals: UnboundedReceiver<JobSignal>,
    pub _temp_dir: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }
}

struct StubFetcher;

#[async_trait]
impl RemoteFetcher for StubFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedFile, UploadError> {
        if url == REMOTE_PNG_URL {
            return Ok(FetchedFile {
                filename: "remote.png".to_string(),
                data: Bytes::from(fixtures::png(3, 2)),
                content_type: Some("image/png".to_string()),
            });
        }
        Err(UploadError::FetchFailed {
            url: url.to_string(),
            reason: "HTTP 404".to_string(),
        })
    }
}

pub fn test_config(storage_path: &str, uploads: UploadSettings) -> Config {
    let token = |token: &str, role: Role| ApiToken {
        token: token.to_string(),
        user_id: Uuid::new_v4(),
        role,
    };

    Config(Box::new(DepotConfig {
        server_port: 0,
        environment: "test".to_string(),
        log_format: "compact".to_string(),
        site_name: SITE.to_string(),
        database_url: None,
        db_max_connections: 1,
        db_timeout_seconds: 5,
        storage_backend: StorageBackend::Local,
        local_storage_path: Some(storage_path.to_string()),
        local_storage_base_url: None,
        s3_bucket: None,
        s3_region: None,
        s3_endpoint: None,
        s3_private: false,
        s3_presign_expiry_secs: 300,
        url_upload_allowlist: None,
        url_fetch_timeout_secs: 5,
        max_request_body_mb: 10,
        api_tokens: vec![
            token(REGULAR_TOKEN, Role::Regular),
            token(MODERATOR_TOKEN, Role::Moderator),
            token(ADMIN_TOKEN, Role::Admin),
        ],
        uploads,
    }))
}

/// Setup test app with default upload settings.
pub async fn setup_test_app() -> TestApp {
    setup_test_app_with(UploadSettings::default()).await
}

pub async fn setup_test_app_with(uploads: UploadSettings) -> TestApp {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let storage_path = temp_dir.path().to_string_lossy().to_string();
    let config = test_config(&storage_path, uploads);

    let storage = LocalStorage::new(temp_dir.path(), format!("/uploads/{}", SITE))
        .await
        .expect("Failed to create local storage");
    let repository = MemoryUploadRepository::new();
    let (signal, signals) = ChannelSignal::channel();

    let state = build_state(
        config.clone(),
        Arc::new(storage),
        Arc::new(repository.clone()),
        Arc::new(StubFetcher),
        Arc::new(signal),
        None,
    );
    let router = routes::setup_routes(&config, state);
    let server = TestServer::new(router.into_make_service())
        .expect("Failed to create test server");

    TestApp {
        server,
        repository,
        signals,
        _temp_dir: temp_dir,
    }
}
