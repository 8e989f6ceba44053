//! Application setup and initialization
//!
//! `initialize_app` wires configuration into concrete collaborators. `build_state` takes
//! them ready-made so integration tests can substitute a temp dir and the in-memory
//! repository.

pub mod database;
pub mod jobs;
pub mod routes;
pub mod server;
pub mod storage;

use crate::state::{AppState, AuthState, HealthState, UploadState};
use anyhow::{Context, Result};
use depot_core::Config;
use depot_db::{MemoryUploadRepository, PgUploadRepository, UploadRepository};
use depot_processing::{
    ChannelSignal, HttpFetcher, JobSignal, RemoteFetcher, ThumbnailSignal, UploadPipeline,
    UploadResolver,
};
use depot_storage::Storage;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;

/// Initialize the entire application
pub async fn initialize_app(
    config: Config,
) -> Result<(Arc<AppState>, axum::Router, UnboundedReceiver<JobSignal>)> {
    config
        .validate()
        .context("Configuration validation failed")?;

    crate::telemetry::init_tracing(config.log_format());
    tracing::info!(
        environment = %config.environment(),
        "Configuration loaded and validated successfully"
    );

    let (repository, pool): (Arc<dyn UploadRepository>, Option<PgPool>) =
        match config.database_url() {
            Some(url) => {
                let pool = database::setup_database(&config, url).await?;
                (Arc::new(PgUploadRepository::new(pool.clone())), Some(pool))
            }
            None => {
                tracing::warn!("DATABASE_URL not set, upload records are kept in memory");
                (Arc::new(MemoryUploadRepository::new()), None)
            }
        };

    let storage = storage::setup_storage(&config).await?;

    let uploads = config.uploads();
    let max_fetch_bytes = uploads
        .max_image_size_kb
        .max(uploads.max_attachment_size_kb)
        .saturating_mul(1024);
    let fetcher = HttpFetcher::new(Duration::from_secs(config.url_fetch_timeout_secs()))
        .context("Failed to build HTTP client for remote uploads")?
        .with_allowlist(config.url_upload_allowlist().map(<[String]>::to_vec))
        .with_max_bytes(max_fetch_bytes);

    let (signal, receiver) = ChannelSignal::channel();

    let state = build_state(
        config.clone(),
        storage,
        repository,
        Arc::new(fetcher),
        Arc::new(signal),
        pool,
    );
    let router = routes::setup_routes(&config, state.clone());

    Ok((state, router, receiver))
}

/// Assemble the shared state from ready-made collaborators.
pub fn build_state(
    config: Config,
    storage: Arc<dyn Storage>,
    repository: Arc<dyn UploadRepository>,
    fetcher: Arc<dyn RemoteFetcher>,
    signal: Arc<dyn ThumbnailSignal>,
    pool: Option<PgPool>,
) -> Arc<AppState> {
    let settings = config.uploads();

    let pipeline = UploadPipeline::new(
        storage.clone(),
        repository.clone(),
        settings,
        fetcher,
        signal,
    );
    let resolver = UploadResolver::new(
        storage.clone(),
        repository,
        config.site_name(),
        settings,
    );

    Arc::new(AppState {
        uploads: UploadState {
            pipeline: Arc::new(pipeline),
            resolver: Arc::new(resolver),
        },
        auth: AuthState {
            tokens: Arc::new(config.api_tokens().to_vec()),
        },
        health: HealthState { storage, pool },
        config,
    })
}
