//! Application state and sub-state extractors.
//!
//! Handlers extract only the slice they need through Axum's `FromRef`.

use std::sync::Arc;

use axum::extract::FromRef;
use depot_core::{ApiToken, Config};
use depot_processing::{UploadPipeline, UploadResolver};
use depot_storage::Storage;
use sqlx::PgPool;

/// Pipeline and resolver shared by the upload handlers.
#[derive(Clone)]
pub struct UploadState {
    pub pipeline: Arc<UploadPipeline>,
    pub resolver: Arc<UploadResolver>,
}

/// Static bearer tokens, checked by the caller middleware.
#[derive(Clone)]
pub struct AuthState {
    pub tokens: Arc<Vec<ApiToken>>,
}

/// Dependencies checked by the health endpoint.
#[derive(Clone)]
pub struct HealthState {
    pub storage: Arc<dyn Storage>,
    /// `None` when uploads are kept in memory.
    pub pool: Option<PgPool>,
}

pub struct AppState {
    pub config: Config,
    pub uploads: UploadState,
    pub auth: AuthState,
    pub health: HealthState,
}

impl FromRef<Arc<AppState>> for UploadState {
    fn from_ref(state: &Arc<AppState>) -> Self {
        state.uploads.clone()
    }
}

impl FromRef<Arc<AppState>> for AuthState {
    fn from_ref(state: &Arc<AppState>) -> Self {
        state.auth.clone()
    }
}

impl FromRef<Arc<AppState>> for HealthState {
    fn from_ref(state: &Arc<AppState>) -> Self {
        state.health.clone()
    }
}
