//! Storage backend setup

use anyhow::{Context, Result};
use depot_core::Config;
use depot_storage::Storage;
use std::sync::Arc;

pub async fn setup_storage(config: &Config) -> Result<Arc<dyn Storage>> {
    let storage = depot_storage::create_storage(config)
        .await
        .context("Failed to initialize storage backend")?;

    tracing::info!(
        backend = %storage.backend_type(),
        site = %config.site_name(),
        "Storage backend ready"
    );

    Ok(storage)
}
