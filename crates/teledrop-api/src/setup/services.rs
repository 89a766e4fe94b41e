//! Service initialization and application state setup

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use teledrop_core::Config;
use teledrop_services::{
    ChunkStore, ChunkSweeper, Dispatcher, FileGateway, MetadataStore, TelegramClient,
    UploadService, Upstream,
};

use crate::state::{AppState, SecurityConfig};

/// Initialize the upload pipeline and retrieval gateway, returning the application state
pub async fn initialize_services(
    config: &Config,
    chunks: ChunkStore,
    metadata: MetadataStore,
) -> Result<Arc<AppState>> {
    let telegram =
        TelegramClient::from_config(config).context("Failed to create Telegram client")?;
    let upstream: Arc<dyn Upstream> = Arc::new(telegram);
    tracing::info!(
        api_base = %config.telegram_api_base(),
        timeout_secs = config.upstream_timeout_secs(),
        max_retries = config.upstream_max_retries(),
        "Telegram client initialized"
    );

    let dispatcher = Dispatcher::new(
        upstream.clone(),
        metadata.clone(),
        config.media_group_size(),
    );
    let uploads = UploadService::new(
        chunks.clone(),
        dispatcher,
        config.max_upload_size_bytes(),
    );
    let gateway = FileGateway::new(upstream, metadata.clone());

    let sweeper = match config.chunk_sweep_interval_secs() {
        0 => {
            tracing::info!("Chunk sweeper disabled");
            None
        }
        secs => Some(Arc::new(ChunkSweeper::spawn(
            chunks.clone(),
            Duration::from_secs(secs),
        ))),
    };

    let security = SecurityConfig::from_config(config);
    if security.auth_token.is_none() {
        tracing::warn!("AUTH_TOKEN not set, upload and management routes are open");
    }

    Ok(Arc::new(AppState {
        config: config.clone(),
        security,
        uploads,
        gateway,
        chunks,
        metadata,
        sweeper,
    }))
}
