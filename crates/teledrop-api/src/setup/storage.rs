//! Key-value namespace setup

use anyhow::{Context, Result};
use std::time::Duration;
use teledrop_core::Config;
use teledrop_services::{create_kv_store, ChunkStore, MetadataStore, Namespace};

/// Bind the chunk and metadata namespaces to the configured backend
pub async fn setup_storage(config: &Config) -> Result<(ChunkStore, MetadataStore)> {
    tracing::info!(backend = %config.kv_backend(), "Initializing key-value namespaces...");

    let chunk_kv = create_kv_store(config, Namespace::Chunks)
        .await
        .with_context(|| format!("Failed to open {} namespace", Namespace::Chunks.as_str()))?;
    let metadata_kv = create_kv_store(config, Namespace::Metadata)
        .await
        .with_context(|| format!("Failed to open {} namespace", Namespace::Metadata.as_str()))?;

    let chunk_ttl = match config.chunk_ttl_secs() {
        0 => None,
        secs => Some(Duration::from_secs(secs)),
    };

    tracing::info!(
        chunk_ttl_secs = config.chunk_ttl_secs(),
        "Key-value namespaces initialized successfully"
    );

    Ok((
        ChunkStore::new(chunk_kv, chunk_ttl),
        MetadataStore::new(metadata_kv),
    ))
}
