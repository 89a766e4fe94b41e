//! Application setup and initialization
//!
//! This module contains all application initialization logic extracted from main.rs
//! for better organization and testability.

pub mod routes;
pub mod server;
pub mod services;
pub mod storage;

use crate::state::AppState;
use anyhow::{Context, Result};
use std::sync::Arc;
use teledrop_core::Config;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    // Initialize telemetry first so configuration errors are logged
    crate::telemetry::init_telemetry(config.environment())
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    config.validate().context("Configuration validation failed")?;
    tracing::info!(config = ?config, "Configuration loaded and validated successfully");

    let (chunks, metadata) = storage::setup_storage(&config).await?;

    let state = services::initialize_services(&config, chunks, metadata).await?;

    let router = routes::setup_routes(&config, state.clone()).await?;

    Ok((state, router))
}
