//! Application state shared by all handlers.

use std::sync::Arc;
use teledrop_core::Config;
use teledrop_services::{ChunkStore, ChunkSweeper, FileGateway, MetadataStore, UploadService};

/// Hotlink and credential settings read from configuration
#[derive(Clone, Debug, Default)]
pub struct SecurityConfig {
    /// Extra origins allowed to embed retrieval URLs
    pub allowed_origins: Vec<String>,
    /// Reject retrievals that carry no Referer at all
    pub expect_referer: bool,
    /// Canonical site origin; derived from request headers when unset
    pub public_origin: Option<String>,
    pub auth_token: Option<String>,
}

impl SecurityConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            allowed_origins: config.allowed_origins().to_vec(),
            expect_referer: config.expect_referer(),
            public_origin: config.public_origin().map(String::from),
            auth_token: config.auth_token().map(String::from),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub security: SecurityConfig,
    pub uploads: UploadService,
    pub gateway: FileGateway,
    pub chunks: ChunkStore,
    pub metadata: MetadataStore,
    pub sweeper: Option<Arc<ChunkSweeper>>,
}
