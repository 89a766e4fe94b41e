use crate::{KvBackend, KvStore, LocalKvStore, MemoryKvStore, StorageError, StorageResult};
use std::sync::Arc;
use teledrop_core::Config;

/// The two namespaces the relay binds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    Chunks,
    Metadata,
}

impl Namespace {
    pub fn as_str(&self) -> &'static str {
        match self {
            Namespace::Chunks => "chunks",
            Namespace::Metadata => "metadata",
        }
    }
}

/// Create a key-value backend for one namespace based on configuration
pub async fn create_kv_store(
    config: &Config,
    namespace: Namespace,
) -> StorageResult<Arc<dyn KvStore>> {
    match config.kv_backend() {
        KvBackend::Memory => Ok(Arc::new(MemoryKvStore::new())),

        KvBackend::Local => {
            let (path, var) = match namespace {
                Namespace::Chunks => (config.chunk_store_path(), "CHUNK_STORE_PATH"),
                Namespace::Metadata => (config.metadata_store_path(), "METADATA_STORE_PATH"),
            };
            let base_path = path
                .map(String::from)
                .ok_or_else(|| StorageError::ConfigError(format!("{} not configured", var)))?;

            let store = LocalKvStore::new(base_path).await?;
            Ok(Arc::new(store))
        }
    }
}
