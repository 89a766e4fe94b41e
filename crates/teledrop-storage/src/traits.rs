//! Key-value store abstraction trait
//!
//! This module defines the KvStore trait that every namespace backend must implement.
//! The contract mirrors an edge key-value service: values with optional JSON metadata,
//! optional expiry, and cursor-paginated listing in key order.

use crate::KvBackend;
use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value as JsonValue;
use std::time::Duration;
use thiserror::Error;

/// Largest page a single `list` call returns.
pub const MAX_LIST_LIMIT: usize = 1000;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for teledrop_core::AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::InvalidKey(msg) => teledrop_core::AppError::InvalidInput(msg),
            other => teledrop_core::AppError::Storage(other.to_string()),
        }
    }
}

/// Options for a single write
#[derive(Debug, Clone, Default)]
pub struct PutOptions {
    /// Small JSON document stored alongside the value.
    pub metadata: Option<JsonValue>,
    /// The entry reads as absent once this much time has passed.
    pub expiration_ttl: Option<Duration>,
}

impl PutOptions {
    pub fn with_metadata(mut self, metadata: JsonValue) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.expiration_ttl = Some(ttl);
        self
    }
}

/// A stored value with its metadata
#[derive(Debug, Clone)]
pub struct KvEntry {
    pub value: Bytes,
    pub metadata: Option<JsonValue>,
}

#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    pub prefix: Option<String>,
    /// Opaque cursor from a previous page.
    pub cursor: Option<String>,
    /// Page size; 0 means the maximum.
    pub limit: usize,
}

impl ListOptions {
    pub fn effective_limit(&self) -> usize {
        if self.limit == 0 {
            MAX_LIST_LIMIT
        } else {
            self.limit.min(MAX_LIST_LIMIT)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct KeyInfo {
    pub name: String,
    /// Expiry as unix seconds, truncated from the millisecond expiry the backends keep.
    pub expiration: Option<i64>,
    pub metadata: Option<JsonValue>,
}

#[derive(Debug, Clone, Default)]
pub struct ListPage {
    pub keys: Vec<KeyInfo>,
    /// Present when more keys remain.
    pub cursor: Option<String>,
    pub list_complete: bool,
}

/// Key-value namespace abstraction
///
/// Both the chunk store and the metadata store are instances of this trait, so
/// the pipeline can run against memory in tests and the filesystem in deployments.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Read a value, `None` when absent or expired
    async fn get(&self, key: &str) -> StorageResult<Option<Bytes>> {
        Ok(self.get_with_metadata(key).await?.map(|entry| entry.value))
    }

    /// Read a value together with its metadata
    async fn get_with_metadata(&self, key: &str) -> StorageResult<Option<KvEntry>>;

    /// Create or overwrite a value
    async fn put(&self, key: &str, value: Bytes, options: PutOptions) -> StorageResult<()>;

    /// Delete a value. Deleting an absent key succeeds.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// List keys in lexicographic order
    async fn list(&self, options: ListOptions) -> StorageResult<ListPage>;

    /// Physically remove expired entries, returning how many were removed
    async fn purge_expired(&self) -> StorageResult<usize>;

    /// Get the backend type
    fn backend_type(&self) -> KvBackend;
}

/// Unix milliseconds at which an entry written now with `ttl` expires.
pub(crate) fn expiry_from_ttl(ttl: Option<Duration>) -> Option<i64> {
    ttl.map(|ttl| {
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        chrono::Utc::now().timestamp_millis().saturating_add(ttl_ms)
    })
}

pub(crate) fn is_expired(expires_at_ms: Option<i64>, now_ms: i64) -> bool {
    matches!(expires_at_ms, Some(at) if at <= now_ms)
}

pub(crate) fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey("Key must not be empty".to_string()));
    }
    if key == "." || key == ".." {
        return Err(StorageError::InvalidKey(
            "Key contains invalid characters".to_string(),
        ));
    }
    Ok(())
}
