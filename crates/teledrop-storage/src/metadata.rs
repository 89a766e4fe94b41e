//! Durable file metadata namespace

use crate::traits::{KvStore, ListOptions, ListPage, PutOptions, StorageError, StorageResult};
use bytes::Bytes;
use std::sync::Arc;
use teledrop_core::{FileKey, FileMetadataRecord};

/// Typed access to the metadata namespace
///
/// Values are the JSON-encoded [`FileMetadataRecord`]; the side-channel metadata
/// carries the write time as `{"TimeStamp": <unix ms>}`.
#[derive(Clone)]
pub struct MetadataStore {
    store: Arc<dyn KvStore>,
}

impl MetadataStore {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    pub fn inner(&self) -> &Arc<dyn KvStore> {
        &self.store
    }

    pub async fn put_record(&self, key: &FileKey, record: &FileMetadataRecord) -> StorageResult<()> {
        let value =
            serde_json::to_vec(record).map_err(|e| StorageError::Serialization(e.to_string()))?;
        let options = PutOptions::default().with_metadata(serde_json::json!({
            "TimeStamp": chrono::Utc::now().timestamp_millis(),
        }));
        self.store
            .put(&key.storage_key(), Bytes::from(value), options)
            .await
    }

    pub async fn get_record(&self, key: &FileKey) -> StorageResult<Option<FileMetadataRecord>> {
        let Some(raw) = self.store.get(&key.storage_key()).await? else {
            return Ok(None);
        };
        serde_json::from_slice(&raw).map(Some).map_err(|e| {
            StorageError::Serialization(format!("Corrupt metadata record {}: {}", key, e))
        })
    }

    /// Remove one record, reporting whether it existed
    pub async fn delete_record(&self, key: &FileKey) -> StorageResult<bool> {
        let storage_key = key.storage_key();
        let existed = self.store.get(&storage_key).await?.is_some();
        if existed {
            self.store.delete(&storage_key).await?;
        }
        Ok(existed)
    }

    pub async fn list(&self, cursor: Option<String>, limit: usize) -> StorageResult<ListPage> {
        self.store
            .list(ListOptions {
                prefix: None,
                cursor,
                limit,
            })
            .await
    }
}
