//! Transient chunk namespace

use crate::keys::{chunk_key, chunk_prefix};
use crate::traits::{KvStore, ListOptions, PutOptions, StorageResult};
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;

/// Typed access to the chunk namespace
///
/// Chunks are written with a TTL so abandoned sessions disappear even when no
/// finalize ever arrives.
#[derive(Clone)]
pub struct ChunkStore {
    store: Arc<dyn KvStore>,
    ttl: Option<Duration>,
}

impl ChunkStore {
    pub fn new(store: Arc<dyn KvStore>, ttl: Option<Duration>) -> Self {
        Self { store, ttl }
    }

    pub fn inner(&self) -> &Arc<dyn KvStore> {
        &self.store
    }

    pub async fn put_chunk(&self, upload_id: &str, index: u32, data: Bytes) -> StorageResult<()> {
        let mut options = PutOptions::default();
        if let Some(ttl) = self.ttl {
            options = options.with_ttl(ttl);
        }
        self.store.put(&chunk_key(upload_id, index), data, options).await
    }

    pub async fn get_chunk(&self, upload_id: &str, index: u32) -> StorageResult<Option<Bytes>> {
        self.store.get(&chunk_key(upload_id, index)).await
    }

    /// Delete every chunk stored for a session. Failures are logged and counted, never returned.
    ///
    /// Works from the keys actually present, so the work is bounded by what was written and
    /// not by the client's declared chunk count.
    pub async fn delete_session(&self, upload_id: &str) -> usize {
        let keys = match self.session_keys(upload_id).await {
            Ok(keys) => keys,
            Err(e) => {
                tracing::warn!(upload_id = %upload_id, error = %e, "Failed to list chunks for deletion");
                return 1;
            }
        };

        let mut failures = 0;
        for key in keys {
            if let Err(e) = self.store.delete(&key).await {
                failures += 1;
                tracing::warn!(
                    upload_id = %upload_id,
                    key = %key,
                    error = %e,
                    "Failed to delete chunk"
                );
            }
        }
        failures
    }

    /// Chunk keys of one session, skipping ids that merely share the prefix
    /// (`a_chunk_1_chunk_0` belongs to upload `a_chunk_1`, not `a`).
    async fn session_keys(&self, upload_id: &str) -> StorageResult<Vec<String>> {
        let prefix = chunk_prefix(upload_id);
        let mut keys = Vec::new();
        let mut cursor = None;
        loop {
            let page = self
                .store
                .list(ListOptions {
                    prefix: Some(prefix.clone()),
                    cursor,
                    limit: 0,
                })
                .await?;
            keys.extend(
                page.keys
                    .into_iter()
                    .map(|k| k.name)
                    .filter(|name| is_chunk_of(name, &prefix)),
            );
            if page.list_complete {
                return Ok(keys);
            }
            cursor = page.cursor;
        }
    }

    /// Number of chunks currently stored for a session
    pub async fn count_chunks(&self, upload_id: &str) -> StorageResult<usize> {
        Ok(self.session_keys(upload_id).await?.len())
    }

    pub async fn purge_expired(&self) -> StorageResult<usize> {
        self.store.purge_expired().await
    }
}

fn is_chunk_of(name: &str, prefix: &str) -> bool {
    name.strip_prefix(prefix)
        .is_some_and(|index| !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit()))
}
