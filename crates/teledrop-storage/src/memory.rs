use crate::traits::{
    expiry_from_ttl, is_expired, validate_key, KeyInfo, KvEntry, KvStore, ListOptions, ListPage,
    PutOptions, StorageResult,
};
use crate::KvBackend;
use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct StoredEntry {
    value: Bytes,
    metadata: Option<JsonValue>,
    expires_at_ms: Option<i64>,
}

/// In-process key-value namespace. Contents are lost on restart.
#[derive(Clone, Default)]
pub struct MemoryKvStore {
    entries: Arc<RwLock<BTreeMap<String, StoredEntry>>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (unexpired) entries
    pub async fn len(&self) -> usize {
        let now = chrono::Utc::now().timestamp_millis();
        self.entries
            .read()
            .await
            .values()
            .filter(|e| !is_expired(e.expires_at_ms, now))
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get_with_metadata(&self, key: &str) -> StorageResult<Option<KvEntry>> {
        validate_key(key)?;
        let now = chrono::Utc::now().timestamp_millis();
        let entries = self.entries.read().await;
        Ok(entries
            .get(key)
            .filter(|e| !is_expired(e.expires_at_ms, now))
            .map(|e| KvEntry {
                value: e.value.clone(),
                metadata: e.metadata.clone(),
            }))
    }

    async fn put(&self, key: &str, value: Bytes, options: PutOptions) -> StorageResult<()> {
        validate_key(key)?;
        let size = value.len();
        let entry = StoredEntry {
            value,
            metadata: options.metadata,
            expires_at_ms: expiry_from_ttl(options.expiration_ttl),
        };
        self.entries.write().await.insert(key.to_string(), entry);

        tracing::debug!(key = %key, size_bytes = size, "Memory store put");
        Ok(())
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        validate_key(key)?;
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn list(&self, options: ListOptions) -> StorageResult<ListPage> {
        let limit = options.effective_limit();
        let now = chrono::Utc::now().timestamp_millis();
        let entries = self.entries.read().await;

        let lower = match options.cursor.as_deref() {
            Some(cursor) => Bound::Excluded(cursor.to_string()),
            None => Bound::Unbounded,
        };

        let mut keys = Vec::new();
        let mut has_more = false;
        for (name, entry) in entries.range((lower, Bound::Unbounded)) {
            if let Some(prefix) = options.prefix.as_deref() {
                if !name.starts_with(prefix) {
                    continue;
                }
            }
            if is_expired(entry.expires_at_ms, now) {
                continue;
            }
            if keys.len() == limit {
                has_more = true;
                break;
            }
            keys.push(KeyInfo {
                name: name.clone(),
                expiration: entry.expires_at_ms.map(|ms| ms / 1000),
                metadata: entry.metadata.clone(),
            });
        }

        let cursor = if has_more {
            keys.last().map(|k| k.name.clone())
        } else {
            None
        };

        Ok(ListPage {
            keys,
            cursor,
            list_complete: !has_more,
        })
    }

    async fn purge_expired(&self) -> StorageResult<usize> {
        let now = chrono::Utc::now().timestamp_millis();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, e| !is_expired(e.expires_at_ms, now));
        Ok(before - entries.len())
    }

    fn backend_type(&self) -> KvBackend {
        KvBackend::Memory
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StorageError;
    use std::time::Duration;

    #[tokio::test]
    async fn test_put_get_delete() {
        let store = MemoryKvStore::new();
        store
            .put("a", Bytes::from_static(b"hello"), PutOptions::default())
            .await
            .unwrap();

        assert_eq!(store.get("a").await.unwrap().unwrap(), Bytes::from_static(b"hello"));

        store.delete("a").await.unwrap();
        assert!(store.get("a").await.unwrap().is_none());
        // deleting again is fine
        store.delete("a").await.unwrap();
    }

    #[tokio::test]
    async fn test_metadata_round_trip() {
        let store = MemoryKvStore::new();
        let options = PutOptions::default().with_metadata(serde_json::json!({"TimeStamp": 1}));
        store.put("k", Bytes::from_static(b"v"), options).await.unwrap();

        let entry = store.get_with_metadata("k").await.unwrap().unwrap();
        assert_eq!(entry.metadata.unwrap()["TimeStamp"], 1);
    }

    #[tokio::test]
    async fn test_expired_entries_read_as_absent_and_purge() {
        let store = MemoryKvStore::new();
        store
            .put(
                "short",
                Bytes::from_static(b"x"),
                PutOptions::default().with_ttl(Duration::from_millis(1)),
            )
            .await
            .unwrap();
        store
            .put("long", Bytes::from_static(b"y"), PutOptions::default())
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(store.get("short").await.unwrap().is_none());
        assert_eq!(store.len().await, 1);
        assert_eq!(store.purge_expired().await.unwrap(), 1);
        assert!(store.get("long").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_list_paginates_in_key_order() {
        let store = MemoryKvStore::new();
        for name in ["c", "a", "e", "b", "d"] {
            store
                .put(name, Bytes::from_static(b"1"), PutOptions::default())
                .await
                .unwrap();
        }

        let first = store
            .list(ListOptions {
                limit: 2,
                ..Default::default()
            })
            .await
            .unwrap();
        let names: Vec<_> = first.keys.iter().map(|k| k.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert!(!first.list_complete);

        let second = store
            .list(ListOptions {
                limit: 3,
                cursor: first.cursor,
                ..Default::default()
            })
            .await
            .unwrap();
        let names: Vec<_> = second.keys.iter().map(|k| k.name.as_str()).collect();
        assert_eq!(names, vec!["c", "d", "e"]);
        assert!(second.list_complete);
        assert!(second.cursor.is_none());
    }

    #[tokio::test]
    async fn test_list_with_prefix() {
        let store = MemoryKvStore::new();
        for name in ["up1_chunk_0", "up1_chunk_1", "up2_chunk_0"] {
            store
                .put(name, Bytes::from_static(b"1"), PutOptions::default())
                .await
                .unwrap();
        }
        let page = store
            .list(ListOptions {
                prefix: Some("up1_".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.keys.len(), 2);
        assert!(page.list_complete);
    }

    #[tokio::test]
    async fn test_empty_key_rejected() {
        let store = MemoryKvStore::new();
        let result = store.put("", Bytes::new(), PutOptions::default()).await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));
    }
}
