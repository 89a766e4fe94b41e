use crate::traits::{
    expiry_from_ttl, is_expired, validate_key, KeyInfo, KvEntry, KvStore, ListOptions, ListPage,
    PutOptions, StorageError, StorageResult,
};
use crate::KvBackend;
use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

const VALUE_SUFFIX: &str = ".val";
const META_SUFFIX: &str = ".meta.json";
const TMP_SUFFIX: &str = ".tmp";
/// Leaves room for the suffixes within common 255-byte file name limits.
const MAX_ENCODED_KEY_LEN: usize = 230;
/// Marks a file name derived from a key digest. Percent-encoding always escapes `@`,
/// so no encoded key starts with it.
const DIGEST_PREFIX: char = '@';

/// Sidecar written next to every value
#[derive(Debug, Default, Serialize, Deserialize)]
struct Envelope {
    /// Original key, needed to list entries stored under a digest name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    metadata: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expires_at_ms: Option<i64>,
}

/// Local filesystem key-value namespace
///
/// Each key is percent-encoded into a flat file name under `base_path`, with its
/// metadata and expiry in a JSON sidecar.
#[derive(Clone)]
pub struct LocalKvStore {
    base_path: PathBuf,
}

impl LocalKvStore {
    /// Create a new LocalKvStore instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory of the namespace (e.g., "/var/lib/teledrop/chunks")
    pub async fn new(base_path: impl Into<PathBuf>) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalKvStore { base_path })
    }

    /// File name stem for a key: its percent-encoding, or a SHA-256 digest when the
    /// encoding would not fit in a file name (long non-ASCII upload ids).
    fn file_stem(key: &str) -> StorageResult<String> {
        validate_key(key)?;
        let encoded = urlencoding::encode(key);
        if encoded.len() <= MAX_ENCODED_KEY_LEN {
            return Ok(encoded.into_owned());
        }
        let digest = Sha256::digest(key.as_bytes());
        Ok(format!("{}{}", DIGEST_PREFIX, hex::encode(digest)))
    }

    /// Convert a key to its value and sidecar paths
    ///
    /// Encoding removes path separators, so every key maps to a direct child of
    /// the base directory.
    fn key_to_paths(&self, key: &str) -> StorageResult<(PathBuf, PathBuf)> {
        let stem = Self::file_stem(key)?;
        Ok((
            self.base_path.join(format!("{}{}", stem, VALUE_SUFFIX)),
            self.base_path.join(format!("{}{}", stem, META_SUFFIX)),
        ))
    }

    async fn read_envelope(path: &Path) -> StorageResult<Envelope> {
        match fs::read(path).await {
            Ok(raw) => serde_json::from_slice(&raw).map_err(|e| {
                StorageError::Serialization(format!(
                    "Corrupt sidecar {}: {}",
                    path.display(),
                    e
                ))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Envelope::default()),
            Err(e) => Err(StorageError::ReadFailed(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    /// Write through a temporary file and rename, so readers never see a partial value
    async fn write_atomic(path: &Path, data: &[u8]) -> StorageResult<()> {
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(TMP_SUFFIX);
        let tmp = PathBuf::from(tmp);

        let mut file = fs::File::create(&tmp).await.map_err(|e| {
            StorageError::WriteFailed(format!("Failed to create file {}: {}", tmp.display(), e))
        })?;
        file.write_all(data).await.map_err(|e| {
            StorageError::WriteFailed(format!("Failed to write file {}: {}", tmp.display(), e))
        })?;
        file.sync_all().await.map_err(|e| {
            StorageError::WriteFailed(format!("Failed to sync file {}: {}", tmp.display(), e))
        })?;
        fs::rename(&tmp, path).await.map_err(|e| {
            StorageError::WriteFailed(format!("Failed to move file {}: {}", path.display(), e))
        })?;
        Ok(())
    }

    async fn remove_if_exists(path: &Path) -> StorageResult<()> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::DeleteFailed(format!(
                "Failed to delete file {}: {}",
                path.display(),
                e
            ))),
        }
    }

    /// All stored keys in lexicographic order
    async fn stored_keys(&self) -> StorageResult<Vec<String>> {
        let mut dir = fs::read_dir(&self.base_path).await?;
        let mut keys = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            let Some(encoded) = name.strip_suffix(VALUE_SUFFIX) else {
                continue;
            };
            if encoded.starts_with(DIGEST_PREFIX) {
                let meta_path = self.base_path.join(format!("{}{}", encoded, META_SUFFIX));
                match Self::read_envelope(&meta_path).await {
                    Ok(Envelope { key: Some(key), .. }) => keys.push(key),
                    Ok(_) => {
                        tracing::warn!(file = %name, "Skipping digest entry without a stored key");
                    }
                    Err(e) => {
                        tracing::warn!(file = %name, error = %e, "Skipping unreadable digest entry");
                    }
                }
                continue;
            }
            match urlencoding::decode(encoded) {
                Ok(key) => keys.push(key.into_owned()),
                Err(e) => {
                    tracing::warn!(file = %name, error = %e, "Skipping undecodable file in local store");
                }
            }
        }
        keys.sort();
        Ok(keys)
    }
}

#[async_trait]
impl KvStore for LocalKvStore {
    async fn get_with_metadata(&self, key: &str) -> StorageResult<Option<KvEntry>> {
        let (value_path, meta_path) = self.key_to_paths(key)?;

        let value = match fs::read(&value_path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(StorageError::ReadFailed(format!(
                    "Failed to read file {}: {}",
                    value_path.display(),
                    e
                )))
            }
        };

        let envelope = Self::read_envelope(&meta_path).await?;
        if is_expired(envelope.expires_at_ms, chrono::Utc::now().timestamp_millis()) {
            return Ok(None);
        }

        Ok(Some(KvEntry {
            value: Bytes::from(value),
            metadata: envelope.metadata,
        }))
    }

    async fn put(&self, key: &str, value: Bytes, options: PutOptions) -> StorageResult<()> {
        let (value_path, meta_path) = self.key_to_paths(key)?;
        let start = std::time::Instant::now();

        let envelope = Envelope {
            key: Some(key.to_string()),
            metadata: options.metadata,
            expires_at_ms: expiry_from_ttl(options.expiration_ttl),
        };
        let envelope_json = serde_json::to_vec(&envelope)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        Self::write_atomic(&meta_path, &envelope_json).await?;
        Self::write_atomic(&value_path, &value).await?;

        tracing::debug!(
            path = %value_path.display(),
            key = %key,
            size_bytes = value.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local store put successful"
        );

        Ok(())
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let (value_path, meta_path) = self.key_to_paths(key)?;
        Self::remove_if_exists(&value_path).await?;
        Self::remove_if_exists(&meta_path).await?;

        tracing::debug!(key = %key, "Local store delete successful");
        Ok(())
    }

    async fn list(&self, options: ListOptions) -> StorageResult<ListPage> {
        let limit = options.effective_limit();
        let now = chrono::Utc::now().timestamp_millis();

        let mut keys = Vec::new();
        let mut has_more = false;
        for name in self.stored_keys().await? {
            if let Some(cursor) = options.cursor.as_deref() {
                if name.as_str() <= cursor {
                    continue;
                }
            }
            if let Some(prefix) = options.prefix.as_deref() {
                if !name.starts_with(prefix) {
                    continue;
                }
            }
            let (_, meta_path) = self.key_to_paths(&name)?;
            let envelope = Self::read_envelope(&meta_path).await?;
            if is_expired(envelope.expires_at_ms, now) {
                continue;
            }
            if keys.len() == limit {
                has_more = true;
                break;
            }
            keys.push(KeyInfo {
                name,
                expiration: envelope.expires_at_ms.map(|ms| ms / 1000),
                metadata: envelope.metadata,
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
        let mut removed = 0;
        for name in self.stored_keys().await? {
            let (_, meta_path) = self.key_to_paths(&name)?;
            let envelope = match Self::read_envelope(&meta_path).await {
                Ok(envelope) => envelope,
                Err(e) => {
                    tracing::warn!(key = %name, error = %e, "Skipping entry during purge");
                    continue;
                }
            };
            if is_expired(envelope.expires_at_ms, now) {
                self.delete(&name).await?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    fn backend_type(&self) -> KvBackend {
        KvBackend::Local
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_local_store_put_get() {
        let dir = tempdir().unwrap();
        let store = LocalKvStore::new(dir.path()).await.unwrap();

        store
            .put(
                "holiday.jpg-1024-1700000000000_chunk_0",
                Bytes::from_static(b"test data"),
                PutOptions::default(),
            )
            .await
            .unwrap();

        let value = store
            .get("holiday.jpg-1024-1700000000000_chunk_0")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(value, Bytes::from_static(b"test data"));
    }

    #[tokio::test]
    async fn test_keys_with_separators_stay_inside_base() {
        let dir = tempdir().unwrap();
        let store = LocalKvStore::new(dir.path()).await.unwrap();

        store
            .put("../../etc/passwd", Bytes::from_static(b"x"), PutOptions::default())
            .await
            .unwrap();

        // One value file and one sidecar, both directly under the base directory
        let mut entries = std::fs::read_dir(dir.path()).unwrap();
        assert!(entries.all(|e| e.unwrap().path().parent() == Some(dir.path())));
        assert!(store.get("../../etc/passwd").await.unwrap().is_some());

        let keys = store.list(ListOptions::default()).await.unwrap();
        assert_eq!(keys.keys[0].name, "../../etc/passwd");
    }

    #[tokio::test]
    async fn test_long_non_ascii_keys_use_digest_names() {
        let dir = tempdir().unwrap();
        let store = LocalKvStore::new(dir.path()).await.unwrap();
        let upload_id = "二零二四年度家庭旅行照片合集北京上海广州深圳.jpg-4194304-1700000000000";
        let chunks = crate::ChunkStore::new(std::sync::Arc::new(store.clone()), None);

        chunks
            .put_chunk(upload_id, 0, Bytes::from_static(b"first"))
            .await
            .unwrap();
        chunks
            .put_chunk(upload_id, 1, Bytes::from_static(b"second"))
            .await
            .unwrap();

        assert_eq!(
            chunks.get_chunk(upload_id, 1).await.unwrap(),
            Some(Bytes::from_static(b"second"))
        );
        for entry in std::fs::read_dir(dir.path()).unwrap() {
            let name = entry.unwrap().file_name();
            assert!(name.len() < 255);
        }

        // Listing recovers the original key from the sidecar.
        let page = store.list(ListOptions::default()).await.unwrap();
        assert_eq!(page.keys[0].name, format!("{}_chunk_0", upload_id));
        assert_eq!(chunks.count_chunks(upload_id).await.unwrap(), 2);

        assert_eq!(chunks.delete_session(upload_id).await, 0);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_dot_keys_rejected() {
        let dir = tempdir().unwrap();
        let store = LocalKvStore::new(dir.path()).await.unwrap();

        let result = store.get("..").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));
        let result = store.delete("").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));
    }

    #[tokio::test]
    async fn test_local_store_delete_nonexistent() {
        let dir = tempdir().unwrap();
        let store = LocalKvStore::new(dir.path()).await.unwrap();

        assert!(store.delete("nonexistent.txt").await.is_ok());
    }

    #[tokio::test]
    async fn test_metadata_and_expiry() {
        let dir = tempdir().unwrap();
        let store = LocalKvStore::new(dir.path()).await.unwrap();

        store
            .put(
                "AgAD.jpg",
                Bytes::from_static(br#"{"mime":"image/jpeg"}"#),
                PutOptions::default().with_metadata(serde_json::json!({"TimeStamp": 42})),
            )
            .await
            .unwrap();
        store
            .put(
                "stale_chunk_0",
                Bytes::from_static(b"x"),
                PutOptions::default().with_ttl(Duration::from_millis(1)),
            )
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(20)).await;

        let entry = store.get_with_metadata("AgAD.jpg").await.unwrap().unwrap();
        assert_eq!(entry.metadata.unwrap()["TimeStamp"], 42);
        assert!(store.get("stale_chunk_0").await.unwrap().is_none());

        let page = store.list(ListOptions::default()).await.unwrap();
        assert_eq!(page.keys.len(), 1);

        assert_eq!(store.purge_expired().await.unwrap(), 1);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[tokio::test]
    async fn test_list_pagination() {
        let dir = tempdir().unwrap();
        let store = LocalKvStore::new(dir.path()).await.unwrap();
        for i in 0..5 {
            store
                .put(&format!("key-{}", i), Bytes::from_static(b"v"), PutOptions::default())
                .await
                .unwrap();
        }

        let first = store
            .list(ListOptions {
                limit: 3,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(first.keys.len(), 3);
        assert_eq!(first.cursor.as_deref(), Some("key-2"));

        let rest = store
            .list(ListOptions {
                cursor: first.cursor,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(rest.keys.len(), 2);
        assert!(rest.list_complete);
    }
}
