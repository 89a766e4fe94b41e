//! Shared key generation for the chunk namespace.
//!
//! Key format: `{uploadId}_chunk_{index}`. The upload id is whatever the client sent,
//! so every chunk of one session shares the `{uploadId}_chunk_` prefix.

/// Storage key of one chunk
pub fn chunk_key(upload_id: &str, index: u32) -> String {
    format!("{}_chunk_{}", upload_id, index)
}

/// Prefix shared by every chunk of one upload session
pub fn chunk_prefix(upload_id: &str) -> String {
    format!("{}_chunk_", upload_id)
}
