//! Chunk reassembly

use bytes::BytesMut;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use teledrop_core::{AppError, FinalizeUpload, IncomingFile};
use teledrop_storage::ChunkStore;

/// In-process single-writer registry keyed by upload id
#[derive(Clone, Default)]
pub struct UploadLocks {
    active: Arc<Mutex<HashSet<String>>>,
}

impl UploadLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `upload_id`. `None` when another finalize already holds it.
    pub fn try_acquire(&self, upload_id: &str) -> Option<UploadGuard> {
        let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        if !active.insert(upload_id.to_string()) {
            return None;
        }
        Some(UploadGuard {
            locks: self.active.clone(),
            upload_id: upload_id.to_string(),
        })
    }

    pub fn is_locked(&self, upload_id: &str) -> bool {
        self.active
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(upload_id)
    }
}

/// Releases the upload id when dropped
pub struct UploadGuard {
    locks: Arc<Mutex<HashSet<String>>>,
    upload_id: String,
}

impl Drop for UploadGuard {
    fn drop(&mut self) {
        self.locks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.upload_id);
    }
}

#[derive(Clone)]
pub struct Assembler {
    chunks: ChunkStore,
}

impl Assembler {
    pub fn new(chunks: ChunkStore) -> Self {
        Self { chunks }
    }

    /// Concatenate chunks `0..total_chunks` in index order.
    ///
    /// Any absent index fails the whole assembly; nothing is deleted here.
    #[tracing::instrument(skip(self, request), fields(operation = "assemble", upload_id = %request.upload_id))]
    pub async fn assemble(&self, request: &FinalizeUpload) -> Result<IncomingFile, AppError> {
        let capacity = usize::try_from(request.file_size).unwrap_or(0);
        let mut buffer = BytesMut::with_capacity(capacity);

        for index in 0..request.total_chunks {
            let chunk = self
                .chunks
                .get_chunk(&request.upload_id, index)
                .await?
                .ok_or_else(|| AppError::MissingChunk {
                    upload_id: request.upload_id.clone(),
                    index,
                })?;
            buffer.extend_from_slice(&chunk);
        }

        if buffer.len() as u64 != request.file_size {
            return Err(AppError::InvalidInput(format!(
                "Assembled size {} does not match declared size {}",
                buffer.len(),
                request.file_size
            )));
        }

        tracing::debug!(
            total_chunks = request.total_chunks,
            size_bytes = buffer.len(),
            "Chunks assembled"
        );

        Ok(IncomingFile::new(
            request.file_name.clone(),
            request.mime_type.as_deref(),
            buffer.freeze(),
        ))
    }
}
