//! Upload orchestration: chunk intake, finalize and the legacy multipart path

use bytes::Bytes;
use std::time::Instant;
use teledrop_core::{
    classify_file, ensure_within_limit, AppError, ChunkAck, ChunkUpload, FinalizeUpload,
    IncomingFile, UploadResponse,
};
use teledrop_storage::ChunkStore;

use crate::assemble::{Assembler, UploadLocks};
use crate::dispatch::Dispatcher;

#[derive(Clone)]
pub struct UploadService {
    chunks: ChunkStore,
    assembler: Assembler,
    dispatcher: Dispatcher,
    locks: UploadLocks,
    max_upload_size_bytes: u64,
}

impl UploadService {
    pub fn new(chunks: ChunkStore, dispatcher: Dispatcher, max_upload_size_bytes: u64) -> Self {
        Self {
            assembler: Assembler::new(chunks.clone()),
            chunks,
            dispatcher,
            locks: UploadLocks::new(),
            max_upload_size_bytes,
        }
    }

    /// Store one chunk. Re-sending an index overwrites it.
    #[tracing::instrument(
        skip(self, chunk, data),
        fields(operation = "store_chunk", upload_id = %chunk.upload_id, chunk_index = chunk.chunk_index)
    )]
    pub async fn store_chunk(&self, chunk: &ChunkUpload, data: Bytes) -> Result<ChunkAck, AppError> {
        chunk.validate()?;
        if data.is_empty() {
            return Err(AppError::InvalidInput("Chunk body is empty".to_string()));
        }

        self.chunks
            .put_chunk(&chunk.upload_id, chunk.chunk_index, data)
            .await?;

        tracing::debug!(total_chunks = chunk.total_chunks, "Chunk stored");
        Ok(ChunkAck::new(chunk.chunk_index, chunk.total_chunks))
    }

    /// Assemble, classify and dispatch a chunked upload.
    ///
    /// Chunks are deleted once dispatch produced a result, or when the file can never be
    /// accepted because it exceeds the size ceiling. Other failures keep them so the client
    /// can re-send missing pieces and finalize again.
    #[tracing::instrument(skip(self, request), fields(operation = "finalize", upload_id = %request.upload_id))]
    pub async fn finalize(&self, request: FinalizeUpload) -> Result<UploadResponse, AppError> {
        request.validate()?;
        let start = Instant::now();

        let _guard = self.locks.try_acquire(&request.upload_id).ok_or_else(|| {
            AppError::Conflict(format!(
                "Upload {} is already being finalized",
                request.upload_id
            ))
        })?;

        if let Err(e) = ensure_within_limit(request.file_size, self.max_upload_size_bytes) {
            self.discard_chunks(&request).await;
            return Err(e);
        }

        let file = self.assembler.assemble(&request).await?;
        let classified = classify_file(file);

        tracing::info!(
            kind = classified.kind.as_str(),
            size_bytes = classified.file.size(),
            mime = %classified.file.mime,
            "Dispatching assembled file"
        );

        let urls = self.dispatcher.dispatch(vec![classified]).await?;
        self.discard_chunks(&request).await;

        tracing::info!(
            duration_ms = start.elapsed().as_millis() as u64,
            "Upload finalized"
        );
        Ok(UploadResponse { urls })
    }

    /// Classify and dispatch files received whole in one request
    #[tracing::instrument(skip(self, files), fields(operation = "upload_files", files = files.len()))]
    pub async fn upload_files(&self, files: Vec<IncomingFile>) -> Result<UploadResponse, AppError> {
        if files.is_empty() {
            return Err(AppError::InvalidInput("No files uploaded".to_string()));
        }
        for file in &files {
            ensure_within_limit(file.size(), self.max_upload_size_bytes)?;
        }

        let items = files.into_iter().map(classify_file).collect();
        let urls = self.dispatcher.dispatch(items).await?;
        Ok(UploadResponse { urls })
    }

    async fn discard_chunks(&self, request: &FinalizeUpload) {
        let failures = self.chunks.delete_session(&request.upload_id).await;
        if failures > 0 {
            tracing::warn!(failures, "Some chunks could not be deleted");
        }
    }
}
