use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;

/// One chunk write as declared by the client headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkUpload {
    pub upload_id: String,
    pub file_name: String,
    pub file_size: u64,
    pub chunk_index: u32,
    pub total_chunks: u32,
}

impl ChunkUpload {
    pub fn validate(&self) -> Result<(), AppError> {
        validate_session(
            &self.upload_id,
            &self.file_name,
            self.file_size,
            self.total_chunks,
        )?;
        if self.chunk_index >= self.total_chunks {
            return Err(AppError::InvalidInput(format!(
                "Chunk index {} out of range for {} chunks",
                self.chunk_index, self.total_chunks
            )));
        }
        Ok(())
    }
}

/// Finalize signal for a chunked upload session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalizeUpload {
    pub upload_id: String,
    pub file_name: String,
    pub file_size: u64,
    pub total_chunks: u32,
    pub mime_type: Option<String>,
}

impl FinalizeUpload {
    pub fn validate(&self) -> Result<(), AppError> {
        validate_session(
            &self.upload_id,
            &self.file_name,
            self.file_size,
            self.total_chunks,
        )
    }
}

fn validate_session(
    upload_id: &str,
    file_name: &str,
    file_size: u64,
    total_chunks: u32,
) -> Result<(), AppError> {
    if upload_id.trim().is_empty() {
        return Err(AppError::InvalidInput("Upload id must not be empty".to_string()));
    }
    if file_name.trim().is_empty() {
        return Err(AppError::InvalidInput("File name must not be empty".to_string()));
    }
    if total_chunks == 0 {
        return Err(AppError::InvalidInput(
            "Total chunks must be at least 1".to_string(),
        ));
    }
    // Every stored chunk holds at least one byte.
    if u64::from(total_chunks) > file_size {
        return Err(AppError::InvalidInput(format!(
            "Total chunks {} exceeds file size {}",
            total_chunks, file_size
        )));
    }
    Ok(())
}

/// Acknowledgement for a stored chunk
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChunkAck {
    pub message: String,
    pub chunk_index: u32,
    pub total_chunks: u32,
}

impl ChunkAck {
    pub fn new(chunk_index: u32, total_chunks: u32) -> Self {
        Self {
            message: format!("Chunk {}/{} uploaded", chunk_index + 1, total_chunks),
            chunk_index,
            total_chunks,
        }
    }
}

/// Public retrieval paths of every file stored by one request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UploadResponse {
    pub urls: Vec<String>,
}
