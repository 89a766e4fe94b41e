//! Teledrop Core Library
//!
//! This crate provides core domain models, error types, configuration and the
//! upload classifier shared across all teledrop components.

pub mod classify;
pub mod config;
pub mod constants;
pub mod error;
pub mod mime;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use classify::{classify, classify_file, ensure_within_limit};
pub use config::{BaseConfig, Config, RelayConfig};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use models::{
    ChunkAck, ChunkUpload, ClassifiedFile, FileKey, FileListEntry, FileListResponse,
    FileMetadataRecord, FinalizeUpload, IncomingFile, MediaKind, RemoteObjectRef, UploadResponse,
};
pub use storage_types::KvBackend;
// Note: KvStore, StorageError, StorageResult live in the teledrop-storage crate
