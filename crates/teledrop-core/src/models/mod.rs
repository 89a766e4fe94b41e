//! Data models for the relay
//!
//! Organized by domain: upload protocol messages, media items moving through the
//! pipeline, and the public file keys that address stored blobs.

mod file_key;
mod media;
mod metadata;
mod upload;

// Re-export all models for convenient imports
pub use file_key::FileKey;
pub use media::{ClassifiedFile, IncomingFile, MediaKind, RemoteObjectRef};
pub use metadata::{FileListEntry, FileListResponse, FileMetadataRecord};
pub use upload::{ChunkAck, ChunkUpload, FinalizeUpload, UploadResponse};
