//! Teledrop Storage Library
//!
//! This crate provides the key-value namespace abstraction used for upload chunks and
//! file metadata, with in-memory and local filesystem backends.
//!
//! # Key format
//!
//! - **Chunk namespace**: `{uploadId}_chunk_{index}`
//! - **Metadata namespace**: `{remoteFileId}.{ext}`, the same string used in the public
//!   retrieval URL
//!
//! Key generation for chunks is centralized in the `keys` module.

pub mod chunks;
pub mod drain;
pub mod factory;
pub(crate) mod keys;
pub mod local;
pub mod memory;
pub mod metadata;
pub mod traits;

// Re-export commonly used types
pub use chunks::ChunkStore;
pub use drain::drain;
pub use factory::{create_kv_store, Namespace};
pub use local::LocalKvStore;
pub use memory::MemoryKvStore;
pub use metadata::MetadataStore;
pub use teledrop_core::KvBackend;
pub use traits::{
    KeyInfo, KvEntry, KvStore, ListOptions, ListPage, PutOptions, StorageError, StorageResult,
    MAX_LIST_LIMIT,
};
