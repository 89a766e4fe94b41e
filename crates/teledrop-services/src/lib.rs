//! Teledrop Services Layer
//!
//! This crate is the **upload pipeline**: it hosts the Telegram Bot API client, the retry
//! policy, chunk reassembly, classification-driven dispatch and the retrieval gateway, and
//! re-exports the storage types the API crate needs so that handlers depend on a single
//! service facade. Keep upstream coordination here; keep thin HTTP handling in teledrop-api.

pub mod assemble;
pub mod dispatch;
pub mod gateway;
pub mod sweeper;
pub mod telegram;
pub mod upload;
pub mod upstream;

#[cfg(test)]
pub(crate) mod test_support;

pub use assemble::{Assembler, UploadGuard, UploadLocks};
pub use dispatch::Dispatcher;
pub use gateway::{FileDownload, FileGateway, ResolvedFile};
pub use sweeper::ChunkSweeper;
pub use telegram::{RetryPolicy, TelegramClient, UpstreamError};
pub use teledrop_storage::{
    create_kv_store, drain, ChunkStore, KvStore, MetadataStore, Namespace, StorageError,
    StorageResult,
};
pub use upload::UploadService;
pub use upstream::Upstream;
