use async_trait::async_trait;
use http::HeaderMap;
use teledrop_core::{ClassifiedFile, IncomingFile, MediaKind};

use crate::telegram::{Message, UpstreamError};

/// Blob-store operations the relay needs from the upstream platform
#[async_trait]
pub trait Upstream: Send + Sync {
    /// Send one file through the endpoint matching `kind`
    async fn send_single(
        &self,
        kind: MediaKind,
        file: &IncomingFile,
    ) -> Result<Message, UpstreamError>;

    /// Send up to one batch of photos and videos as a single album. Messages come back in
    /// input order.
    async fn send_media_group(
        &self,
        items: &[ClassifiedFile],
    ) -> Result<Vec<Message>, UpstreamError>;

    /// Resolve a remote file id to its download path. `None` when the upstream has no path
    /// for it.
    async fn resolve_file_path(&self, file_id: &str) -> Result<Option<String>, UpstreamError>;

    /// Start downloading a resolved path, forwarding the given request headers
    async fn fetch_file(
        &self,
        file_path: &str,
        headers: HeaderMap,
    ) -> Result<reqwest::Response, UpstreamError>;
}
