//! Retrieval: public key to upstream download

use http::HeaderMap;
use std::sync::Arc;
use teledrop_core::constants::THUMBNAIL_CONTENT_TYPE;
use teledrop_core::mime::{extension_from_mime, mime_from_extension, DEFAULT_MIME};
use teledrop_core::{AppError, FileKey, FileMetadataRecord};
use teledrop_storage::MetadataStore;

use crate::upstream::Upstream;

/// What to fetch for a public key and how to label it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFile {
    /// Upstream id actually fetched (the thumbnail id when one was substituted)
    pub object_id: String,
    pub content_type: String,
    pub download_name: String,
    pub is_thumbnail: bool,
}

/// An open upstream download plus the headers to present it with
pub struct FileDownload {
    pub file: ResolvedFile,
    pub response: reqwest::Response,
}

#[derive(Clone)]
pub struct FileGateway {
    upstream: Arc<dyn Upstream>,
    metadata: MetadataStore,
}

impl FileGateway {
    pub fn new(upstream: Arc<dyn Upstream>, metadata: MetadataStore) -> Self {
        Self { upstream, metadata }
    }

    /// Decide the upstream object and presentation for `key`.
    pub async fn resolve(&self, key: &FileKey, want_thumbnail: bool) -> ResolvedFile {
        let record = match self.metadata.get_record(key).await {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(file_id = %key.file_id, error = %e, "Metadata lookup failed, serving without it");
                None
            }
        };
        resolve_with_record(key, record.as_ref(), want_thumbnail)
    }

    /// Resolve `key` and open the upstream download
    #[tracing::instrument(skip(self, forward_headers), fields(operation = "open_file", file_id = %key.file_id))]
    pub async fn open(
        &self,
        key: &FileKey,
        want_thumbnail: bool,
        forward_headers: HeaderMap,
    ) -> Result<FileDownload, AppError> {
        let file = self.resolve(key, want_thumbnail).await;

        let path = self
            .upstream
            .resolve_file_path(&file.object_id)
            .await?
            .ok_or_else(|| AppError::NotFound("File not found".to_string()))?;

        let response = self.upstream.fetch_file(&path, forward_headers).await?;

        tracing::debug!(
            status = response.status().as_u16(),
            thumbnail = file.is_thumbnail,
            content_type = %file.content_type,
            "Upstream download opened"
        );

        Ok(FileDownload { file, response })
    }
}

fn resolve_with_record(
    key: &FileKey,
    record: Option<&FileMetadataRecord>,
    want_thumbnail: bool,
) -> ResolvedFile {
    let extension = key.extension.to_ascii_lowercase();
    let from_extension = || mime_from_extension(&extension);

    let Some(record) = record else {
        return ResolvedFile {
            object_id: key.file_id.clone(),
            content_type: from_extension().unwrap_or_else(|| DEFAULT_MIME.to_string()),
            download_name: key.storage_key(),
            is_thumbnail: false,
        };
    };

    if want_thumbnail {
        if let Some(thumbnail_id) = record.thumbnail_id.as_deref().filter(|t| !t.is_empty()) {
            return ResolvedFile {
                object_id: thumbnail_id.to_string(),
                content_type: THUMBNAIL_CONTENT_TYPE.to_string(),
                download_name: format!("{}.jpeg", thumbnail_id),
                is_thumbnail: true,
            };
        }
    }

    let stored = record.mime.trim();
    let content_type = if stored.is_empty() {
        from_extension().unwrap_or_else(|| DEFAULT_MIME.to_string())
    } else if !extension.is_empty() && extension != extension_from_mime(stored) {
        // Stored type disagrees with the requested extension (e.g. jpg vs jpeg).
        from_extension().unwrap_or_else(|| stored.to_string())
    } else {
        stored.to_string()
    };

    let download_name = if extension.is_empty() {
        match extension_from_mime(&content_type) {
            ext if ext.is_empty() => key.file_id.clone(),
            ext => format!("{}.{}", key.file_id, ext),
        }
    } else {
        key.storage_key()
    };

    ResolvedFile {
        object_id: key.file_id.clone(),
        content_type,
        download_name,
        is_thumbnail: false,
    }
}
