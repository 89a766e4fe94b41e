//! Upstream dispatch of classified files
//!
//! Photos and videos travel together as albums when there are at least two of them,
//! documents always go one by one. Every stored item gets a metadata record keyed by its
//! public file key, and its public URL is returned in input order (media first, then
//! documents).

use std::sync::Arc;
use std::time::Instant;
use teledrop_core::constants::MEDIA_GROUP_MAX_ITEMS;
use teledrop_core::{
    AppError, ClassifiedFile, FileKey, FileMetadataRecord, MediaKind, RemoteObjectRef,
};
use teledrop_storage::MetadataStore;

use crate::telegram::{Message, UpstreamError};
use crate::upstream::Upstream;

#[derive(Clone)]
pub struct Dispatcher {
    upstream: Arc<dyn Upstream>,
    metadata: MetadataStore,
    group_size: usize,
}

impl Dispatcher {
    pub fn new(upstream: Arc<dyn Upstream>, metadata: MetadataStore, group_size: usize) -> Self {
        Self {
            upstream,
            metadata,
            group_size: group_size.clamp(2, MEDIA_GROUP_MAX_ITEMS),
        }
    }

    /// Send every item upstream and return the public URLs produced.
    ///
    /// A failure without a fallback aborts the remaining sends.
    #[tracing::instrument(skip(self, items), fields(operation = "dispatch", items = items.len()))]
    pub async fn dispatch(&self, items: Vec<ClassifiedFile>) -> Result<Vec<String>, AppError> {
        let start = Instant::now();
        let (media, documents): (Vec<_>, Vec<_>) =
            items.into_iter().partition(|item| item.kind.is_media());

        let mut urls = Vec::with_capacity(media.len() + documents.len());

        if media.len() == 1 {
            self.send_single_media(&media[0], &mut urls).await?;
        } else {
            for batch in media.chunks(self.group_size) {
                match batch {
                    [only] => self.send_single_media(only, &mut urls).await?,
                    _ => self.send_group(batch, &mut urls).await?,
                }
            }
        }

        for document in &documents {
            self.send_document(document, &mut urls).await?;
        }

        if urls.is_empty() {
            return Err(AppError::NoResultsProduced(
                "Upstream returned no stored files".to_string(),
            ));
        }

        tracing::info!(
            urls = urls.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Dispatch completed"
        );
        Ok(urls)
    }

    async fn send_single_media(
        &self,
        item: &ClassifiedFile,
        urls: &mut Vec<String>,
    ) -> Result<(), AppError> {
        match self.upstream.send_single(item.kind, &item.file).await {
            Ok(message) => self.record(item, &message, urls).await,
            Err(e) if item.kind == MediaKind::Photo && e.is_image_process_failed() => {
                tracing::warn!(
                    file_name = %item.file.name,
                    error = %e,
                    "Photo rejected by upstream image processing, resending as document"
                );
                self.send_document(item, urls).await
            }
            Err(e) => Err(send_failed(item, e)),
        }
    }

    async fn send_group(
        &self,
        batch: &[ClassifiedFile],
        urls: &mut Vec<String>,
    ) -> Result<(), AppError> {
        let messages = match self.upstream.send_media_group(batch).await {
            Ok(messages) => messages,
            Err(e) if e.is_image_process_failed() => {
                tracing::warn!(
                    items = batch.len(),
                    error = %e,
                    "Media group rejected by upstream image processing, resending as documents"
                );
                for item in batch {
                    self.send_document(item, urls).await?;
                }
                return Ok(());
            }
            Err(e) => return Err(AppError::from(e)),
        };

        for (item, message) in batch.iter().zip(messages.iter()) {
            self.record(item, message, urls).await?;
        }

        // Items the album reply does not account for are sent again on their own.
        let unanswered = batch.get(messages.len()..).unwrap_or_default();
        if !unanswered.is_empty() {
            tracing::warn!(
                expected = batch.len(),
                received = messages.len(),
                "Media group reply is short, resending unanswered items as documents"
            );
        }
        for item in unanswered {
            self.send_document(item, urls).await?;
        }
        Ok(())
    }

    async fn send_document(
        &self,
        item: &ClassifiedFile,
        urls: &mut Vec<String>,
    ) -> Result<(), AppError> {
        let message = self
            .upstream
            .send_single(MediaKind::Document, &item.file)
            .await
            .map_err(|e| send_failed(item, e))?;
        self.record(item, &message, urls).await
    }

    /// Extract the remote reference, persist its metadata and push the public URL.
    async fn record(
        &self,
        item: &ClassifiedFile,
        message: &Message,
        urls: &mut Vec<String>,
    ) -> Result<(), AppError> {
        let RemoteObjectRef {
            file_id,
            thumbnail_id,
        } = message
            .remote_ref()
            .filter(|r| !r.file_id.is_empty())
            .ok_or_else(|| {
                AppError::UpstreamRejected(format!(
                    "Failed to get file ID for {}",
                    item.file.name
                ))
            })?;

        let key = FileKey::new(file_id, item.public_extension());
        let record = FileMetadataRecord {
            mime: item.file.mime.clone(),
            thumbnail_id,
        };

        if let Err(e) = self.metadata.put_record(&key, &record).await {
            tracing::error!(file_id = %key.file_id, error = %e, "Failed to write file metadata");
        } else {
            tracing::debug!(
                file_id = %key.file_id,
                has_thumbnail = record.thumbnail_id.is_some(),
                "File metadata stored"
            );
        }

        urls.push(key.public_path());
        Ok(())
    }
}

fn send_failed(item: &ClassifiedFile, err: UpstreamError) -> AppError {
    tracing::error!(
        file_name = %item.file.name,
        kind = item.kind.as_str(),
        error = %err,
        "Upstream send failed"
    );
    AppError::from(err)
}
