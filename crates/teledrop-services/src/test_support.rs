//! In-process upstream double shared by the service tests

use async_trait::async_trait;
use http::HeaderMap;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use teledrop_core::{ClassifiedFile, IncomingFile, MediaKind};
use teledrop_storage::{MemoryKvStore, MetadataStore};

use crate::telegram::{FileAttachment, Message, PhotoSize, UpstreamError};
use crate::upstream::Upstream;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Single(MediaKind, String),
    Group(Vec<String>),
    GetFile(String),
    Fetch(String),
}

#[derive(Default)]
pub struct FakeUpstream {
    pub calls: Mutex<Vec<Call>>,
    pub photo_error: Mutex<Option<UpstreamError>>,
    pub video_error: Mutex<Option<UpstreamError>>,
    pub group_error: Mutex<Option<UpstreamError>>,
    pub document_error: Mutex<Option<UpstreamError>>,
    /// Answer media groups with at most this many messages
    pub group_reply_limit: Mutex<Option<usize>>,
    pub paths: Mutex<HashMap<String, String>>,
    next_id: AtomicUsize,
}

impl FakeUpstream {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn fail_photos(&self, err: UpstreamError) {
        *self.photo_error.lock().unwrap() = Some(err);
    }

    pub fn fail_videos(&self, err: UpstreamError) {
        *self.video_error.lock().unwrap() = Some(err);
    }

    pub fn fail_groups(&self, err: UpstreamError) {
        *self.group_error.lock().unwrap() = Some(err);
    }

    pub fn fail_documents(&self, err: UpstreamError) {
        *self.document_error.lock().unwrap() = Some(err);
    }

    pub fn truncate_group_replies(&self, limit: usize) {
        *self.group_reply_limit.lock().unwrap() = Some(limit);
    }

    pub fn add_path(&self, file_id: &str, path: &str) {
        self.paths
            .lock()
            .unwrap()
            .insert(file_id.to_string(), path.to_string());
    }

    fn message_for(&self, kind: MediaKind, file: &IncomingFile) -> Message {
        let id = format!("F{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        match kind {
            MediaKind::Photo => Message {
                photo: Some(vec![
                    PhotoSize {
                        file_id: format!("{}-s", id),
                        width: 90,
                        height: 90,
                        file_size: Some(1_000),
                    },
                    PhotoSize {
                        file_id: id,
                        width: 1280,
                        height: 1280,
                        file_size: Some(file.size()),
                    },
                ]),
                ..Message::default()
            },
            MediaKind::Video => Message {
                video: Some(FileAttachment {
                    file_id: id.clone(),
                    thumbnail: Some(thumb(&id)),
                    file_size: Some(file.size()),
                }),
                ..Message::default()
            },
            MediaKind::Document => Message {
                document: Some(FileAttachment {
                    thumbnail: file.mime.starts_with("image/").then(|| thumb(&id)),
                    file_id: id,
                    file_size: Some(file.size()),
                }),
                ..Message::default()
            },
        }
    }
}

fn thumb(id: &str) -> PhotoSize {
    PhotoSize {
        file_id: format!("{}-thumb", id),
        width: 320,
        height: 320,
        file_size: None,
    }
}

#[async_trait]
impl Upstream for FakeUpstream {
    async fn send_single(
        &self,
        kind: MediaKind,
        file: &IncomingFile,
    ) -> Result<Message, UpstreamError> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Single(kind, file.name.clone()));

        let failure = match kind {
            MediaKind::Photo => self.photo_error.lock().unwrap().clone(),
            MediaKind::Video => self.video_error.lock().unwrap().clone(),
            MediaKind::Document => self.document_error.lock().unwrap().clone(),
        };
        match failure {
            Some(err) => Err(err),
            None => Ok(self.message_for(kind, file)),
        }
    }

    async fn send_media_group(
        &self,
        items: &[ClassifiedFile],
    ) -> Result<Vec<Message>, UpstreamError> {
        self.calls.lock().unwrap().push(Call::Group(
            items.iter().map(|i| i.file.name.clone()).collect(),
        ));

        if let Some(err) = self.group_error.lock().unwrap().clone() {
            return Err(err);
        }
        let limit = self.group_reply_limit.lock().unwrap().unwrap_or(items.len());
        Ok(items
            .iter()
            .take(limit)
            .map(|i| self.message_for(i.kind, &i.file))
            .collect())
    }

    async fn resolve_file_path(&self, file_id: &str) -> Result<Option<String>, UpstreamError> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::GetFile(file_id.to_string()));
        Ok(self.paths.lock().unwrap().get(file_id).cloned())
    }

    async fn fetch_file(
        &self,
        file_path: &str,
        _headers: HeaderMap,
    ) -> Result<reqwest::Response, UpstreamError> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Fetch(file_path.to_string()));
        let response = http::Response::builder()
            .status(200)
            .header("content-type", "application/octet-stream")
            .body(format!("contents of {}", file_path))
            .map_err(|e| UpstreamError::Decode(e.to_string()))?;
        Ok(reqwest::Response::from(response))
    }
}

pub fn memory_metadata() -> MetadataStore {
    MetadataStore::new(Arc::new(MemoryKvStore::new()))
}

pub fn rejected(description: &str) -> UpstreamError {
    UpstreamError::Rejected {
        description: description.to_string(),
        error_code: Some(400),
    }
}
