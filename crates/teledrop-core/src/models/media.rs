use bytes::Bytes;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::mime;

/// Upstream endpoint family a file is delivered through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Photo,
    Video,
    Document,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Photo => "photo",
            MediaKind::Video => "video",
            MediaKind::Document => "document",
        }
    }

    /// Photos and videos can share a grouped-media request.
    pub fn is_media(&self) -> bool {
        matches!(self, MediaKind::Photo | MediaKind::Video)
    }
}

/// A complete file ready for classification: either assembled from chunks or
/// read from a multipart field.
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub name: String,
    pub mime: String,
    /// Lowercase final dot segment of `name`, empty if none.
    pub extension: String,
    pub data: Bytes,
}

impl IncomingFile {
    /// A blank or missing declared MIME type is inferred from the file name.
    pub fn new(name: impl Into<String>, declared_mime: Option<&str>, data: Bytes) -> Self {
        let name = name.into();
        let extension = mime::extension_of(&name);
        let mime = declared_mime
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string)
            .or_else(|| mime::mime_from_extension(&extension))
            .unwrap_or_else(|| mime::DEFAULT_MIME.to_string());

        Self {
            name,
            mime,
            extension,
            data,
        }
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

/// Classifier output
#[derive(Debug, Clone)]
pub struct ClassifiedFile {
    pub kind: MediaKind,
    pub file: IncomingFile,
}

impl ClassifiedFile {
    /// Extension used in the public key. Falls back to a type default when the
    /// original name has none.
    pub fn public_extension(&self) -> String {
        if !self.file.extension.is_empty() {
            return self.file.extension.clone();
        }
        if self.file.mime.starts_with("image/") {
            "jpg".to_string()
        } else if self.file.mime.starts_with("video/") {
            "mp4".to_string()
        } else {
            "bin".to_string()
        }
    }
}

/// Upstream identifiers for one stored item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteObjectRef {
    pub file_id: String,
    pub thumbnail_id: Option<String>,
}
