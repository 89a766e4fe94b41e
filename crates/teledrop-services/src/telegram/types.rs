//! Bot API wire types
//!
//! Only the fields the relay reads are modelled; everything else in the upstream payloads is
//! ignored by serde.

use serde::Deserialize;
use teledrop_core::RemoteObjectRef;

/// Envelope wrapping every Bot API response
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    #[serde(default = "Option::default")]
    pub result: Option<T>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub error_code: Option<i64>,
}

/// One resolution of a photo, or a thumbnail
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PhotoSize {
    pub file_id: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    #[serde(default)]
    pub file_size: Option<u64>,
}

impl PhotoSize {
    /// Ordering key for picking the largest and smallest variants. Byte size wins, pixel
    /// area breaks ties and covers variants sent without a size.
    fn rank(&self) -> (u64, u64) {
        (
            self.file_size.unwrap_or(0),
            u64::from(self.width) * u64::from(self.height),
        )
    }
}

/// Video, document, sticker or animation attachment
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FileAttachment {
    pub file_id: String,
    #[serde(default, alias = "thumb")]
    pub thumbnail: Option<PhotoSize>,
    #[serde(default)]
    pub file_size: Option<u64>,
}

/// The subset of a sent message that carries the stored object
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub message_id: i64,
    #[serde(default)]
    pub photo: Option<Vec<PhotoSize>>,
    #[serde(default)]
    pub video: Option<FileAttachment>,
    #[serde(default)]
    pub document: Option<FileAttachment>,
    #[serde(default)]
    pub sticker: Option<FileAttachment>,
    #[serde(default)]
    pub animation: Option<FileAttachment>,
}

/// Result of `getFile`
#[derive(Debug, Clone, Deserialize)]
pub struct TgFile {
    pub file_id: String,
    #[serde(default)]
    pub file_path: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
}

/// The shape of the object a message ended up holding
#[derive(Debug, Clone, Copy)]
pub enum SentMedia<'a> {
    Photo(&'a [PhotoSize]),
    Video(&'a FileAttachment),
    Document(&'a FileAttachment),
    Sticker(&'a FileAttachment),
}

impl Message {
    /// Classify the message payload. A GIF sent as a document comes back with both an
    /// `animation` and a `document` field; the document wins.
    pub fn sent_media(&self) -> Option<SentMedia<'_>> {
        if let Some(photo) = self.photo.as_deref().filter(|p| !p.is_empty()) {
            return Some(SentMedia::Photo(photo));
        }
        if let Some(video) = &self.video {
            return Some(SentMedia::Video(video));
        }
        if let Some(document) = self.document.as_ref().or(self.animation.as_ref()) {
            return Some(SentMedia::Document(document));
        }
        self.sticker.as_ref().map(SentMedia::Sticker)
    }

    /// Extract the remote reference stored in this message, if any
    pub fn remote_ref(&self) -> Option<RemoteObjectRef> {
        self.sent_media().map(SentMedia::remote_ref)
    }
}

impl SentMedia<'_> {
    pub fn remote_ref(self) -> RemoteObjectRef {
        match self {
            SentMedia::Photo(sizes) => {
                let largest = sizes.iter().max_by_key(|s| s.rank());
                let smallest = sizes.iter().min_by_key(|s| s.rank());
                RemoteObjectRef {
                    file_id: largest.map(|s| s.file_id.clone()).unwrap_or_default(),
                    thumbnail_id: smallest.map(|s| s.file_id.clone()),
                }
            }
            SentMedia::Video(file) | SentMedia::Document(file) | SentMedia::Sticker(file) => {
                RemoteObjectRef {
                    file_id: file.file_id.clone(),
                    thumbnail_id: file.thumbnail.as_ref().map(|t| t.file_id.clone()),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn message(value: serde_json::Value) -> Message {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_photo_uses_largest_and_smallest_variants() {
        let msg = message(json!({
            "message_id": 7,
            "photo": [
                {"file_id": "mid", "width": 320, "height": 240, "file_size": 20_000},
                {"file_id": "small", "width": 90, "height": 67, "file_size": 1_200},
                {"file_id": "large", "width": 1280, "height": 960, "file_size": 180_000}
            ]
        }));

        let remote = msg.remote_ref().unwrap();
        assert_eq!(remote.file_id, "large");
        assert_eq!(remote.thumbnail_id.as_deref(), Some("small"));
    }

    #[test]
    fn test_photo_without_sizes_ranks_by_area() {
        let msg = message(json!({
            "photo": [
                {"file_id": "b", "width": 800, "height": 600},
                {"file_id": "a", "width": 100, "height": 75}
            ]
        }));

        let remote = msg.remote_ref().unwrap();
        assert_eq!(remote.file_id, "b");
        assert_eq!(remote.thumbnail_id.as_deref(), Some("a"));
    }

    #[test]
    fn test_document_with_nested_thumbnail() {
        let msg = message(json!({
            "document": {
                "file_id": "doc-1",
                "file_size": 9_000_000,
                "thumbnail": {"file_id": "doc-1-thumb", "width": 320, "height": 320}
            }
        }));

        let remote = msg.remote_ref().unwrap();
        assert_eq!(remote.file_id, "doc-1");
        assert_eq!(remote.thumbnail_id.as_deref(), Some("doc-1-thumb"));
    }

    #[test]
    fn test_legacy_thumb_field_is_accepted() {
        let msg = message(json!({
            "video": {"file_id": "vid", "thumb": {"file_id": "vid-thumb"}}
        }));

        let remote = msg.remote_ref().unwrap();
        assert_eq!(remote.file_id, "vid");
        assert_eq!(remote.thumbnail_id.as_deref(), Some("vid-thumb"));
    }

    #[test]
    fn test_sticker_and_empty_messages() {
        let sticker = message(json!({"sticker": {"file_id": "stk"}}));
        let remote = sticker.remote_ref().unwrap();
        assert_eq!(remote.file_id, "stk");
        assert!(remote.thumbnail_id.is_none());

        let empty = message(json!({"message_id": 1, "photo": []}));
        assert!(empty.remote_ref().is_none());
    }

    #[test]
    fn test_api_response_error_envelope() {
        let response: ApiResponse<Message> = serde_json::from_value(json!({
            "ok": false,
            "error_code": 400,
            "description": "Bad Request: IMAGE_PROCESS_FAILED"
        }))
        .unwrap();

        assert!(!response.ok);
        assert!(response.result.is_none());
        assert_eq!(response.error_code, Some(400));
    }
}
