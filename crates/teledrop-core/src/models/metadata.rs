use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use utoipa::ToSchema;

/// Record stored under a public file key after a successful upstream send.
///
/// Serialized with the field names the gallery frontend reads (`mime`, `thumbnailId`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadataRecord {
    pub mime: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_id: Option<String>,
}

/// One entry of the file listing
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FileListEntry {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub metadata: Option<JsonValue>,
}

/// Cursor-paginated listing of stored file keys
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FileListResponse {
    pub keys: Vec<FileListEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
    pub list_complete: bool,
}
