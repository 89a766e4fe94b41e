//! Limits imposed by the upstream platform and the upload protocol.

/// Direct upload ceiling of the upstream Bot API.
pub const MAX_UPLOAD_SIZE_BYTES: u64 = 50 * 1024 * 1024;

/// Images above this size are sent as documents to avoid recompression.
pub const PHOTO_MAX_SIZE_BYTES: u64 = 5 * 1024 * 1024;

/// Upper bound on items in one grouped-media request.
pub const MEDIA_GROUP_MAX_ITEMS: usize = 10;

/// Image extensions the upstream photo endpoint cannot render.
pub const DOCUMENT_ONLY_IMAGE_EXTENSIONS: &[&str] = &["heic", "heif", "webp", "ico"];

/// Content type used for thumbnails served through the retrieval gateway.
pub const THUMBNAIL_CONTENT_TYPE: &str = "image/jpeg";

/// Public retrieval path prefix.
pub const FILE_ROUTE_PREFIX: &str = "/file/";
