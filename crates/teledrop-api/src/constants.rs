//! API constants
//!
//! Route paths shared by the router, the OpenAPI document and the integration tests.

/// API base path prefix
pub const API_PREFIX: &str = "/api";

pub const UPLOAD_PATH: &str = "/api/upload";
pub const FILES_PATH: &str = "/api/files";
pub const CLEAR_DATA_PATH: &str = "/api/clear-data";
pub const OPENAPI_PATH: &str = "/api/openapi.json";

/// Hard cap on any request body. A legacy multipart request may carry several files
/// that are each up to the upstream ceiling.
pub const MAX_REQUEST_BODY_BYTES: usize = 200 * 1024 * 1024;

/// Cookie carrying the shared credential for browser sessions
pub const AUTH_COOKIE_NAME: &str = "auth_token";

// Chunked upload headers
pub const HEADER_FILE_ID: &str = "x-file-id";
pub const HEADER_FILE_NAME: &str = "x-file-name";
pub const HEADER_FILE_SIZE: &str = "x-file-size";
pub const HEADER_CHUNK_INDEX: &str = "x-chunk-index";
pub const HEADER_TOTAL_CHUNKS: &str = "x-total-chunks";
pub const HEADER_FINAL_UPLOAD: &str = "x-final-upload";
pub const HEADER_FILE_MIME_TYPE: &str = "x-file-mime-type";
