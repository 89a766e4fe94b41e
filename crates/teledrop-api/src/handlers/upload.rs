//! Upload handlers
//!
//! `PUT /api/upload` stores one chunk. `POST /api/upload` either finalizes a chunked upload
//! (`X-Final-Upload: true`) or accepts whole files as multipart `file` fields.

use crate::constants::{
    HEADER_CHUNK_INDEX, HEADER_FILE_ID, HEADER_FILE_MIME_TYPE, HEADER_FILE_NAME,
    HEADER_FILE_SIZE, HEADER_FINAL_UPLOAD, HEADER_TOTAL_CHUNKS,
};
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::{FromRequest, Multipart, Request, State},
    http::HeaderMap,
    Json,
};
use percent_encoding::percent_decode_str;
use std::str::FromStr;
use std::sync::Arc;
use teledrop_core::{AppError, ChunkAck, ChunkUpload, FinalizeUpload, IncomingFile, UploadResponse};

const INVALID_CHUNK_HEADERS: &str = "Missing or invalid chunk headers";
const INVALID_FINAL_HEADERS: &str = "Missing or invalid final upload headers";
const FILE_FIELD: &str = "file";

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Header value with percent-encoding removed (clients encode non-ASCII file names)
fn decoded_header(headers: &HeaderMap, name: &str) -> Option<String> {
    let raw = header_str(headers, name)?;
    let decoded = percent_decode_str(raw).decode_utf8().ok()?;
    let decoded = decoded.trim();
    (!decoded.is_empty()).then(|| decoded.to_string())
}

fn numeric_header<T: FromStr>(headers: &HeaderMap, name: &str) -> Option<T> {
    header_str(headers, name)?.parse().ok()
}

fn is_final_upload(headers: &HeaderMap) -> bool {
    header_str(headers, HEADER_FINAL_UPLOAD).is_some_and(|v| v.eq_ignore_ascii_case("true"))
}

pub(crate) fn parse_chunk_headers(headers: &HeaderMap) -> Result<ChunkUpload, AppError> {
    let parsed = (|| {
        Some(ChunkUpload {
            upload_id: decoded_header(headers, HEADER_FILE_ID)?,
            file_name: decoded_header(headers, HEADER_FILE_NAME)?,
            file_size: numeric_header(headers, HEADER_FILE_SIZE)?,
            chunk_index: numeric_header(headers, HEADER_CHUNK_INDEX)?,
            total_chunks: numeric_header(headers, HEADER_TOTAL_CHUNKS)?,
        })
    })();
    parsed.ok_or_else(|| AppError::InvalidInput(INVALID_CHUNK_HEADERS.to_string()))
}

pub(crate) fn parse_finalize_headers(headers: &HeaderMap) -> Result<FinalizeUpload, AppError> {
    let parsed = (|| {
        let file_size: u64 = numeric_header(headers, HEADER_FILE_SIZE)?;
        if file_size == 0 {
            return None;
        }
        Some(FinalizeUpload {
            upload_id: decoded_header(headers, HEADER_FILE_ID)?,
            file_name: decoded_header(headers, HEADER_FILE_NAME)?,
            file_size,
            total_chunks: numeric_header(headers, HEADER_TOTAL_CHUNKS)?,
            mime_type: header_str(headers, HEADER_FILE_MIME_TYPE).map(String::from),
        })
    })();
    parsed.ok_or_else(|| AppError::InvalidInput(INVALID_FINAL_HEADERS.to_string()))
}

/// Store one chunk of a chunked upload
#[utoipa::path(
    put,
    path = "/api/upload",
    tag = "uploads",
    params(
        ("X-File-ID" = String, Header, description = "Upload session id (percent-encoded)"),
        ("X-File-Name" = String, Header, description = "Original file name (percent-encoded)"),
        ("X-File-Size" = u64, Header, description = "Total size of the file in bytes"),
        ("X-Chunk-Index" = u32, Header, description = "Zero-based chunk index"),
        ("X-Total-Chunks" = u32, Header, description = "Number of chunks in the upload")
    ),
    request_body(content = Vec<u8>, content_type = "application/octet-stream"),
    responses(
        (status = 200, description = "Chunk stored", body = ChunkAck),
        (status = 400, description = "Missing or invalid chunk headers", body = ErrorResponse),
        (status = 401, description = "Missing or invalid credential", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, headers, body), fields(operation = "put_chunk", size_bytes = body.len()))]
pub async fn put_chunk(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ChunkAck>, HttpAppError> {
    let chunk = parse_chunk_headers(&headers)?;
    let ack = state.uploads.store_chunk(&chunk, body).await?;
    Ok(Json(ack))
}

/// Finalize a chunked upload, or upload whole files as multipart
#[utoipa::path(
    post,
    path = "/api/upload",
    tag = "uploads",
    params(
        ("X-Final-Upload" = Option<String>, Header, description = "`true` to finalize a chunked upload"),
        ("X-File-ID" = Option<String>, Header, description = "Upload session id (finalize only)"),
        ("X-File-Name" = Option<String>, Header, description = "Original file name (finalize only)"),
        ("X-File-Size" = Option<u64>, Header, description = "Total size in bytes (finalize only)"),
        ("X-Total-Chunks" = Option<u32>, Header, description = "Number of chunks (finalize only)"),
        ("X-File-Mime-Type" = Option<String>, Header, description = "Declared MIME type (finalize only)")
    ),
    request_body(content = String, content_type = "multipart/form-data", description = "One or more `file` fields when not finalizing"),
    responses(
        (status = 200, description = "Files relayed", body = UploadResponse),
        (status = 400, description = "Invalid headers, missing chunk or no files", body = ErrorResponse),
        (status = 401, description = "Missing or invalid credential", body = ErrorResponse),
        (status = 409, description = "Upload is already being finalized", body = ErrorResponse),
        (status = 413, description = "File exceeds the upstream size limit", body = ErrorResponse),
        (status = 500, description = "Upstream failure or nothing produced", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, request), fields(operation = "post_upload"))]
pub async fn post_upload(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<UploadResponse>, HttpAppError> {
    if is_final_upload(request.headers()) {
        let finalize = parse_finalize_headers(request.headers())?;
        let response = state.uploads.finalize(finalize).await?;
        return Ok(Json(response));
    }

    let multipart = Multipart::from_request(request, &()).await.map_err(|e| {
        AppError::InvalidInput(format!("Expected multipart form data: {}", e.body_text()))
    })?;
    let files = collect_files(multipart).await?;

    tracing::debug!(files = files.len(), "Multipart upload received");
    let response = state.uploads.upload_files(files).await?;
    Ok(Json(response))
}

async fn collect_files(mut multipart: Multipart) -> Result<Vec<IncomingFile>, AppError> {
    let mut files = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        AppError::InvalidInput(format!("Failed to read multipart field: {}", e.body_text()))
    })? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let file_name = field
            .file_name()
            .map(str::to_string)
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| "upload".to_string());
        let content_type = field.content_type().map(str::to_string);

        let data = field.bytes().await.map_err(|e| {
            AppError::InvalidInput(format!("Failed to read file data: {}", e.body_text()))
        })?;
        if data.is_empty() {
            continue;
        }

        files.push(IncomingFile::new(file_name, content_type.as_deref(), data));
    }

    Ok(files)
}
