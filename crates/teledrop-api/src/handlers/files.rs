//! Gallery management: list and delete metadata records, clear all stored data

use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use teledrop_core::{AppError, FileKey, FileListEntry, FileListResponse};
use teledrop_services::drain;
use utoipa::{IntoParams, ToSchema};

const DEFAULT_LIST_LIMIT: usize = 100;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListFilesQuery {
    /// Page size (default 100, at most 1000)
    pub limit: Option<usize>,
    /// Cursor returned by the previous page
    pub cursor: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ClearDataResponse {
    pub message: String,
    pub metadata_deleted: usize,
    pub chunks_deleted: usize,
}

/// List stored file records
#[utoipa::path(
    get,
    path = "/api/files",
    tag = "files",
    params(ListFilesQuery),
    responses(
        (status = 200, description = "One page of file records", body = FileListResponse),
        (status = 401, description = "Missing or invalid credential", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, query), fields(operation = "list_files"))]
pub async fn list_files(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListFilesQuery>,
) -> Result<Json<FileListResponse>, HttpAppError> {
    let limit = query.limit.filter(|l| *l > 0).unwrap_or(DEFAULT_LIST_LIMIT);
    let cursor = query.cursor.filter(|c| !c.is_empty());

    let page = state.metadata.list(cursor, limit).await?;

    let keys = page
        .keys
        .into_iter()
        .map(|key| FileListEntry {
            name: key.name,
            metadata: key.metadata,
        })
        .collect();

    Ok(Json(FileListResponse {
        keys,
        cursor: page.cursor,
        list_complete: page.list_complete,
    }))
}

/// Delete one file record. The upstream copy is left in place.
#[utoipa::path(
    delete,
    path = "/api/files/{key}",
    tag = "files",
    params(("key" = String, Path, description = "Public file key `{fileId}.{ext}`")),
    responses(
        (status = 204, description = "Record deleted"),
        (status = 401, description = "Missing or invalid credential", body = ErrorResponse),
        (status = 404, description = "Record not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(operation = "delete_file"))]
pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, HttpAppError> {
    let key = FileKey::parse(&key)?;
    if !state.metadata.delete_record(&key).await? {
        return Err(AppError::NotFound(format!("No record for {}", key)).into());
    }

    tracing::info!(file_id = %key.file_id, "File record deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Drain both key-value namespaces
#[utoipa::path(
    post,
    path = "/api/clear-data",
    tag = "files",
    responses(
        (status = 200, description = "All data cleared", body = ClearDataResponse),
        (status = 401, description = "Missing or invalid credential", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(operation = "clear_data"))]
pub async fn clear_data(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ClearDataResponse>, HttpAppError> {
    let metadata_deleted = drain(state.metadata.inner().as_ref()).await?;
    let chunks_deleted = drain(state.chunks.inner().as_ref()).await?;

    tracing::info!(metadata_deleted, chunks_deleted, "All data cleared");

    Ok(Json(ClearDataResponse {
        message: "All data cleared successfully.".to_string(),
        metadata_deleted,
        chunks_deleted,
    }))
}
