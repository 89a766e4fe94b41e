//! Public retrieval route: `GET /file/{key}`
//!
//! Streams a relayed file from the upstream with a corrected content type so browsers render it
//! inline. Protected against hotlinking rather than by credentials.

use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use crate::utils::hotlink::{check_hotlink, HotlinkDecision};
use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::Response,
};
use futures::StreamExt;
use serde::Deserialize;
use std::sync::Arc;
use teledrop_core::{AppError, FileKey};
use teledrop_services::ResolvedFile;
use utoipa::IntoParams;

/// Request headers passed on to the upstream download
const FORWARDED_REQUEST_HEADERS: &[&str] = &["range", "if-none-match", "if-modified-since"];

const HOP_BY_HOP_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "transfer-encoding",
    "upgrade",
    "te",
    "trailer",
    "proxy-authenticate",
    "proxy-authorization",
];

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct FileQuery {
    /// Serve the stored thumbnail instead of the original
    #[serde(default)]
    pub thumbnail: Option<String>,
}

impl FileQuery {
    fn wants_thumbnail(&self) -> bool {
        self.thumbnail
            .as_deref()
            .is_some_and(|v| v.eq_ignore_ascii_case("true"))
    }
}

fn forward_headers(headers: &HeaderMap) -> HeaderMap {
    let mut forwarded = HeaderMap::new();
    for name in FORWARDED_REQUEST_HEADERS {
        if let Some(value) = headers.get(*name) {
            forwarded.insert(HeaderName::from_static(*name), value.clone());
        }
    }
    forwarded
}

fn inline_disposition(name: &str) -> HeaderValue {
    let escaped: String = name
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| if c == '"' { '\'' } else { c })
        .collect();
    HeaderValue::from_str(&format!("inline; filename=\"{}\"", escaped))
        .unwrap_or_else(|_| HeaderValue::from_static("inline"))
}

/// Copy upstream headers, then present the body as the resolved type
fn presentation_headers(upstream: &HeaderMap, file: &ResolvedFile) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(upstream.len() + 2);
    for (name, value) in upstream {
        if !HOP_BY_HOP_HEADERS.contains(&name.as_str()) {
            headers.append(name.clone(), value.clone());
        }
    }

    let content_type = HeaderValue::from_str(&file.content_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
    headers.insert(header::CONTENT_TYPE, content_type);
    headers.insert(
        header::CONTENT_DISPOSITION,
        inline_disposition(&file.download_name),
    );
    headers
}

fn upstream_body(response: reqwest::Response) -> Body {
    let stream = response.bytes_stream().map(|result| {
        result.map_err(|e| std::io::Error::other(format!("Upstream stream error: {}", e.without_url())))
    });
    Body::from_stream(stream)
}

/// Stream a relayed file
#[utoipa::path(
    get,
    path = "/file/{key}",
    tag = "files",
    params(
        ("key" = String, Path, description = "Public file key `{fileId}.{ext}`"),
        FileQuery
    ),
    responses(
        (status = 200, description = "File contents, rendered inline"),
        (status = 206, description = "Partial content for a Range request"),
        (status = 403, description = "Hotlink forbidden", body = ErrorResponse),
        (status = 404, description = "File not found", body = ErrorResponse),
        (status = 500, description = "Upstream failure", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, headers, query), fields(operation = "get_file"))]
pub async fn get_file(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    Query(query): Query<FileQuery>,
    headers: HeaderMap,
) -> Result<Response, HttpAppError> {
    if let HotlinkDecision::Forbidden { referer } = check_hotlink(&headers, &state.security) {
        tracing::warn!(referer = ?referer, "Hotlink request rejected");
        return Err(AppError::Forbidden("Hotlink forbidden".to_string()).into());
    }

    let key = FileKey::parse(&key)?;
    let download = state
        .gateway
        .open(&key, query.wants_thumbnail(), forward_headers(&headers))
        .await?;

    let status = StatusCode::from_u16(download.response.status().as_u16())
        .unwrap_or(StatusCode::BAD_GATEWAY);

    let mut builder = Response::builder().status(status);
    if let Some(target) = builder.headers_mut() {
        *target = if status.is_success() {
            presentation_headers(download.response.headers(), &download.file)
        } else {
            tracing::warn!(status = status.as_u16(), "Upstream download not OK, passing through");
            download.response.headers().clone()
        };
    }

    builder
        .body(upstream_body(download.response))
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to build response");
            HttpAppError::from(AppError::Internal(e.to_string()))
        })
}
