//! Health check handler

use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use teledrop_services::KvStore;
use utoipa::ToSchema;

const CHECK_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthCheckResponse {
    pub status: String,
    pub chunk_store: String,
    pub metadata_store: String,
    pub chunk_sweeper: bool,
}

/// Run an async check with timeout; returns "healthy", "timeout", or "{prefix}: {error}".
async fn run_check<F, E>(f: F, error_prefix: &str) -> String
where
    F: Future<Output = Result<(), E>>,
    E: Display,
{
    match tokio::time::timeout(CHECK_TIMEOUT, f).await {
        Ok(Ok(())) => "healthy".to_string(),
        Ok(Err(e)) => format!("{}: {}", error_prefix, e),
        Err(_) => "timeout".to_string(),
    }
}

async fn probe(store: &dyn KvStore) -> Result<(), teledrop_services::StorageError> {
    store
        .list(teledrop_storage::ListOptions {
            limit: 1,
            ..Default::default()
        })
        .await
        .map(|_| ())
}

/// Service and key-value namespace status
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service healthy", body = HealthCheckResponse),
        (status = 503, description = "A namespace is unavailable", body = HealthCheckResponse)
    )
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let (chunk_store, metadata_store) = tokio::join!(
        run_check(probe(state.chunks.inner().as_ref()), "unhealthy"),
        run_check(probe(state.metadata.inner().as_ref()), "unhealthy"),
    );

    let healthy = chunk_store == "healthy" && metadata_store == "healthy";
    if !healthy {
        tracing::warn!(%chunk_store, %metadata_store, "Health check failed");
    }

    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(HealthCheckResponse {
            status: if healthy { "healthy" } else { "unhealthy" }.to_string(),
            chunk_store,
            metadata_store,
            chunk_sweeper: state.sweeper.is_some(),
        }),
    )
}
