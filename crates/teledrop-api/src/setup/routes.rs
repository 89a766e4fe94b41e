//! Route configuration and setup

use crate::api_doc;
use crate::auth::{auth_middleware, AuthState};
use crate::constants::{
    CLEAR_DATA_PATH, FILES_PATH, MAX_REQUEST_BODY_BYTES, OPENAPI_PATH, UPLOAD_PATH,
};
use crate::handlers;
use crate::middleware::{security_headers_middleware, SecurityHeadersConfig};
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::{delete, get, post, put},
    Json, Router,
};
use std::sync::Arc;
use teledrop_core::Config;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

/// Setup all application routes
pub async fn setup_routes(
    config: &Config,
    state: Arc<AppState>,
) -> Result<Router<()>, anyhow::Error> {
    let cors = setup_cors(config)?;
    let auth_state = AuthState {
        token: state.security.auth_token.clone(),
    };

    let protected_routes = protected_routes().layer(axum::middleware::from_fn_with_state(
        Arc::new(auth_state),
        auth_middleware,
    ));

    let security_headers_config = Arc::new(SecurityHeadersConfig::new(config.is_production()));

    // Server-level concurrency limit to protect against resource exhaustion under extreme load
    let http_concurrency_limit = std::env::var("HTTP_CONCURRENCY_LIMIT")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(10_000)
        .max(1);
    tracing::info!(
        http_concurrency_limit = http_concurrency_limit,
        "HTTP concurrency limit layer enabled"
    );

    let app = public_routes()
        .merge(protected_routes)
        .merge(utoipa_rapidoc::RapiDoc::new(OPENAPI_PATH).path("/docs"))
        // Chunk and multipart bodies are bounded by the request limit below, not axum's 2MB default.
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(MAX_REQUEST_BODY_BYTES))
        .layer(ConcurrencyLimitLayer::new(http_concurrency_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn_with_state(
            security_headers_config,
            security_headers_middleware,
        ))
        .with_state(state);

    Ok(app)
}

fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/file/{key}", get(handlers::file::get_file))
        .route(OPENAPI_PATH, get(|| async { Json(api_doc::get_openapi_spec()) }))
}

fn protected_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            UPLOAD_PATH,
            put(handlers::upload::put_chunk).post(handlers::upload::post_upload),
        )
        .route(FILES_PATH, get(handlers::files::list_files))
        .route(
            &format!("{}/{{key}}", FILES_PATH),
            delete(handlers::files::delete_file),
        )
        .route(CLEAR_DATA_PATH, post(handlers::files::clear_data))
}

/// Setup CORS configuration
fn setup_cors(config: &Config) -> Result<CorsLayer, anyhow::Error> {
    let methods = [
        Method::GET,
        Method::PUT,
        Method::POST,
        Method::DELETE,
        Method::OPTIONS,
    ];

    let cors = if config.cors_origins().iter().any(|o| o == "*") {
        tracing::warn!("CORS configured to allow all origins - not recommended for production");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any)
    } else {
        let origins = config
            .cors_origins()
            .iter()
            .map(|o| o.parse::<HeaderValue>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| anyhow::anyhow!("Invalid CORS origin: {}", e))?;

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers(Any)
    };
    Ok(cors)
}
