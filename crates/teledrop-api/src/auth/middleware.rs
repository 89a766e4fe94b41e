use crate::constants::AUTH_COOKIE_NAME;
use crate::error::HttpAppError;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use subtle::ConstantTimeEq;
use teledrop_core::AppError;

#[derive(Clone)]
pub struct AuthState {
    /// Shared credential; `None` leaves the protected routes open
    pub token: Option<String>,
}

fn secure_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
}

fn cookie_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|h| h.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == AUTH_COOKIE_NAME)
        .map(|(_, value)| value.trim())
}

fn unauthorized(message: &str) -> Response {
    HttpAppError(AppError::Unauthorized(message.to_string())).into_response()
}

pub async fn auth_middleware(
    State(auth_state): State<Arc<AuthState>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(expected) = auth_state.token.as_deref() else {
        return next.run(request).await;
    };

    let presented = bearer_token(request.headers()).or_else(|| cookie_token(request.headers()));
    let Some(presented) = presented else {
        tracing::debug!(path = %request.uri().path(), "Missing credential");
        return unauthorized("Missing authorization header or cookie");
    };

    if !secure_compare(presented, expected) {
        tracing::warn!(path = %request.uri().path(), "Invalid credential presented");
        return unauthorized("Invalid credential");
    }

    next.run(request).await
}
