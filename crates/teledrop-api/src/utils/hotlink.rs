//! Hotlink protection for the retrieval route.
//!
//! A retrieval is allowed when its `Referer` points at this site, at an allow-listed origin,
//! or at a local development origin. Requests without a referer pass unless the deployment
//! expects one.

use axum::http::{header, HeaderMap};
use reqwest::Url;

use crate::state::SecurityConfig;

const FORWARDED_PROTO: &str = "x-forwarded-proto";
const LOCAL_HOSTS: &[&str] = &["localhost", "127.0.0.1", "[::1]"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HotlinkDecision {
    Allowed,
    Forbidden { referer: Option<String> },
}

impl HotlinkDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, HotlinkDecision::Allowed)
    }
}

/// Origin of the request itself: the configured public origin, or scheme and host from headers.
pub fn request_origin(headers: &HeaderMap, security: &SecurityConfig) -> Option<String> {
    if let Some(origin) = &security.public_origin {
        return Some(origin.trim_end_matches('/').to_string());
    }

    let host = headers.get(header::HOST)?.to_str().ok()?.trim();
    if host.is_empty() {
        return None;
    }
    let scheme = headers
        .get(FORWARDED_PROTO)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or("http");

    Some(format!("{}://{}", scheme, host))
}

fn origin_of(raw: &str) -> Option<(String, String)> {
    let url = Url::parse(raw).ok()?;
    let host = url.host_str()?.to_ascii_lowercase();
    Some((url.origin().ascii_serialization(), host))
}

fn same_origin(a: &str, b: &str) -> bool {
    match (origin_of(a), origin_of(b)) {
        (Some((a, _)), Some((b, _))) => a == b,
        _ => false,
    }
}

pub fn check_hotlink(headers: &HeaderMap, security: &SecurityConfig) -> HotlinkDecision {
    let referer = headers
        .get(header::REFERER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    let Some(referer) = referer else {
        return if security.expect_referer {
            HotlinkDecision::Forbidden { referer: None }
        } else {
            HotlinkDecision::Allowed
        };
    };

    let forbidden = || HotlinkDecision::Forbidden {
        referer: Some(referer.to_string()),
    };

    let Some((referer_origin, referer_host)) = origin_of(referer) else {
        return forbidden();
    };

    if LOCAL_HOSTS.contains(&referer_host.as_str()) {
        return HotlinkDecision::Allowed;
    }

    let own = request_origin(headers, security);
    if own.as_deref().is_some_and(|own| same_origin(own, &referer_origin)) {
        return HotlinkDecision::Allowed;
    }

    if security
        .allowed_origins
        .iter()
        .any(|allowed| same_origin(allowed, &referer_origin))
    {
        return HotlinkDecision::Allowed;
    }

    forbidden()
}
