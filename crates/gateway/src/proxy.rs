//! Request/response proxying.
//!
//! Bodies are buffered; the realtime traffic this deployment cares about
//! rides the upgraded duplex path instead (see `upgrade`).

use axum::{
    body::Body,
    extract::Request,
    http::{HeaderMap, HeaderName, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{debug, warn};

use crate::routes::Backend;
use crate::state::GatewayState;

/// Upper bound on a buffered proxied body.
const MAX_BODY_BYTES: usize = 50 * 1024 * 1024;

/// Headers that describe the hop rather than the message; never forwarded.
const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "upgrade",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
];

pub fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP.contains(&name.as_str()) || name == http::header::HOST
}

/// The structured 503 every backend failure maps to, naming the backend so
/// operators can tell an auth outage from a chat outage at a glance.
pub fn backend_unavailable(backend: Backend) -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({
            "success": false,
            "error": "SERVICE_UNAVAILABLE",
            "service": backend.name(),
        })),
    )
        .into_response()
}

pub async fn forward(
    state: &GatewayState,
    backend: Backend,
    upstream_path: &str,
    req: Request,
) -> Response {
    let (parts, body) = req.into_parts();

    let mut url = format!("{}{}", state.backend_url(backend), upstream_path);
    if let Some(query) = parts.uri.query() {
        url.push('?');
        url.push_str(query);
    }

    let body = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            debug!(error = %e, "Failed to buffer request body");
            return (
                StatusCode::PAYLOAD_TOO_LARGE,
                Json(json!({ "success": false, "error": "VALIDATION_ERROR" })),
            )
                .into_response();
        }
    };

    let mut headers = HeaderMap::new();
    for (name, value) in parts.headers.iter() {
        if !is_hop_by_hop(name) {
            headers.append(name.clone(), value.clone());
        }
    }

    let upstream = state
        .http
        .request(parts.method.clone(), &url)
        .headers(headers)
        .body(body)
        .send()
        .await;

    let upstream = match upstream {
        Ok(resp) => resp,
        Err(e) => {
            warn!(backend = backend.name(), url, error = %e, "Backend unreachable");
            return backend_unavailable(backend);
        }
    };

    let status = upstream.status();
    let mut response_headers = HeaderMap::new();
    for (name, value) in upstream.headers().iter() {
        if !is_hop_by_hop(name) {
            response_headers.append(name.clone(), value.clone());
        }
    }

    let bytes = match upstream.bytes().await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(backend = backend.name(), error = %e, "Backend body read failed");
            return backend_unavailable(backend);
        }
    };

    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = status;
    *response.headers_mut() = response_headers;
    response
}
