//! Request logging middleware.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};

use crate::state::AppState;

/// Part of the HTTP surface a request belongs to.
fn route_kind(path: &str) -> &'static str {
    if path.starts_with("/relay/chat/stream") {
        "stream"
    } else if path.starts_with("/relay/") {
        "relay"
    } else if path.starts_with("/auth/") {
        "auth"
    } else {
        "other"
    }
}

/// Log method, path, route kind, status and latency of every request.
///
/// Only the path is logged: the provider redirect carries the
/// authorization code in its query string. For the stream relay the
/// latency covers time to first byte only; the body keeps flowing after
/// this returns.
pub async fn request_logging_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !state.config.request_logging {
        return next.run(request).await;
    }

    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let kind = route_kind(&path);

    let start = std::time::Instant::now();
    let response = next.run(request).await;
    let duration_ms = start.elapsed().as_millis() as u64;
    let status = response.status().as_u16();

    if response.status().is_server_error() {
        tracing::error!(%method, %path, kind, status, duration_ms, "Request failed upstream or internally");
    } else if response.status().is_client_error() {
        tracing::warn!(%method, %path, kind, status, duration_ms, "Request rejected");
    } else if kind == "stream" {
        tracing::info!(%method, %path, status, ttfb_ms = duration_ms, "Stream relay opened");
    } else {
        tracing::info!(%method, %path, kind, status, duration_ms, "Request completed");
    }

    response
}
