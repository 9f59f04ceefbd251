//! Authenticated chat relays.

use agora_auth::stream::EVENT_STREAM;
use agora_auth::{CredentialStore, RelayError};
use axum::{
    Json,
    body::Body,
    extract::{State, rejection::JsonRejection},
    http::{HeaderName, StatusCode, header},
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use serde_json::Value;

use crate::error::Result;
use crate::state::AppState;

/// Proxy buffering hint understood by nginx.
static X_ACCEL_BUFFERING: HeaderName = HeaderName::from_static("x-accel-buffering");

/// Signed-out callers get a 401 even when their body is malformed.
fn read_body(
    store: &impl CredentialStore,
    payload: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<Value> {
    if store.session_token().is_none() {
        return Err(RelayError::MissingCredential.into());
    }
    let Json(body) = payload?;
    Ok(body)
}

/// POST /relay/chat
pub async fn chat_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    payload: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>)> {
    let store = state.credentials(jar);
    let body = read_body(&store, payload)?;
    let (status, reply) = state.chat.relay(&store, &body).await?;
    Ok((status, Json(reply)))
}

/// POST /relay/chat/stream
///
/// Errors before the first byte come back as a JSON error; after that
/// the body is upstream's bytes, unmodified.
pub async fn chat_stream_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    payload: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<Response> {
    let store = state.credentials(jar);
    let body = read_body(&store, payload)?;
    let stream = state.stream.open(&store, &body).await?;

    let headers = [
        (header::CONTENT_TYPE, EVENT_STREAM),
        (header::CACHE_CONTROL, "no-cache, no-transform"),
        (header::CONNECTION, "keep-alive"),
        (X_ACCEL_BUFFERING.clone(), "no"),
    ];
    Ok((headers, Body::from_stream(stream.into_body())).into_response())
}
