//! Native shell bridge endpoint.

use agora_auth::BridgeMessage;
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::header,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AuthError;
use crate::state::AppState;

/// Reply to the shell after a successful exchange.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeLoginResponse {
    pub success: bool,
    pub credentials_set: bool,
    /// Tells the shell to reload so the new cookies take effect.
    pub reload: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<Value>,
}

/// POST /auth/native
///
/// Upstream's `Set-Cookie` headers are replayed verbatim; the local
/// credential store is never written here.
pub async fn native_login_handler(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Response, AuthError> {
    let Json(raw) = payload?;
    let message = BridgeMessage::from_value(raw)?;
    let method = message.method();

    let outcome = state.bridge.dispatch(message).await?;
    tracing::info!(
        method,
        credentials_set = outcome.credentials_set,
        "Native bridge login completed"
    );

    let body = NativeLoginResponse {
        success: true,
        credentials_set: outcome.credentials_set,
        reload: true,
        user: outcome.user,
    };
    let mut response = Json(body).into_response();
    for cookie in outcome.set_cookies {
        response.headers_mut().append(header::SET_COOKIE, cookie);
    }
    Ok(response)
}
