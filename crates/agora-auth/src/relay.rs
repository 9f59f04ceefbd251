//! Authenticated JSON relay.
//!
//! Forwards the caller's body to the upstream chat endpoint with the
//! session token attached. A 401 from upstream is surfaced as-is; this
//! layer never refreshes or retries.

use reqwest::StatusCode;
use serde_json::Value;

use crate::credentials::CredentialStore;
use crate::error::{RelayError, Result};
use crate::upstream::{Upstream, rejection};

/// Relays chat requests to the upstream API.
#[derive(Debug, Clone)]
pub struct ChatRelay {
    upstream: Upstream,
}

impl ChatRelay {
    pub fn new(upstream: Upstream) -> Self {
        Self { upstream }
    }

    /// Forward `body` unmodified and return upstream's status and JSON body.
    pub async fn relay<S>(&self, store: &S, body: &Value) -> Result<(StatusCode, Value)>
    where
        S: CredentialStore + ?Sized,
    {
        let token = store.session_token().ok_or(RelayError::MissingCredential)?;
        let path = &self.upstream.config().chat_path;

        let response = self
            .upstream
            .send(
                self.upstream.post(path).bearer_auth(&token).json(body),
                "Chat relay",
            )
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(rejection(response).await);
        }

        let body = response
            .json::<Value>()
            .await
            .map_err(|e| RelayError::MalformedResponse(format!("Chat response: {}", e)))?;

        tracing::debug!(status = %status, "Chat relay completed");
        Ok((status, body))
    }
}
