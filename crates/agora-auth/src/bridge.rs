//! Native shell authentication.
//!
//! The embedding mobile app signs in with the provider SDK and pushes the
//! result over its bridge. The upstream exchange endpoint sets the
//! credential cookies itself; this handler only forwards the payload and
//! carries those `Set-Cookie` headers back. It never writes or clears the
//! credential store, so a stale retry from the shell fails on its own
//! without disturbing an existing session.

use reqwest::header::{self, HeaderValue};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{RelayError, Result};
use crate::upstream::{Upstream, rejection};

/// Apple sign-in result delivered by the shell.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppleNativePayload {
    pub identity_token: String,
    #[serde(default)]
    pub authorization_code: Option<String>,
    /// Name and email, only sent by Apple on the first sign-in.
    #[serde(default)]
    pub user: Option<Value>,
}

/// Kakao SDK login result delivered by the shell.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KakaoNativePayload {
    pub access_token: String,
}

/// A bridge call: `{"method": ..., "payload": {...}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method", content = "payload")]
pub enum BridgeMessage {
    #[serde(rename = "appleLogin")]
    Apple(AppleNativePayload),
    #[serde(rename = "kakaoLogin")]
    Kakao(KakaoNativePayload),
}

impl BridgeMessage {
    /// Parse a raw bridge message, rejecting unknown methods.
    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value)
            .map_err(|e| RelayError::InvalidRequest(format!("Invalid bridge message: {}", e)))
    }

    pub fn method(&self) -> &'static str {
        match self {
            BridgeMessage::Apple(_) => "appleLogin",
            BridgeMessage::Kakao(_) => "kakaoLogin",
        }
    }
}

/// Result of a successful bridge exchange.
#[derive(Debug, Clone)]
pub struct BridgeOutcome {
    /// Whether upstream's response set the session cookie.
    pub credentials_set: bool,
    /// `Set-Cookie` headers from upstream, to be replayed to the shell.
    pub set_cookies: Vec<HeaderValue>,
    pub user: Option<Value>,
}

/// Upstream request body for the Apple exchange.
#[derive(Debug, Serialize)]
struct AppleExchange<'a> {
    identity_token: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    authorization_code: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    user: Option<&'a Value>,
}

/// Upstream request body for the Kakao exchange.
#[derive(Debug, Serialize)]
struct KakaoExchange<'a> {
    access_token: &'a str,
}

/// Forwards native sign-in results to the upstream exchange endpoints.
#[derive(Debug, Clone)]
pub struct NativeBridge {
    upstream: Upstream,
    session_cookie: String,
}

impl NativeBridge {
    /// `session_cookie` is the cookie name whose presence in upstream's
    /// response marks the credentials as set.
    pub fn new(upstream: Upstream, session_cookie: impl Into<String>) -> Self {
        Self {
            upstream,
            session_cookie: session_cookie.into(),
        }
    }

    /// Route a bridge message to its provider.
    pub async fn dispatch(&self, message: BridgeMessage) -> Result<BridgeOutcome> {
        match message {
            BridgeMessage::Apple(payload) => self.apple_login(&payload).await,
            BridgeMessage::Kakao(payload) => self.kakao_login(&payload).await,
        }
    }

    pub async fn apple_login(&self, payload: &AppleNativePayload) -> Result<BridgeOutcome> {
        if payload.identity_token.is_empty() {
            return Err(RelayError::InvalidRequest("identityToken is empty".to_string()));
        }
        let body = AppleExchange {
            identity_token: &payload.identity_token,
            authorization_code: payload.authorization_code.as_deref(),
            user: payload.user.as_ref(),
        };
        let path = self.upstream.config().apple_native_path.clone();
        self.forward(&path, &body, "Apple native login").await
    }

    pub async fn kakao_login(&self, payload: &KakaoNativePayload) -> Result<BridgeOutcome> {
        if payload.access_token.is_empty() {
            return Err(RelayError::InvalidRequest("accessToken is empty".to_string()));
        }
        let body = KakaoExchange {
            access_token: &payload.access_token,
        };
        let path = self.upstream.config().kakao_native_path.clone();
        self.forward(&path, &body, "Kakao native login").await
    }

    async fn forward<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        operation: &str,
    ) -> Result<BridgeOutcome> {
        let response = self
            .upstream
            .send(self.upstream.post(path).json(body), operation)
            .await?;

        if !response.status().is_success() {
            return Err(rejection(response).await);
        }

        let set_cookies: Vec<HeaderValue> = response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .cloned()
            .collect();
        let prefix = format!("{}=", self.session_cookie);
        let credentials_set = set_cookies.iter().any(|value| {
            value
                .to_str()
                .map(|cookie| cookie.trim_start().starts_with(&prefix))
                .unwrap_or(false)
        });

        let user = response
            .json::<Value>()
            .await
            .ok()
            .and_then(|body| body.get("user").cloned());

        if !credentials_set {
            tracing::warn!(operation, "Upstream accepted native login without setting the session cookie");
        } else {
            tracing::info!(operation, "Native login established session");
        }

        Ok(BridgeOutcome {
            credentials_set,
            set_cookies,
            user,
        })
    }
}
