//! Shared upstream client and error extraction.
//!
//! Every component talks to the same upstream API server through one
//! [`Upstream`] handle so connection pooling and timeouts are configured in
//! one place.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, header};
use serde_json::Value;

use crate::error::{RelayError, Result, UPSTREAM_FALLBACK};

/// Default upstream API base URL.
pub const DEFAULT_UPSTREAM_URL: &str = "http://127.0.0.1:8000/api";

/// Placeholder replaced by the provider name in the OAuth callback path.
pub const PROVIDER_PLACEHOLDER: &str = "{provider}";

/// Endpoints and timeouts of the upstream API server.
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    pub base_url: String,
    pub chat_path: String,
    pub chat_stream_path: String,
    pub refresh_path: String,
    /// Path template containing `{provider}`.
    pub oauth_callback_path: String,
    pub login_path: String,
    pub logout_path: String,
    pub apple_native_path: String,
    pub kakao_native_path: String,
    /// Cookie name the upstream reads the renewal token from.
    pub renewal_cookie_name: String,
    pub connect_timeout: Duration,
    /// Applies to every non-streaming call.
    pub request_timeout: Duration,
    /// Longest gap tolerated between two chunks of a relayed stream.
    pub stream_idle_timeout: Duration,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_UPSTREAM_URL.to_string(),
            chat_path: "/chat/".to_string(),
            chat_stream_path: "/chat/stream/".to_string(),
            refresh_path: "/auth/token/refresh/".to_string(),
            oauth_callback_path: "/auth/oauth/{provider}/callback/".to_string(),
            login_path: "/auth/login/".to_string(),
            logout_path: "/auth/logout/".to_string(),
            apple_native_path: "/auth/apple/native/".to_string(),
            kakao_native_path: "/auth/kakao/native/".to_string(),
            renewal_cookie_name: "refresh_token".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            stream_idle_timeout: Duration::from_secs(300),
        }
    }
}

impl UpstreamConfig {
    /// Create a config pointing at the given base URL with default paths.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Resolve the OAuth callback path for a provider.
    pub fn oauth_callback_for(&self, provider: &str) -> String {
        self.oauth_callback_path
            .replace(PROVIDER_PLACEHOLDER, provider)
    }
}

/// Handle to the upstream API server.
#[derive(Debug, Clone)]
pub struct Upstream {
    client: Client,
    config: Arc<UpstreamConfig>,
}

impl Upstream {
    /// Build the shared client.
    ///
    /// Only the connect timeout is set on the client itself; a total
    /// timeout there would cut long-lived streams short.
    pub fn new(config: UpstreamConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| RelayError::Transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config: Arc::new(config),
        })
    }

    /// Get the config.
    pub fn config(&self) -> &UpstreamConfig {
        &self.config
    }

    /// Absolute URL for an upstream path.
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// JSON POST with the per-request timeout applied.
    pub(crate) fn post(&self, path: &str) -> RequestBuilder {
        self.client
            .post(self.url(path))
            .header(header::CONTENT_TYPE, "application/json")
            .timeout(self.config.request_timeout)
    }

    /// JSON POST without a total timeout, for streaming responses.
    ///
    /// Callers bound the wait for response headers themselves.
    pub(crate) fn post_streaming(&self, path: &str) -> RequestBuilder {
        self.client
            .post(self.url(path))
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::ACCEPT, "text/event-stream")
    }

    /// Send a request, logging and converting transport failures.
    pub(crate) async fn send(&self, request: RequestBuilder, operation: &str) -> Result<Response> {
        request.send().await.map_err(|e| {
            tracing::error!(operation, error = %e, "Upstream request failed");
            RelayError::Transport(format!("{} request failed: {}", operation, e))
        })
    }
}

/// Outcome of reading an upstream error body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedUpstreamError {
    /// Body was JSON carrying a readable message.
    Structured { message: String },
    /// Body was empty, not JSON, or had no recognised message field.
    Unstructured,
}

/// Fields searched, in order, for an upstream error message.
const MESSAGE_FIELDS: &[&str] = &["error", "message", "detail"];

impl ParsedUpstreamError {
    /// Parse raw body bytes. Never fails.
    pub fn parse(body: &[u8]) -> Self {
        match serde_json::from_slice::<Value>(body) {
            Ok(value) => Self::from_value(&value),
            Err(_) => Self::Unstructured,
        }
    }

    /// Extract a message from an already-parsed body.
    pub fn from_value(value: &Value) -> Self {
        for field in MESSAGE_FIELDS {
            match value.get(field) {
                Some(Value::String(message)) if !message.is_empty() => {
                    return Self::Structured {
                        message: message.clone(),
                    };
                }
                Some(Value::Object(nested)) => {
                    if let Some(Value::String(message)) = nested.get("message") {
                        return Self::Structured {
                            message: message.clone(),
                        };
                    }
                }
                _ => {}
            }
        }
        Self::Unstructured
    }

    /// The structured message, or the given fallback.
    pub fn message_or(self, fallback: &str) -> String {
        match self {
            Self::Structured { message } => message,
            Self::Unstructured => fallback.to_string(),
        }
    }
}

/// Convert a non-2xx upstream response into an error, reading its full body.
pub(crate) async fn rejection(response: Response) -> RelayError {
    let status = response.status();
    let body = match response.bytes().await {
        Ok(body) => body,
        Err(e) => {
            tracing::warn!(status = %status, error = %e, "Failed to read upstream error body");
            return RelayError::UpstreamRejected {
                status,
                message: UPSTREAM_FALLBACK.to_string(),
            };
        }
    };

    let message = ParsedUpstreamError::parse(&body).message_or(UPSTREAM_FALLBACK);
    tracing::warn!(status = %status, message = %message, "Upstream rejected request");
    RelayError::UpstreamRejected { status, message }
}
