//! Provider code exchange and password login.
//!
//! Each exchange runs validate → forward → set credentials → respond, in
//! that order. Every failure is terminal; nothing is retried.

use std::fmt;
use std::str::FromStr;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::credentials::{CredentialPair, CredentialStore};
use crate::error::{RelayError, Result};
use crate::upstream::{ParsedUpstreamError, Upstream, rejection};

/// Error marker used when the provider redirect carries no code.
pub const NO_CODE: &str = "no_code";

/// OAuth providers accepted for code exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Kakao,
    Apple,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Kakao => "kakao",
            Provider::Apple => "apple",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "kakao" => Ok(Provider::Kakao),
            "apple" => Ok(Provider::Apple),
            other => Err(RelayError::UnsupportedProvider(other.to_string())),
        }
    }
}

/// Programmatic exchange request body.
///
/// Fields other than `code` and `state` are forwarded as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthExchangeRequest {
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl OAuthExchangeRequest {
    pub fn new(code: impl Into<String>, state: Option<String>) -> Self {
        Self {
            code: code.into(),
            state,
            extra: Map::new(),
        }
    }
}

/// Query parameters of a provider redirect.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RedirectQuery {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Result of a successful exchange.
#[derive(Debug, Clone)]
pub struct ExchangeOutcome {
    pub user: Value,
    pub access_token: String,
    /// Whether both credential cookies were written.
    pub credentials_set: bool,
}

/// Where a redirect-mode exchange sends the browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectOutcome {
    /// Credentials set; go to the application home.
    Home,
    /// Go to the login page with this error code.
    Login { error: String },
}

/// Exchanges provider codes and passwords for the credential pair.
#[derive(Debug, Clone)]
pub struct OAuthExchange {
    upstream: Upstream,
}

impl OAuthExchange {
    pub fn new(upstream: Upstream) -> Self {
        Self { upstream }
    }

    /// Programmatic mode.
    ///
    /// The provider is validated before anything touches the network.
    pub async fn exchange<S>(
        &self,
        provider: &str,
        request: OAuthExchangeRequest,
        store: &mut S,
    ) -> Result<ExchangeOutcome>
    where
        S: CredentialStore + ?Sized,
    {
        let provider: Provider = provider.parse()?;
        let path = self.upstream.config().oauth_callback_for(provider.as_str());
        let body = serde_json::to_value(&request)
            .map_err(|e| RelayError::InvalidRequest(format!("Invalid exchange body: {}", e)))?;

        tracing::info!(provider = %provider, "Exchanging OAuth code");
        self.forward_and_store(&path, &body, "OAuth exchange", store).await
    }

    /// Redirect mode.
    ///
    /// Never fails: every error becomes a [`RedirectOutcome::Login`].
    pub async fn exchange_redirect<S>(
        &self,
        provider: &str,
        query: RedirectQuery,
        store: &mut S,
    ) -> RedirectOutcome
    where
        S: CredentialStore + ?Sized,
    {
        if let Some(error) = query.error {
            tracing::info!(provider, error = %error, "Provider returned an error");
            return RedirectOutcome::Login { error };
        }

        let Some(code) = query.code.filter(|code| !code.is_empty()) else {
            return RedirectOutcome::Login {
                error: NO_CODE.to_string(),
            };
        };

        let request = OAuthExchangeRequest::new(code, query.state);
        match self.exchange(provider, request, store).await {
            Ok(_) => RedirectOutcome::Home,
            Err(RelayError::UnsupportedProvider(_)) => RedirectOutcome::Login {
                error: "unsupported_provider".to_string(),
            },
            Err(e) => RedirectOutcome::Login {
                error: e.public_message(),
            },
        }
    }

    /// Password login. Same contract as the programmatic exchange.
    pub async fn login<S>(&self, body: Value, store: &mut S) -> Result<ExchangeOutcome>
    where
        S: CredentialStore + ?Sized,
    {
        if !body.is_object() {
            return Err(RelayError::InvalidRequest(
                "login body must be a JSON object".to_string(),
            ));
        }
        let path = self.upstream.config().login_path.clone();
        self.forward_and_store(&path, &body, "Login", store).await
    }

    async fn forward_and_store<S>(
        &self,
        path: &str,
        body: &Value,
        operation: &str,
        store: &mut S,
    ) -> Result<ExchangeOutcome>
    where
        S: CredentialStore + ?Sized,
    {
        let response = self
            .upstream
            .send(self.upstream.post(path).json(body), operation)
            .await?;

        if !response.status().is_success() {
            return Err(rejection(response).await);
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| RelayError::MalformedResponse(format!("{} response: {}", operation, e)))?;

        let (user, pair) = credentials_from_body(&body)?;
        store.set(&pair);
        tracing::info!(operation, "Credentials established");

        Ok(ExchangeOutcome {
            user,
            access_token: pair.session_token,
            credentials_set: true,
        })
    }
}

/// Pull `user` and `tokens.access`/`tokens.refresh` out of a 2xx body.
///
/// A body that carries an error message instead of tokens is a rejection,
/// not a contract violation.
fn credentials_from_body(body: &Value) -> Result<(Value, CredentialPair)> {
    let token = |name: &str| {
        body.get("tokens")
            .and_then(|tokens| tokens.get(name))
            .and_then(Value::as_str)
            .filter(|token| !token.is_empty())
            .map(str::to_string)
    };

    match (body.get("user"), token("access"), token("refresh")) {
        (Some(user), Some(access), Some(refresh)) => {
            Ok((user.clone(), CredentialPair::new(access, refresh)))
        }
        _ => match ParsedUpstreamError::from_value(body) {
            ParsedUpstreamError::Structured { message } => {
                tracing::warn!(message = %message, "Upstream reported an error with a success status");
                Err(RelayError::UpstreamRejected {
                    status: StatusCode::BAD_REQUEST,
                    message,
                })
            }
            ParsedUpstreamError::Unstructured => Err(RelayError::MalformedResponse(
                "response is missing user or tokens".to_string(),
            )),
        },
    }
}
