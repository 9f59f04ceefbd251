//! Session token renewal.
//!
//! The renewal token travels to the upstream server as a cookie, never as
//! an `Authorization` header. Concurrent callers are not coalesced: two
//! simultaneous refreshes issue two upstream calls.

use reqwest::header;
use serde::Deserialize;

use crate::credentials::{CredentialPair, CredentialStore};
use crate::error::{RelayError, Result};
use crate::upstream::{ParsedUpstreamError, Upstream};

/// Body of a successful renewal response.
#[derive(Debug, Deserialize)]
struct RefreshResponse {
    #[serde(default)]
    access: Option<String>,
    #[serde(default)]
    refresh: Option<String>,
    #[serde(default)]
    tokens: Option<TokenBody>,
}

#[derive(Debug, Deserialize)]
struct TokenBody {
    access: Option<String>,
    refresh: Option<String>,
}

impl RefreshResponse {
    fn into_tokens(self) -> (Option<String>, Option<String>) {
        match self.tokens {
            Some(tokens) => (tokens.access.or(self.access), tokens.refresh.or(self.refresh)),
            None => (self.access, self.refresh),
        }
    }
}

/// Renews the session token against the upstream server.
#[derive(Debug, Clone)]
pub struct TokenLifecycle {
    upstream: Upstream,
}

impl TokenLifecycle {
    pub fn new(upstream: Upstream) -> Self {
        Self { upstream }
    }

    /// Obtain a new session token and write it to the store.
    ///
    /// On success both cookies are replaced; the previous renewal token is
    /// kept when upstream does not rotate it. On failure the store is left
    /// untouched and [`RelayError::RefreshFailed`] is returned. Whether to
    /// clear the session is the caller's decision. No retry is attempted.
    pub async fn refresh<S>(&self, store: &mut S) -> Result<String>
    where
        S: CredentialStore + ?Sized,
    {
        // The session token may already be gone; only the renewal token matters here.
        let Some(renewal_token) = store.renewal_token() else {
            tracing::debug!("No renewal token stored, skipping refresh");
            return Err(RelayError::RefreshFailed("no renewal token".to_string()));
        };

        let config = self.upstream.config();
        let request = self.upstream.post(&config.refresh_path).header(
            header::COOKIE,
            format!("{}={}", config.renewal_cookie_name, renewal_token),
        );

        let response = match self.upstream.send(request, "Token refresh").await {
            Ok(response) => response,
            Err(e) => return Err(RelayError::RefreshFailed(e.to_string())),
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.bytes().await.unwrap_or_default();
            let reason = ParsedUpstreamError::parse(&body).message_or("renewal rejected");
            tracing::warn!(status = %status, reason = %reason, "Token refresh rejected");
            return Err(RelayError::RefreshFailed(format!("{} ({})", reason, status)));
        }

        let body: RefreshResponse = response.json().await.map_err(|e| {
            RelayError::RefreshFailed(format!("Failed to parse refresh response: {}", e))
        })?;

        let (access, refresh) = body.into_tokens();
        let access = access
            .filter(|token| !token.is_empty())
            .ok_or_else(|| RelayError::RefreshFailed("refresh response had no access token".to_string()))?;
        let renewal = refresh
            .filter(|token| !token.is_empty())
            .unwrap_or(renewal_token);

        store.set(&CredentialPair::new(access.clone(), renewal));
        tracing::info!("Session token refreshed");
        Ok(access)
    }

    /// End the session.
    ///
    /// Upstream is told on a best-effort basis; its answer is logged and
    /// otherwise ignored. The store is always cleared.
    pub async fn logout<S>(&self, store: &mut S)
    where
        S: CredentialStore + ?Sized,
    {
        let session_token = store.session_token();
        let renewal_token = store.renewal_token();

        if session_token.is_some() || renewal_token.is_some() {
            let config = self.upstream.config();
            let mut request = self.upstream.post(&config.logout_path);
            if let Some(token) = &session_token {
                request = request.bearer_auth(token);
            }
            if let Some(token) = &renewal_token {
                request = request.header(
                    header::COOKIE,
                    format!("{}={}", config.renewal_cookie_name, token),
                );
            }

            match self.upstream.send(request, "Logout").await {
                Ok(response) if response.status().is_success() => {
                    tracing::debug!("Upstream session revoked");
                }
                Ok(response) => {
                    tracing::warn!(status = %response.status(), "Upstream logout rejected");
                }
                Err(_) => {}
            }
        }

        store.clear();
        tracing::info!("Session cleared");
    }
}
