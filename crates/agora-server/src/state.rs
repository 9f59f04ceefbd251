//! Application state shared across handlers.

use std::sync::Arc;

use agora_auth::{
    ChatRelay, CookieCredentialStore, CookiePolicy, NativeBridge, OAuthExchange, StreamRelay,
    TokenLifecycle, Upstream,
};
use axum_extra::extract::CookieJar;

use crate::config::ServerConfig;

/// Application state shared across all handlers.
///
/// Every component holds a clone of the same [`Upstream`], so the whole
/// process shares one connection pool.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,

    /// Attributes of the two credential cookies.
    pub cookies: Arc<CookiePolicy>,

    pub oauth: OAuthExchange,
    pub tokens: TokenLifecycle,
    pub bridge: NativeBridge,
    pub chat: ChatRelay,
    pub stream: StreamRelay,
}

impl AppState {
    /// Create a new application state.
    pub fn new(upstream: Upstream, cookies: CookiePolicy, config: ServerConfig) -> Self {
        let bridge = NativeBridge::new(upstream.clone(), cookies.session_cookie.clone());
        Self {
            config: Arc::new(config),
            cookies: Arc::new(cookies),
            oauth: OAuthExchange::new(upstream.clone()),
            tokens: TokenLifecycle::new(upstream.clone()),
            bridge,
            chat: ChatRelay::new(upstream.clone()),
            stream: StreamRelay::new(upstream),
        }
    }

    /// Credential store over the request's cookies.
    pub fn credentials(&self, jar: CookieJar) -> CookieCredentialStore {
        CookieCredentialStore::new(jar, self.cookies.as_ref().clone())
    }
}
