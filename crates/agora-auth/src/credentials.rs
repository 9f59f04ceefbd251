//! Credential storage.
//!
//! The session token and renewal token live in two HTTP-only cookies.
//! Components never touch the cookies directly; they take a
//! [`CredentialStore`] so tests can substitute [`MemoryCredentialStore`].

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use time::Duration;

/// Default session token cookie name.
pub const SESSION_COOKIE: &str = "access_token";

/// Default renewal token cookie name.
pub const RENEWAL_COOKIE: &str = "refresh_token";

/// The two bearer credentials of one browser or app session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialPair {
    pub session_token: String,
    pub renewal_token: String,
}

impl CredentialPair {
    pub fn new(session_token: impl Into<String>, renewal_token: impl Into<String>) -> Self {
        Self {
            session_token: session_token.into(),
            renewal_token: renewal_token.into(),
        }
    }
}

/// Storage for the credential pair.
///
/// Both tokens are written and cleared together. A store holding only one
/// of them reports no pair from [`get`](CredentialStore::get).
pub trait CredentialStore: Send + Sync {
    /// The stored pair, if both tokens are present.
    fn get(&self) -> Option<CredentialPair>;

    /// The session token alone.
    fn session_token(&self) -> Option<String> {
        self.get().map(|pair| pair.session_token)
    }

    /// The renewal token alone. Outlives the session token.
    fn renewal_token(&self) -> Option<String> {
        self.get().map(|pair| pair.renewal_token)
    }

    /// Replace both tokens.
    fn set(&mut self, pair: &CredentialPair);

    /// Remove both tokens.
    fn clear(&mut self);
}

// ============================================================================
// Cookie policy
// ============================================================================

/// Attributes applied to both credential cookies.
#[derive(Debug, Clone)]
pub struct CookiePolicy {
    pub session_cookie: String,
    pub renewal_cookie: String,
    /// Set the `Secure` attribute. Enabled in production only.
    pub secure: bool,
    pub domain: Option<String>,
    pub session_max_age_days: i64,
    pub renewal_max_age_days: i64,
}

impl Default for CookiePolicy {
    fn default() -> Self {
        Self {
            session_cookie: SESSION_COOKIE.to_string(),
            renewal_cookie: RENEWAL_COOKIE.to_string(),
            secure: false,
            domain: None,
            session_max_age_days: 7,
            renewal_max_age_days: 30,
        }
    }
}

impl CookiePolicy {
    /// Policy for a production deployment (`Secure` cookies).
    pub fn production() -> Self {
        Self {
            secure: true,
            ..Default::default()
        }
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Build the session token cookie.
    pub fn session_cookie(&self, value: &str) -> Cookie<'static> {
        self.build(&self.session_cookie, value, Duration::days(self.session_max_age_days))
    }

    /// Build the renewal token cookie.
    pub fn renewal_cookie(&self, value: &str) -> Cookie<'static> {
        self.build(&self.renewal_cookie, value, Duration::days(self.renewal_max_age_days))
    }

    /// Build a cookie that removes `name` from the browser.
    pub fn removal_cookie(&self, name: &str) -> Cookie<'static> {
        self.build(name, "", Duration::ZERO)
    }

    fn build(&self, name: &str, value: &str, max_age: Duration) -> Cookie<'static> {
        let mut builder = Cookie::build((name.to_string(), value.to_string()))
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .path("/")
            .max_age(max_age);
        if let Some(domain) = &self.domain {
            builder = builder.domain(domain.clone());
        }
        builder.build()
    }
}

// ============================================================================
// CookieCredentialStore
// ============================================================================

/// Credential store over the request's cookie jar.
///
/// Writes accumulate in the jar; return [`into_jar`](Self::into_jar) from
/// the handler so the `Set-Cookie` headers reach the caller.
#[derive(Debug, Clone)]
pub struct CookieCredentialStore {
    jar: CookieJar,
    policy: CookiePolicy,
}

impl CookieCredentialStore {
    pub fn new(jar: CookieJar, policy: CookiePolicy) -> Self {
        Self { jar, policy }
    }

    /// Give back the jar, carrying any pending cookie changes.
    pub fn into_jar(self) -> CookieJar {
        self.jar
    }

    fn read(&self, name: &str) -> Option<String> {
        self.jar
            .get(name)
            .map(|cookie| cookie.value().to_string())
            .filter(|value| !value.is_empty())
    }

    fn add(&mut self, cookie: Cookie<'static>) {
        self.jar = self.jar.clone().add(cookie);
    }
}

impl CredentialStore for CookieCredentialStore {
    fn get(&self) -> Option<CredentialPair> {
        let session_token = self.read(&self.policy.session_cookie)?;
        let renewal_token = self.read(&self.policy.renewal_cookie)?;
        Some(CredentialPair {
            session_token,
            renewal_token,
        })
    }

    fn session_token(&self) -> Option<String> {
        self.read(&self.policy.session_cookie)
    }

    fn renewal_token(&self) -> Option<String> {
        self.read(&self.policy.renewal_cookie)
    }

    fn set(&mut self, pair: &CredentialPair) {
        let session = self.policy.session_cookie(&pair.session_token);
        let renewal = self.policy.renewal_cookie(&pair.renewal_token);
        self.add(session);
        self.add(renewal);
    }

    fn clear(&mut self) {
        let session = self.policy.removal_cookie(&self.policy.session_cookie);
        let renewal = self.policy.removal_cookie(&self.policy.renewal_cookie);
        self.add(session);
        self.add(renewal);
    }
}

// ============================================================================
// MemoryCredentialStore (for testing)
// ============================================================================

/// In-memory credential store for testing.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    pair: Option<CredentialPair>,
    writes: usize,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pair(pair: CredentialPair) -> Self {
        Self {
            pair: Some(pair),
            writes: 0,
        }
    }

    /// Number of `set`/`clear` calls observed.
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self) -> Option<CredentialPair> {
        self.pair.clone()
    }

    fn set(&mut self, pair: &CredentialPair) {
        self.pair = Some(pair.clone());
        self.writes += 1;
    }

    fn clear(&mut self) {
        self.pair = None;
        self.writes += 1;
    }
}
