//! Server configuration.

use std::net::{Ipv4Addr, SocketAddr};

/// Default bind port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default max body size for relayed requests (1 MB).
pub const DEFAULT_MAX_BODY_SIZE: usize = 1024 * 1024;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the server to.
    pub bind_address: SocketAddr,

    /// Enable request logging.
    pub request_logging: bool,

    /// CORS allowed origins (empty = no CORS).
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    pub max_body_size: usize,

    // ─────────────────────────────────────────────────────────────────────────
    // Redirect targets
    // ─────────────────────────────────────────────────────────────────────────
    /// Login page a failed provider redirect lands on.
    pub login_path: String,

    /// Application home a successful provider redirect lands on.
    pub home_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_PORT)),
            request_logging: true,
            cors_origins: Vec::new(),
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            login_path: "/login".to_string(),
            home_path: "/".to_string(),
        }
    }
}

impl ServerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the bind address.
    pub fn with_bind_address(mut self, addr: SocketAddr) -> Self {
        self.bind_address = addr;
        self
    }

    /// Enable or disable request logging.
    pub fn with_request_logging(mut self, enabled: bool) -> Self {
        self.request_logging = enabled;
        self
    }

    /// Set CORS allowed origins.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = origins;
        self
    }

    /// Set the maximum request body size.
    pub fn with_max_body_size(mut self, size: usize) -> Self {
        self.max_body_size = size;
        self
    }

    /// Set the login and home redirect targets.
    pub fn with_redirects(mut self, login: impl Into<String>, home: impl Into<String>) -> Self {
        self.login_path = login.into();
        self.home_path = home.into();
        self
    }

    /// Login page URL carrying an error code.
    pub fn login_redirect(&self, error: &str) -> String {
        format!("{}?error={}", self.login_path, urlencoding::encode(error))
    }
}
