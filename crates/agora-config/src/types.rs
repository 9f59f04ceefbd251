//! Configuration types.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::{ConfigError, Result};

/// Root configuration.
///
/// Every section is optional in the file; missing keys take their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgoraConfig {
    pub server: ServerSection,
    pub upstream: UpstreamSection,
    pub cookies: CookieSection,
    pub redirects: RedirectSection,
    pub logging: LoggingSection,
}

impl AgoraConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: AgoraConfig = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Reject values that parse but cannot work.
    pub fn validate(&self) -> Result<()> {
        let url = &self.upstream.url;
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::Invalid {
                field: "upstream.url".to_string(),
                reason: format!("'{}' is not an http(s) URL", url),
            });
        }
        if !self.upstream.oauth_callback_path.contains("{provider}") {
            return Err(ConfigError::Invalid {
                field: "upstream.oauth_callback_path".to_string(),
                reason: "must contain the {provider} placeholder".to_string(),
            });
        }
        if self.cookies.session_max_age_days <= 0 || self.cookies.renewal_max_age_days <= 0 {
            return Err(ConfigError::Invalid {
                field: "cookies".to_string(),
                reason: "cookie max-age must be positive".to_string(),
            });
        }
        if self.cookies.session_name == self.cookies.renewal_name {
            return Err(ConfigError::Invalid {
                field: "cookies".to_string(),
                reason: "session and renewal cookies need distinct names".to_string(),
            });
        }
        if self.upstream.stream_idle_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "upstream.stream_idle_timeout_secs".to_string(),
                reason: "must be at least one second".to_string(),
            });
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Sections
// ─────────────────────────────────────────────────────────────────────────────

/// `[server]`: the inbound listener.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub bind: String,
    pub request_logging: bool,
    /// Allowed CORS origins. Empty disables CORS.
    pub cors_origins: Vec<String>,
    pub max_body_size: usize,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3000".to_string(),
            request_logging: true,
            cors_origins: Vec::new(),
            max_body_size: 1024 * 1024,
        }
    }
}

/// `[upstream]`: the API server every call is relayed to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamSection {
    pub url: String,
    pub chat_path: String,
    pub chat_stream_path: String,
    pub refresh_path: String,
    pub oauth_callback_path: String,
    pub login_path: String,
    pub logout_path: String,
    pub apple_native_path: String,
    pub kakao_native_path: String,
    pub renewal_cookie_name: String,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub stream_idle_timeout_secs: u64,
}

impl Default for UpstreamSection {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8000/api".to_string(),
            chat_path: "/chat/".to_string(),
            chat_stream_path: "/chat/stream/".to_string(),
            refresh_path: "/auth/token/refresh/".to_string(),
            oauth_callback_path: "/auth/oauth/{provider}/callback/".to_string(),
            login_path: "/auth/login/".to_string(),
            logout_path: "/auth/logout/".to_string(),
            apple_native_path: "/auth/apple/native/".to_string(),
            kakao_native_path: "/auth/kakao/native/".to_string(),
            renewal_cookie_name: "refresh_token".to_string(),
            connect_timeout_secs: 10,
            request_timeout_secs: 30,
            stream_idle_timeout_secs: 300,
        }
    }
}

/// `[cookies]`: credential cookie policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CookieSection {
    pub session_name: String,
    pub renewal_name: String,
    /// Production deployments mark cookies `Secure`.
    pub production: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    pub session_max_age_days: i64,
    pub renewal_max_age_days: i64,
}

impl Default for CookieSection {
    fn default() -> Self {
        Self {
            session_name: "access_token".to_string(),
            renewal_name: "refresh_token".to_string(),
            production: false,
            domain: None,
            session_max_age_days: 7,
            renewal_max_age_days: 30,
        }
    }
}

/// `[redirects]`: browser destinations after a provider redirect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedirectSection {
    pub login: String,
    pub home: String,
}

impl Default for RedirectSection {
    fn default() -> Self {
        Self {
            login: "/login".to_string(),
            home: "/".to_string(),
        }
    }
}

/// `[logging]`: rolling JSON log file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Defaults to `<user config dir>/logs`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
    pub file_prefix: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            dir: None,
            file_prefix: "agora.log".to_string(),
        }
    }
}
