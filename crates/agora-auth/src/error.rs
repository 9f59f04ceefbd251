//! Error types for the credential and relay layer.

use reqwest::StatusCode;

/// Result type alias for this crate.
pub type Result<T> = std::result::Result<T, RelayError>;

/// Message returned when a relay is attempted without a session token.
pub const LOGIN_REQUIRED: &str = "login required";

/// Message returned for a provider outside the supported set.
pub const UNSUPPORTED_PROVIDER: &str = "unsupported provider";

/// Fallback when an upstream rejection carries no readable message.
pub const UPSTREAM_FALLBACK: &str = "요청을 처리하지 못했습니다. 잠시 후 다시 시도해 주세요.";

/// Message substituted for transport failures so causes never reach callers.
pub const GENERIC_FAILURE: &str = "일시적인 오류가 발생했습니다. 잠시 후 다시 시도해 주세요.";

/// Errors that can occur while exchanging credentials or relaying requests.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Provider is not in the supported set. Raised before any network call.
    #[error("Unsupported provider: {0}")]
    UnsupportedProvider(String),

    /// No session token was available for an authenticated call.
    #[error("Missing credential")]
    MissingCredential,

    /// Upstream answered with a rejection.
    #[error("Upstream rejected request ({status}): {message}")]
    UpstreamRejected { status: StatusCode, message: String },

    /// Session renewal failed; the caller should treat the session as gone.
    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),

    /// Upstream accepted a stream request but sent no body.
    #[error("Upstream returned no stream body")]
    StreamUnavailable,

    /// Upstream answered 2xx with a body that breaks the expected contract.
    #[error("Malformed upstream response: {0}")]
    MalformedResponse(String),

    /// Caller sent something that cannot be forwarded.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Network-level failure (DNS, timeout, reset).
    #[error("Transport error: {0}")]
    Transport(String),
}

impl RelayError {
    /// HTTP status this error maps to when surfaced to a caller.
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::UnsupportedProvider(_) | RelayError::InvalidRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            RelayError::MissingCredential | RelayError::RefreshFailed(_) => {
                StatusCode::UNAUTHORIZED
            }
            RelayError::UpstreamRejected { status, .. } => *status,
            RelayError::StreamUnavailable
            | RelayError::MalformedResponse(_)
            | RelayError::Transport(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to the caller.
    ///
    /// Upstream messages pass through; internal causes are replaced by a
    /// generic message.
    pub fn public_message(&self) -> String {
        match self {
            RelayError::UnsupportedProvider(_) => UNSUPPORTED_PROVIDER.to_string(),
            RelayError::MissingCredential | RelayError::RefreshFailed(_) => {
                LOGIN_REQUIRED.to_string()
            }
            RelayError::UpstreamRejected { message, .. } => message.clone(),
            RelayError::InvalidRequest(msg) => msg.clone(),
            RelayError::StreamUnavailable
            | RelayError::MalformedResponse(_)
            | RelayError::Transport(_) => GENERIC_FAILURE.to_string(),
        }
    }

    /// Whether the failure originated on our side of the wire.
    pub fn is_internal(&self) -> bool {
        self.status().is_server_error() && !matches!(self, RelayError::UpstreamRejected { .. })
    }
}

impl From<reqwest::Error> for RelayError {
    fn from(e: reqwest::Error) -> Self {
        RelayError::Transport(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            RelayError::UnsupportedProvider("naver".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(RelayError::MissingCredential.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            RelayError::StreamUnavailable.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            RelayError::UpstreamRejected {
                status: StatusCode::SERVICE_UNAVAILABLE,
                message: "down".into()
            }
            .status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_transport_cause_is_not_public() {
        let err = RelayError::Transport("dns error: no such host upstream.internal".into());
        assert_eq!(err.public_message(), GENERIC_FAILURE);
        assert!(err.is_internal());
    }

    #[test]
    fn test_upstream_message_passes_through() {
        let err = RelayError::UpstreamRejected {
            status: StatusCode::BAD_REQUEST,
            message: "invalid_grant".into(),
        };
        assert_eq!(err.public_message(), "invalid_grant");
        assert!(!err.is_internal());
    }
}
