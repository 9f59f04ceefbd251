//! Error types for the server.

use agora_auth::RelayError;
use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// Server error type.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failure from the credential or relay layer.
    #[error(transparent)]
    Relay(#[from] RelayError),

    /// Request body could not be read as JSON, or was too large.
    #[error("Invalid body ({status}): {message}")]
    InvalidBody { status: StatusCode, message: String },

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<JsonRejection> for ServerError {
    fn from(rejection: JsonRejection) -> Self {
        ServerError::InvalidBody {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

/// Result type for server operations.
pub type Result<T> = std::result::Result<T, ServerError>;

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::Relay(e) => e.status(),
            ServerError::InvalidBody { status, .. } => *status,
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to put in a response body.
    pub fn public_message(&self) -> String {
        match self {
            ServerError::Relay(e) => e.public_message(),
            ServerError::InvalidBody { message, .. } => message.clone(),
            ServerError::Internal(_) => agora_auth::error::GENERIC_FAILURE.to_string(),
        }
    }

    fn log(&self, status: StatusCode) {
        let internal = match self {
            ServerError::Relay(e) => e.is_internal(),
            ServerError::InvalidBody { .. } => false,
            ServerError::Internal(_) => true,
        };
        if internal {
            tracing::error!(status = %status, error = %self, "Server error");
        } else {
            tracing::warn!(status = %status, error = %self, "Client error");
        }
    }
}

/// Error body for relay routes.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Error body for auth routes.
#[derive(Debug, Serialize)]
pub struct AuthErrorResponse {
    pub success: bool,
    pub error: String,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        self.log(status);

        let body = ErrorResponse {
            error: self.public_message(),
        };
        (status, Json(body)).into_response()
    }
}

/// Server error rendered in the `{success: false, error}` shape of the auth routes.
#[derive(Debug)]
pub struct AuthError(pub ServerError);

impl From<ServerError> for AuthError {
    fn from(e: ServerError) -> Self {
        AuthError(e)
    }
}

impl From<RelayError> for AuthError {
    fn from(e: RelayError) -> Self {
        AuthError(e.into())
    }
}

impl From<JsonRejection> for AuthError {
    fn from(rejection: JsonRejection) -> Self {
        AuthError(rejection.into())
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.0.status();
        self.0.log(status);

        let body = AuthErrorResponse {
            success: false,
            error: self.0.public_message(),
        };
        (status, Json(body)).into_response()
    }
}
