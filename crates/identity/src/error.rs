//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.

use axum::{
    Json,
    http::{StatusCode, header::InvalidHeaderValue},
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::services::AssetError;
use crate::services::auth::{AuthError, TokenError};

/// Application-level error type for the identity service.
#[derive(Debug, Error)]
pub enum AppError {
    /// Identity operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Asset upload failed.
    #[error("Asset error: {0}")]
    Asset(#[from] AssetError),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Resource or feature not available.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<InvalidHeaderValue> for AppError {
    fn from(err: InvalidHeaderValue) -> Self {
        Self::Internal(format!("invalid header value: {err}"))
    }
}

impl AppError {
    const fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Internal(_) | Self::Auth(AuthError::Internal(_)) | Self::Asset(AssetError::Io(_))
        )
    }

    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Auth(err) => match err {
                AuthError::Conflict(_) => StatusCode::CONFLICT,
                AuthError::InvalidCredentials | AuthError::Unauthenticated => {
                    StatusCode::UNAUTHORIZED
                }
                AuthError::Forbidden(_) => StatusCode::FORBIDDEN,
                AuthError::NotFound => StatusCode::NOT_FOUND,
                AuthError::Validation(_) => StatusCode::BAD_REQUEST,
                AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Asset(AssetError::Io(_)) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Asset(AssetError::TooLarge) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Asset(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    /// Client-facing message. Never includes internal error detail.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Auth(err) => match err {
                AuthError::Conflict(msg) | AuthError::Forbidden(msg) | AuthError::Validation(msg) => {
                    msg.clone()
                }
                AuthError::InvalidCredentials => "Invalid credentials".to_string(),
                AuthError::Unauthenticated => "Not authenticated".to_string(),
                AuthError::NotFound => "Account not found".to_string(),
                AuthError::Internal(_) => "Internal server error".to_string(),
            },
            Self::Asset(AssetError::Io(_)) | Self::Internal(_) => {
                "Internal server error".to_string()
            }
            Self::Asset(err) => err.to_string(),
            Self::BadRequest(msg) | Self::NotFound(msg) => msg.clone(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        (self.status(), Json(json!({ "message": self.message() }))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context for the authenticated account.
pub fn set_sentry_user(account_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(account_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the account.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}
