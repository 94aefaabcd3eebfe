//! Authentication error types.

use thiserror::Error;

use bazaar_core::{EmailError, RoleError};

use crate::db::RepositoryError;

/// Errors that can occur during identity operations.
///
/// `InvalidCredentials` and `Unauthenticated` carry no detail. A caller never
/// learns whether an email is registered or why a token was rejected.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Email (or linked provider identity) already belongs to another account.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Wrong password, unknown email, or password login on a federated-only account.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Missing, invalid or expired token, or the account no longer exists.
    #[error("not authenticated")]
    Unauthenticated,

    /// Authenticated, but not allowed to perform this operation.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Account not found.
    #[error("account not found")]
    NotFound,

    /// Request input failed validation.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Store or infrastructure failure. Details are logged, never returned.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<RepositoryError> for AuthError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Conflict(msg) => Self::Conflict(msg),
            RepositoryError::NotFound => Self::NotFound,
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<EmailError> for AuthError {
    fn from(err: EmailError) -> Self {
        Self::Validation(format!("invalid email: {err}"))
    }
}

impl From<RoleError> for AuthError {
    fn from(err: RoleError) -> Self {
        Self::Validation(err.to_string())
    }
}
