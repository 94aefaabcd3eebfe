//! Authorization gate.
//!
//! [`CurrentAccount`] reads the session token, verifies it, and re-fetches the
//! account from the store. Handlers that take it as an argument are protected;
//! deleting an account revokes its outstanding tokens at this point.

use axum::{extract::FromRequestParts, http::request::Parts};

use bazaar_core::{AccountId, Role};

use super::session::session_token;
use crate::error::{AppError, set_sentry_user};
use crate::models::Account;
use crate::services::auth::AuthError;
use crate::state::AppState;

/// Extractor that requires an authenticated account.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(current: CurrentAccount) -> impl IntoResponse {
///     format!("Hello, {}!", current.account().name)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentAccount(pub Account);

impl CurrentAccount {
    #[must_use]
    pub const fn id(&self) -> AccountId {
        self.0.id
    }

    #[must_use]
    pub const fn role(&self) -> Role {
        self.0.role
    }

    #[must_use]
    pub const fn account(&self) -> &Account {
        &self.0
    }
}

impl FromRequestParts<AppState> for CurrentAccount {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = session_token(&parts.headers) else {
            tracing::debug!("No session token");
            return Err(AuthError::Unauthenticated.into());
        };

        let claims = state.tokens().verify(&token).map_err(|e| {
            tracing::warn!(reason = %e, "Rejected session token");
            AuthError::Unauthenticated
        })?;

        let account = state
            .auth()
            .resolve_current_account(claims.id)
            .await
            .inspect_err(|e| {
                if matches!(e, AuthError::Unauthenticated) {
                    tracing::warn!(account_id = %claims.id, "Token refers to a deleted account");
                }
            })?;

        set_sentry_user(&account.id, Some(account.email.as_str()));
        Ok(Self(account))
    }
}
