//! Google sign-in route handlers.
//!
//! - Login: stores a random `state` in a short-lived cookie and redirects to
//!   Google's consent screen
//! - Callback: checks `state`, exchanges the code, reconciles the profile with
//!   a local account, sets the session cookie and redirects to the frontend

use axum::{
    extract::{Query, State},
    http::{HeaderMap, HeaderValue, header::SET_COOKIE},
    response::{AppendHeaders, IntoResponse, Redirect, Response},
};
use serde::Deserialize;

use crate::error::{AppError, Result, set_sentry_user};
use crate::middleware::session::{OAUTH_STATE_COOKIE_NAME, read_cookie};
use crate::oauth::generate_state;
use crate::services::auth::AuthError;
use crate::state::AppState;

/// Query parameters from the Google OAuth callback.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    /// Authorization code to exchange for tokens.
    pub code: Option<String>,
    /// State parameter for CSRF protection.
    pub state: Option<String>,
    /// Error code if authorization failed.
    pub error: Option<String>,
}

/// Start Google sign-in.
///
/// # Route
///
/// `GET /auth/google`
pub async fn login(State(state): State<AppState>) -> Result<Response> {
    let google = state
        .google()
        .ok_or_else(|| AppError::NotFound("Google sign-in is not configured".to_string()))?;

    let oauth_state = generate_state();
    let cookie = state.cookies().oauth_state(&oauth_state)?;
    let auth_url = google.authorization_url(&state.config().google_redirect_uri(), &oauth_state);

    Ok((AppendHeaders([(SET_COOKIE, cookie)]), Redirect::to(&auth_url)).into_response())
}

/// Handle the Google OAuth callback.
///
/// Failures redirect to the frontend login page with an `error` query
/// parameter instead of returning JSON.
///
/// # Route
///
/// `GET /auth/google/callback`
pub async fn callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<CallbackQuery>,
) -> Result<Response> {
    let clear_state = state.cookies().clear_oauth_state()?;
    let frontend = state.config().frontend_url.trim_end_matches('/').to_owned();

    let failure = |reason: &str, clear_state: HeaderValue| {
        let target = format!("{frontend}/login?error={}", urlencoding::encode(reason));
        (AppendHeaders([(SET_COOKIE, clear_state)]), Redirect::to(&target)).into_response()
    };

    let Some(google) = state.google() else {
        return Err(AppError::NotFound(
            "Google sign-in is not configured".to_string(),
        ));
    };

    if let Some(error) = query.error {
        tracing::warn!(error = %error, "Google OAuth error");
        return Ok(failure("google_denied", clear_state));
    }

    let Some(code) = query.code else {
        tracing::warn!("Google OAuth callback missing code");
        return Ok(failure("missing_code", clear_state));
    };

    let stored_state = read_cookie(&headers, OAUTH_STATE_COOKIE_NAME);
    if query.state.is_none() || stored_state != query.state {
        tracing::warn!("Google OAuth state mismatch");
        return Ok(failure("invalid_state", clear_state));
    }

    let redirect_uri = state.config().google_redirect_uri();
    let profile = match google.exchange_code(&code, &redirect_uri).await {
        Ok(access_token) => google.fetch_profile(&access_token).await,
        Err(e) => Err(e),
    };
    let profile = match profile {
        Ok(profile) => profile,
        Err(e) => {
            tracing::error!(error = %e, "Google OAuth handshake failed");
            return Ok(failure("google_failed", clear_state));
        }
    };

    let account = match state.auth().federated_login(profile).await {
        Ok(account) => account,
        Err(AuthError::Conflict(reason)) => {
            tracing::warn!(reason = %reason, "Google login conflicts with an existing account");
            return Ok(failure("account_conflict", clear_state));
        }
        Err(e) => {
            tracing::error!(error = %e, "Google login could not be reconciled");
            return Ok(failure("google_failed", clear_state));
        }
    };
    let session = match state.tokens().issue(&account) {
        Ok(token) => state.cookies().issue(&token).map_err(AppError::from),
        Err(e) => Err(AppError::from(e)),
    };
    let session = match session {
        Ok(session) => session,
        Err(e) => {
            tracing::error!(error = %e, "Google login session could not be issued");
            return Ok(failure("google_failed", clear_state));
        }
    };

    set_sentry_user(&account.id, Some(account.email.as_str()));
    tracing::info!(account_id = %account.id, "Google login");

    Ok((
        AppendHeaders([(SET_COOKIE, clear_state), (SET_COOKIE, session)]),
        Redirect::to(&format!("{frontend}/")),
    )
        .into_response())
}
