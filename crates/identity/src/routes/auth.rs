//! Password signup, login and logout.

use axum::{
    Json,
    extract::State,
    http::{StatusCode, header::SET_COOKIE},
    response::{AppendHeaders, IntoResponse, Response},
};
use serde::Deserialize;

use super::{AccountResponse, MessageResponse};
use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::models::AccountView;
use crate::services::auth::Signup;
use crate::state::AppState;

/// Signup request body.
#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Create a password account and start its session.
///
/// `last_login` stays unset until the first login.
///
/// # Route
///
/// `POST /auth/signup`
pub async fn signup(
    State(state): State<AppState>,
    Json(body): Json<SignupRequest>,
) -> Result<Response> {
    let account = state
        .auth()
        .signup(Signup {
            name: body.name,
            email: body.email,
            password: body.password,
        })
        .await?;
    let token = state.tokens().issue(&account)?;
    let cookie = state.cookies().issue(&token)?;

    set_sentry_user(&account.id, Some(account.email.as_str()));

    Ok((
        StatusCode::CREATED,
        AppendHeaders([(SET_COOKIE, cookie)]),
        Json(AccountResponse::new(
            "User created successfully",
            AccountView::from(&account),
        )),
    )
        .into_response())
}

/// Log in with email and password and set the session cookie.
///
/// # Route
///
/// `POST /auth/login`
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Response> {
    let account = state.auth().login(&body.email, &body.password).await?;
    let token = state.tokens().issue(&account)?;
    let cookie = state.cookies().issue(&token)?;

    set_sentry_user(&account.id, Some(account.email.as_str()));
    tracing::info!(account_id = %account.id, "Password login");

    Ok((
        AppendHeaders([(SET_COOKIE, cookie)]),
        Json(AccountResponse::new(
            "Logged in successfully",
            AccountView::from(&account),
        )),
    )
        .into_response())
}

/// Clear the session cookie. Works with or without a valid session.
///
/// # Route
///
/// `POST /auth/logout`
pub async fn logout(State(state): State<AppState>) -> Result<Response> {
    let cleared = state.cookies().clear()?;
    clear_sentry_user();

    Ok((
        AppendHeaders(cleared.map(|value| (SET_COOKIE, value))),
        Json(MessageResponse::new("Logged out successfully")),
    )
        .into_response())
}
