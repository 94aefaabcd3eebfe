//! HTTP route handlers for the identity service.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                 - Liveness
//! GET    /health/ready           - Readiness (store reachable)
//!
//! # Credentials (rate limited)
//! POST   /auth/signup            - Create password account
//! POST   /auth/login             - Password login, sets session cookie
//!
//! # Session
//! POST   /auth/logout            - Clear session cookie
//! GET    /auth/google            - Redirect to Google
//! GET    /auth/google/callback   - Google callback, sets session cookie
//!
//! # Account (requires auth)
//! GET    /auth/me                - Current account
//! GET    /auth/profile           - Full profile
//! PUT    /auth/profile           - Update profile
//! POST   /auth/profile/image     - Upload profile image
//! PUT    /auth/role              - Change own role
//! DELETE /auth/account           - Delete own account
//! GET    /auth/accounts          - Account directory (admin)
//!
//! # Assets
//! GET    /assets/{file}          - Uploaded images
//! ```

pub mod account;
pub mod auth;
pub mod google;

use axum::{
    Router,
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    middleware,
    routing::{delete, get, post, put},
};
use serde::Serialize;
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::middleware::{auth_rate_limiter, request_id_middleware};
use crate::services::assets::MAX_IMAGE_BYTES;
use crate::state::AppState;

/// `{ "message": ... }` response body.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    #[must_use]
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_owned(),
        }
    }
}

/// `{ "message": ..., "user": ... }` response body.
#[derive(Debug, Serialize)]
pub struct AccountResponse<V> {
    pub message: String,
    pub user: V,
}

impl<V> AccountResponse<V> {
    #[must_use]
    pub fn new(message: &str, user: V) -> Self {
        Self {
            message: message.to_owned(),
            user,
        }
    }
}

/// Create the `/auth` routes router.
pub fn auth_routes() -> Router<AppState> {
    let credentials = Router::new()
        .route("/signup", post(auth::signup))
        .route("/login", post(auth::login))
        .layer(auth_rate_limiter());

    Router::new()
        .merge(credentials)
        .route("/logout", post(auth::logout))
        .route("/google", get(google::login))
        .route("/google/callback", get(google::callback))
        .route("/me", get(account::me))
        .route(
            "/profile",
            get(account::profile).put(account::update_profile),
        )
        .route(
            "/profile/image",
            post(account::upload_profile_image)
                .layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES + 64 * 1024)),
        )
        .route("/role", put(account::update_role))
        .route("/account", delete(account::delete_account))
        .route("/accounts", get(account::directory))
}

/// Build the full application router.
pub fn router(state: AppState) -> Router {
    let assets = ServeDir::new(&state.config().asset_dir);

    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/auth", auth_routes())
        .nest_service("/assets", assets)
        .layer(middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = tracing::field::Empty,
                )
            }),
        )
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the account store is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.accounts().ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
