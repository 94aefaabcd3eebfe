//! Signed-in account routes. Every handler here sits behind [`CurrentAccount`].

use axum::{
    Json,
    extract::{Multipart, State},
    http::header::SET_COOKIE,
    response::{AppendHeaders, IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use super::{AccountResponse, MessageResponse};
use crate::error::{AppError, Result, clear_sentry_user};
use crate::middleware::CurrentAccount;
use crate::models::{AccountView, CurrentAccountView, DirectoryEntry, ProfileView};
use crate::services::auth::{AuthError, ProfileChanges};
use crate::state::AppState;

/// Multipart field carrying the profile image.
const IMAGE_FIELD: &str = "image";

/// Profile update body. Absent fields are left unchanged.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub profile_picture: Option<String>,
    pub bio: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
}

impl From<UpdateProfileRequest> for ProfileChanges {
    fn from(body: UpdateProfileRequest) -> Self {
        Self {
            name: body.name,
            email: body.email,
            profile_picture: body.profile_picture,
            bio: body.bio,
            phone: body.phone,
            location: body.location,
        }
    }
}

/// Role change body.
#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    #[serde(default)]
    pub role: String,
}

#[derive(Debug, Serialize)]
pub struct CurrentAccountResponse {
    pub user: CurrentAccountView,
}

#[derive(Debug, Serialize)]
pub struct DirectoryResponse {
    pub message: String,
    pub users: Vec<DirectoryEntry>,
}

/// # Route
///
/// `GET /auth/me`
pub async fn me(current: CurrentAccount) -> Json<CurrentAccountResponse> {
    Json(CurrentAccountResponse {
        user: CurrentAccountView::from(current.account()),
    })
}

/// # Route
///
/// `GET /auth/profile`
pub async fn profile(current: CurrentAccount) -> Json<AccountResponse<ProfileView>> {
    Json(AccountResponse::new(
        "Profile fetched successfully",
        ProfileView::from(current.account()),
    ))
}

/// # Route
///
/// `PUT /auth/profile`
pub async fn update_profile(
    State(state): State<AppState>,
    current: CurrentAccount,
    Json(body): Json<UpdateProfileRequest>,
) -> Result<Json<AccountResponse<ProfileView>>> {
    let account = state
        .auth()
        .update_profile(current.account(), body.into())
        .await?;

    Ok(Json(AccountResponse::new(
        "Profile updated successfully",
        ProfileView::from(&account),
    )))
}

/// # Route
///
/// `PUT /auth/role`
pub async fn update_role(
    State(state): State<AppState>,
    current: CurrentAccount,
    Json(body): Json<UpdateRoleRequest>,
) -> Result<Json<AccountResponse<AccountView>>> {
    let account = state
        .auth()
        .update_role(current.account(), &body.role)
        .await?;

    tracing::info!(account_id = %account.id, role = %account.role, "Role updated");
    Ok(Json(AccountResponse::new(
        "Role updated successfully",
        AccountView::from(&account),
    )))
}

/// Upload a profile image from multipart field `image`.
///
/// # Route
///
/// `POST /auth/profile/image`
pub async fn upload_profile_image(
    State(state): State<AppState>,
    current: CurrentAccount,
    mut multipart: Multipart,
) -> Result<Json<AccountResponse<ProfileView>>> {
    let mut upload = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {e}")))?
    {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_owned();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {e}")))?;
        upload = Some((bytes.to_vec(), content_type));
        break;
    }

    let Some((bytes, content_type)) = upload else {
        return Err(AuthError::Validation("No image file uploaded".to_string()).into());
    };

    let url = state.assets().store(bytes, &content_type).await?;
    let account = state
        .auth()
        .update_profile_image(current.account(), url)
        .await?;

    Ok(Json(AccountResponse::new(
        "Profile image updated successfully",
        ProfileView::from(&account),
    )))
}

/// Delete the signed-in account and clear the session cookie.
///
/// # Route
///
/// `DELETE /auth/account`
pub async fn delete_account(
    State(state): State<AppState>,
    current: CurrentAccount,
) -> Result<Response> {
    state.auth().delete_account(current.account()).await?;
    let cleared = state.cookies().clear()?;
    clear_sentry_user();

    Ok((
        AppendHeaders(cleared.map(|value| (SET_COOKIE, value))),
        Json(MessageResponse::new("Account deleted successfully")),
    )
        .into_response())
}

/// Admin-only account directory.
///
/// # Route
///
/// `GET /auth/accounts`
pub async fn directory(
    State(state): State<AppState>,
    current: CurrentAccount,
) -> Result<Json<DirectoryResponse>> {
    let accounts = state.auth().list_accounts(current.account()).await?;
    tracing::debug!(
        account_id = %current.id(),
        role = %current.role(),
        count = accounts.len(),
        "Account directory listed"
    );

    Ok(Json(DirectoryResponse {
        message: "Accounts fetched successfully".to_string(),
        users: accounts.iter().map(DirectoryEntry::from).collect(),
    }))
}
