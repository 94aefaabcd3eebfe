//! Federated identity reconciliation.
//!
//! Maps a provider-verified profile onto exactly one local account, creating
//! it on first sight and linking the provider ID to an existing password
//! account without touching anything the owner already set.

use chrono::{DateTime, Utc};

use bazaar_core::Email;

use super::AuthError;
use crate::db::{AccountStore, FEDERATED_ID_CONFLICT, RepositoryError};
use crate::models::{Account, AccountUpdate, NewAccount};

/// Profile asserted by an identity provider. Trusted as already verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FederatedProfile {
    pub email: String,
    pub name: String,
    /// Provider subject ID.
    pub federated_id: String,
    pub profile_picture: Option<String>,
}

/// Find or create the account for a provider profile and record the login.
///
/// Repeated calls with the same profile converge on the same linked account.
///
/// # Errors
///
/// Returns `AuthError::Validation` if the provider email cannot be parsed,
/// `AuthError::Conflict` if the provider ID is already linked to a different
/// email, and `AuthError::Internal` on store failure.
pub async fn reconcile(
    store: &dyn AccountStore,
    profile: FederatedProfile,
    now: DateTime<Utc>,
) -> Result<Account, AuthError> {
    let email = Email::parse(&profile.email)?;
    let picture = profile
        .profile_picture
        .filter(|url| !url.trim().is_empty());

    if let Some(existing) = store.find_by_email(&email).await? {
        return link(store, existing, profile.federated_id, picture, now).await;
    }

    let name = if profile.name.trim().is_empty() {
        email.local_part().to_owned()
    } else {
        profile.name.trim().to_owned()
    };

    let new_account = NewAccount::federated(
        email.clone(),
        name,
        profile.federated_id.clone(),
        picture.clone(),
        now,
    );

    match store.create(new_account).await {
        Ok(account) => {
            tracing::info!(account_id = %account.id, "Created account from federated login");
            Ok(account)
        }
        // Lost a race with a concurrent first login for the same email.
        Err(RepositoryError::Conflict(_)) => match store.find_by_email(&email).await? {
            Some(existing) => link(store, existing, profile.federated_id, picture, now).await,
            None => Err(AuthError::Conflict(FEDERATED_ID_CONFLICT.to_owned())),
        },
        Err(e) => Err(e.into()),
    }
}

/// Link and touch an existing account.
async fn link(
    store: &dyn AccountStore,
    existing: Account,
    federated_id: String,
    picture: Option<String>,
    now: DateTime<Utc>,
) -> Result<Account, AuthError> {
    let mut update = AccountUpdate::login_at(now);

    if existing.federated_id.is_none() {
        let has_picture = existing
            .profile_picture
            .as_deref()
            .is_some_and(|p| !p.is_empty());

        update.federated_id = Some(federated_id);
        update.is_verified = Some(true);
        if !has_picture {
            update.profile_picture = picture;
        }
        tracing::info!(account_id = %existing.id, "Linked federated identity to account");
    }

    store
        .update(existing.id, update)
        .await?
        .ok_or(AuthError::NotFound)
}
