//! Authentication service.
//!
//! Provides password signup and login, federated login, and the account
//! operations available to an authenticated caller. Token issuance and cookie
//! transport happen in the route layer once an operation here succeeds.

mod error;
pub mod federated;
pub mod password;
pub mod token;

pub use error::AuthError;
pub use federated::FederatedProfile;
pub use password::{PasswordError, PasswordVerifier};
pub use token::{Claims, TokenError, TokenIssuer};

use chrono::Utc;

use bazaar_core::{AccountId, Email, Role};

use crate::db::{AccountStore, EMAIL_CONFLICT};
use crate::models::{Account, AccountUpdate, NewAccount};

/// Minimum password length, in characters.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Signup request data.
#[derive(Debug, Clone)]
pub struct Signup {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Changes a caller may make to their own profile. `None` leaves a field as is.
#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub profile_picture: Option<String>,
    pub bio: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
}

/// Authentication service.
///
/// Borrows the account store and password verifier from application state
/// for the duration of one request.
pub struct AuthService<'a> {
    accounts: &'a dyn AccountStore,
    passwords: &'a PasswordVerifier,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(accounts: &'a dyn AccountStore, passwords: &'a PasswordVerifier) -> Self {
        Self {
            accounts,
            passwords,
        }
    }

    // =========================================================================
    // Password Authentication
    // =========================================================================

    /// Create an account with a password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Validation` for a blank name, an invalid email, or a
    /// short password, and `AuthError::Conflict` if the normalized email is
    /// already registered.
    pub async fn signup(&self, input: Signup) -> Result<Account, AuthError> {
        let name = validate_name(&input.name)?;
        let email = Email::parse(&input.email)?;
        validate_password(&input.password)?;

        // Fast path; the unique index on `email` is what actually decides.
        if self.accounts.find_by_email(&email).await?.is_some() {
            return Err(conflict_email());
        }

        let password_hash = self
            .passwords
            .hash(&input.password)
            .await
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        let account = self
            .accounts
            .create(NewAccount::with_password(email, name, password_hash))
            .await?;

        tracing::info!(account_id = %account.id, "Account created");
        Ok(account)
    }

    /// Log in with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` for an unknown or malformed
    /// email, a wrong password, or an account without a password.
    pub async fn login(&self, email: &str, password: &str) -> Result<Account, AuthError> {
        let account = match Email::parse(email) {
            Ok(email) => self.accounts.find_by_email(&email).await?,
            Err(_) => None,
        };

        // Verify even without an account so every failure costs one Argon2 check.
        let matched = self
            .passwords
            .verify(
                password,
                account.as_ref().and_then(|a| a.password_hash.as_deref()),
            )
            .await;

        let Some(account) = account else {
            tracing::warn!("Login failed: unknown email");
            return Err(AuthError::InvalidCredentials);
        };
        if !matched {
            tracing::warn!(account_id = %account.id, "Login failed: password mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        self.accounts
            .update(account.id, AccountUpdate::login_at(Utc::now()))
            .await?
            .ok_or(AuthError::InvalidCredentials)
    }

    // =========================================================================
    // Federated Authentication
    // =========================================================================

    /// Log in with a provider-verified profile, creating or linking the account.
    ///
    /// # Errors
    ///
    /// See [`federated::reconcile`].
    pub async fn federated_login(&self, profile: FederatedProfile) -> Result<Account, AuthError> {
        federated::reconcile(self.accounts, profile, Utc::now()).await
    }

    // =========================================================================
    // Current Account
    // =========================================================================

    /// Re-fetch the account a verified token refers to.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Unauthenticated` if the account no longer exists.
    pub async fn resolve_current_account(&self, id: AccountId) -> Result<Account, AuthError> {
        self.accounts
            .find_by_id(id)
            .await?
            .ok_or(AuthError::Unauthenticated)
    }

    /// Update the caller's own profile.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Validation` for a blank name or invalid email,
    /// `AuthError::Conflict` if the new email belongs to another account, and
    /// `AuthError::NotFound` if the account was deleted meanwhile.
    pub async fn update_profile(
        &self,
        account: &Account,
        changes: ProfileChanges,
    ) -> Result<Account, AuthError> {
        let name = changes.name.as_deref().map(validate_name).transpose()?;
        let email = changes.email.as_deref().map(Email::parse).transpose()?;

        if let Some(email) = &email
            && *email != account.email
            && let Some(other) = self.accounts.find_by_email(email).await?
            && other.id != account.id
        {
            return Err(conflict_email());
        }

        let update = AccountUpdate {
            name,
            email,
            profile_picture: changes.profile_picture,
            bio: changes.bio,
            phone: changes.phone,
            location: changes.location,
            ..AccountUpdate::default()
        };

        self.accounts
            .update(account.id, update)
            .await?
            .ok_or(AuthError::NotFound)
    }

    /// Change the caller's own role.
    ///
    /// `buyer` and `seller` are self-service. `admin` is only granted to a
    /// caller who is already an admin.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Validation` for an unknown role and
    /// `AuthError::Forbidden` for a non-admin requesting `admin`.
    pub async fn update_role(&self, account: &Account, role: &str) -> Result<Account, AuthError> {
        let role: Role = role.parse()?;

        if role.is_admin() && !account.role.is_admin() {
            tracing::warn!(account_id = %account.id, "Refused self-promotion to admin");
            return Err(AuthError::Forbidden(
                "only an admin can grant the admin role".to_owned(),
            ));
        }

        let update = AccountUpdate {
            role: Some(role),
            ..AccountUpdate::default()
        };
        self.accounts
            .update(account.id, update)
            .await?
            .ok_or(AuthError::NotFound)
    }

    /// Assign a role by email, bypassing the admin check.
    ///
    /// Used by the operator CLI to bootstrap the first admin.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::NotFound` if no account has this email.
    pub async fn assign_role(&self, email: &str, role: Role) -> Result<Account, AuthError> {
        let email = Email::parse(email)?;
        let account = self
            .accounts
            .find_by_email(&email)
            .await?
            .ok_or(AuthError::NotFound)?;

        let update = AccountUpdate {
            role: Some(role),
            ..AccountUpdate::default()
        };
        self.accounts
            .update(account.id, update)
            .await?
            .ok_or(AuthError::NotFound)
    }

    /// Store a new profile picture URL.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::NotFound` if the account was deleted meanwhile.
    pub async fn update_profile_image(
        &self,
        account: &Account,
        url: String,
    ) -> Result<Account, AuthError> {
        let update = AccountUpdate {
            profile_picture: Some(url),
            ..AccountUpdate::default()
        };
        self.accounts
            .update(account.id, update)
            .await?
            .ok_or(AuthError::NotFound)
    }

    /// Delete the caller's own account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::NotFound` if the account is already gone.
    pub async fn delete_account(&self, account: &Account) -> Result<Account, AuthError> {
        let deleted = self
            .accounts
            .delete(account.id)
            .await?
            .ok_or(AuthError::NotFound)?;
        tracing::info!(account_id = %deleted.id, "Account deleted by owner");
        Ok(deleted)
    }

    /// List every account. Admin only.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Forbidden` unless the caller is an admin.
    pub async fn list_accounts(&self, caller: &Account) -> Result<Vec<Account>, AuthError> {
        if !caller.role.is_admin() {
            return Err(AuthError::Forbidden(
                "the account directory is restricted to admins".to_owned(),
            ));
        }
        Ok(self.accounts.list().await?)
    }
}

fn conflict_email() -> AuthError {
    AuthError::Conflict(EMAIL_CONFLICT.to_owned())
}

fn validate_name(name: &str) -> Result<String, AuthError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AuthError::Validation("name is required".to_owned()));
    }
    Ok(name.to_owned())
}

fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}
