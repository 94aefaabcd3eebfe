//! Account management commands.
//!
//! # Usage
//!
//! ```bash
//! # Bootstrap the first admin
//! bazaar account set-role -e owner@example.com -r admin
//! ```
//!
//! The HTTP API only lets an existing admin grant `admin`, so the first one is
//! created here.

use thiserror::Error;

use bazaar_core::{Role, RoleError};
use bazaar_identity::config::PasswordConfig;
use bazaar_identity::db::{PgAccountStore, create_pool};
use bazaar_identity::services::auth::{AuthError, AuthService, PasswordError, PasswordVerifier};

/// Errors that can occur during account operations.
#[derive(Debug, Error)]
pub enum AccountError {
    #[error("Missing environment variable: IDENTITY_DATABASE_URL or DATABASE_URL")]
    MissingDatabaseUrl,

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{0}")]
    InvalidRole(#[from] RoleError),

    #[error("No account with email: {0}")]
    NotFound(String),

    #[error("{0}")]
    Auth(AuthError),

    #[error("{0}")]
    Password(#[from] PasswordError),
}

/// Set an account's role by email.
///
/// # Errors
///
/// Returns an error if the role is unknown, the database is unreachable, or
/// no account has this email.
pub async fn set_role(email: &str, role: &str) -> Result<(), AccountError> {
    let role: Role = role.parse()?;
    let database_url = super::database_url().ok_or(AccountError::MissingDatabaseUrl)?;

    tracing::info!("Connecting to identity database...");
    let pool = create_pool(&database_url).await?;
    let store = PgAccountStore::new(pool);

    // Hashing is never exercised here; default cost is fine.
    let passwords = PasswordVerifier::new(&PasswordConfig::default())?;
    let service = AuthService::new(&store, &passwords);

    let account = service.assign_role(email, role).await.map_err(|e| match e {
        AuthError::NotFound => AccountError::NotFound(email.to_owned()),
        other => AccountError::Auth(other),
    })?;

    tracing::info!(
        account_id = %account.id,
        email = %account.email,
        role = %account.role,
        "Role assigned"
    );
    Ok(())
}
