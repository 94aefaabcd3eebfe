//! Credential store for identity `PostgreSQL` and in-process use.
//!
//! # Tables
//!
//! - `accounts` - One row per account; unique `email` and `federated_id`,
//!   check constraints on `role` and on holding at least one credential
//!
//! # Implementations
//!
//! - [`PgAccountStore`] - Production store over a `sqlx` pool
//! - [`MemoryAccountStore`] - Single-lock map for tests and local development
//!
//! # Migrations
//!
//! Migrations are stored in `crates/identity/migrations/` and run via:
//! ```bash
//! cargo run -p bazaar-cli -- migrate
//! ```

pub mod accounts;
pub mod memory;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use bazaar_core::{AccountId, Email};

use crate::models::{Account, AccountUpdate, NewAccount};

pub use accounts::PgAccountStore;
pub use memory::MemoryAccountStore;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Conflict message for a taken email, shared by the stores and the auth
/// service pre-check so callers see one response.
pub const EMAIL_CONFLICT: &str = "an account with this email already exists";

/// Conflict message for a provider identity linked to another account.
pub const FEDERATED_ID_CONFLICT: &str = "this provider identity is already linked to another account";

/// Durable record of every account.
///
/// Emails passed in are already normalized by [`Email::parse`]. Uniqueness of
/// `email` and `federated_id` is decided by the store and reported as
/// [`RepositoryError::Conflict`].
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find_by_email(&self, email: &Email) -> Result<Option<Account>, RepositoryError>;
    async fn find_by_id(&self, id: AccountId) -> Result<Option<Account>, RepositoryError>;
    async fn create(&self, account: NewAccount) -> Result<Account, RepositoryError>;

    /// Apply a partial update. Returns `None` if the account does not exist.
    async fn update(
        &self,
        id: AccountId,
        update: AccountUpdate,
    ) -> Result<Option<Account>, RepositoryError>;

    /// Remove an account. Returns the removed record, or `None` if absent.
    async fn delete(&self, id: AccountId) -> Result<Option<Account>, RepositoryError>;

    /// All accounts, oldest first.
    async fn list(&self) -> Result<Vec<Account>, RepositoryError>;

    /// Check that the backing store is reachable.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
