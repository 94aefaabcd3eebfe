//! `PostgreSQL` account store.
//!
//! Queries are checked at runtime rather than with `sqlx::query!`, so the
//! crate builds without a live database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use bazaar_core::{AccountId, Email, Role};

use super::{AccountStore, EMAIL_CONFLICT, FEDERATED_ID_CONFLICT, RepositoryError};
use crate::models::{Account, AccountUpdate, NewAccount};

macro_rules! account_columns {
    () => {
        "id, email, name, password_hash, federated_id, role, is_verified, \
         profile_picture, bio, phone, location, last_login, created_at, updated_at"
    };
}

const SELECT_BY_EMAIL: &str = concat!(
    "SELECT ",
    account_columns!(),
    " FROM accounts WHERE email = $1"
);

const SELECT_BY_ID: &str = concat!("SELECT ", account_columns!(), " FROM accounts WHERE id = $1");

const SELECT_ALL: &str = concat!(
    "SELECT ",
    account_columns!(),
    " FROM accounts ORDER BY created_at, id"
);

const INSERT: &str = concat!(
    "INSERT INTO accounts \
     (email, name, password_hash, federated_id, role, is_verified, profile_picture, last_login) \
     VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
     RETURNING ",
    account_columns!()
);

// `federated_id` is only filled in when empty, never replaced.
const UPDATE: &str = concat!(
    "UPDATE accounts SET \
     name = COALESCE($2, name), \
     email = COALESCE($3, email), \
     federated_id = COALESCE(federated_id, $4), \
     role = COALESCE($5, role), \
     is_verified = COALESCE($6, is_verified), \
     profile_picture = COALESCE($7, profile_picture), \
     bio = COALESCE($8, bio), \
     phone = COALESCE($9, phone), \
     location = COALESCE($10, location), \
     last_login = COALESCE($11, last_login) \
     WHERE id = $1 \
     RETURNING ",
    account_columns!()
);

const DELETE: &str = concat!(
    "DELETE FROM accounts WHERE id = $1 RETURNING ",
    account_columns!()
);

/// Raw `accounts` row.
#[derive(sqlx::FromRow)]
struct AccountRow {
    id: i64,
    email: String,
    name: String,
    password_hash: Option<String>,
    federated_id: Option<String>,
    role: String,
    is_verified: bool,
    profile_picture: Option<String>,
    bio: Option<String>,
    phone: Option<String>,
    location: Option<String>,
    last_login: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<AccountRow> for Account {
    type Error = RepositoryError;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;
        let role = row.role.parse::<Role>().map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid role in database: {e}"))
        })?;

        if row.password_hash.is_none() && row.federated_id.is_none() {
            return Err(RepositoryError::DataCorruption(format!(
                "account {} has neither password nor federated id",
                row.id
            )));
        }

        Ok(Self {
            id: AccountId::new(row.id),
            email,
            name: row.name,
            password_hash: row.password_hash,
            federated_id: row.federated_id,
            role,
            is_verified: row.is_verified,
            profile_picture: row.profile_picture,
            bio: row.bio,
            phone: row.phone,
            location: row.location,
            last_login: row.last_login,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Map unique violations to `Conflict`, naming the clashing column.
fn map_write_error(e: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        let message = match db_err.constraint() {
            Some("accounts_federated_id_key") => FEDERATED_ID_CONFLICT,
            _ => EMAIL_CONFLICT,
        };
        return RepositoryError::Conflict(message.to_owned());
    }
    RepositoryError::Database(e)
}

fn into_account(row: Option<AccountRow>) -> Result<Option<Account>, RepositoryError> {
    row.map(Account::try_from).transpose()
}

/// Account store backed by `PostgreSQL`.
#[derive(Clone)]
pub struct PgAccountStore {
    pool: PgPool,
}

impl PgAccountStore {
    /// Create a new store over a connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn find_by_email(&self, email: &Email) -> Result<Option<Account>, RepositoryError> {
        let row = sqlx::query_as::<_, AccountRow>(SELECT_BY_EMAIL)
            .bind(email.as_str())
            .fetch_optional(&self.pool)
            .await?;
        into_account(row)
    }

    async fn find_by_id(&self, id: AccountId) -> Result<Option<Account>, RepositoryError> {
        let row = sqlx::query_as::<_, AccountRow>(SELECT_BY_ID)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        into_account(row)
    }

    async fn create(&self, account: NewAccount) -> Result<Account, RepositoryError> {
        let row = sqlx::query_as::<_, AccountRow>(INSERT)
            .bind(account.email.as_str())
            .bind(&account.name)
            .bind(account.password_hash())
            .bind(account.federated_id())
            .bind(account.role.as_str())
            .bind(account.is_verified)
            .bind(account.profile_picture.as_deref())
            .bind(account.last_login)
            .fetch_one(&self.pool)
            .await
            .map_err(map_write_error)?;

        Account::try_from(row)
    }

    async fn update(
        &self,
        id: AccountId,
        update: AccountUpdate,
    ) -> Result<Option<Account>, RepositoryError> {
        let row = sqlx::query_as::<_, AccountRow>(UPDATE)
            .bind(id)
            .bind(update.name)
            .bind(update.email.map(Email::into_inner))
            .bind(update.federated_id)
            .bind(update.role.map(Role::as_str))
            .bind(update.is_verified)
            .bind(update.profile_picture)
            .bind(update.bio)
            .bind(update.phone)
            .bind(update.location)
            .bind(update.last_login)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_write_error)?;

        into_account(row)
    }

    async fn delete(&self, id: AccountId) -> Result<Option<Account>, RepositoryError> {
        let row = sqlx::query_as::<_, AccountRow>(DELETE)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        into_account(row)
    }

    async fn list(&self) -> Result<Vec<Account>, RepositoryError> {
        sqlx::query_as::<_, AccountRow>(SELECT_ALL)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Account::try_from)
            .collect()
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
