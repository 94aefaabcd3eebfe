//! In-process account store.
//!
//! Enforces the same uniqueness rules as the `accounts` table under a single
//! lock, so service and HTTP tests exercise real conflict behavior.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use bazaar_core::{AccountId, Email};

use super::{AccountStore, EMAIL_CONFLICT, FEDERATED_ID_CONFLICT, RepositoryError};
use crate::models::{Account, AccountUpdate, NewAccount};

#[derive(Default)]
struct Inner {
    next_id: i64,
    accounts: BTreeMap<AccountId, Account>,
}

impl Inner {
    fn email_taken(&self, email: &Email, except: Option<AccountId>) -> bool {
        self.accounts
            .values()
            .any(|a| &a.email == email && Some(a.id) != except)
    }

    fn federated_id_taken(&self, federated_id: &str, except: Option<AccountId>) -> bool {
        self.accounts
            .values()
            .any(|a| a.federated_id.as_deref() == Some(federated_id) && Some(a.id) != except)
    }
}

/// Account store held in memory.
#[derive(Default)]
pub struct MemoryAccountStore {
    inner: RwLock<Inner>,
}

impl MemoryAccountStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn find_by_email(&self, email: &Email) -> Result<Option<Account>, RepositoryError> {
        let inner = self.inner.read().await;
        Ok(inner.accounts.values().find(|a| &a.email == email).cloned())
    }

    async fn find_by_id(&self, id: AccountId) -> Result<Option<Account>, RepositoryError> {
        Ok(self.inner.read().await.accounts.get(&id).cloned())
    }

    async fn create(&self, account: NewAccount) -> Result<Account, RepositoryError> {
        let mut inner = self.inner.write().await;

        if inner.email_taken(&account.email, None) {
            return Err(RepositoryError::Conflict(EMAIL_CONFLICT.to_owned()));
        }
        if let Some(federated_id) = account.federated_id()
            && inner.federated_id_taken(federated_id, None)
        {
            return Err(RepositoryError::Conflict(FEDERATED_ID_CONFLICT.to_owned()));
        }

        inner.next_id += 1;
        let id = AccountId::new(inner.next_id);
        let now = Utc::now();
        let record = Account {
            id,
            password_hash: account.password_hash().map(str::to_owned),
            federated_id: account.federated_id().map(str::to_owned),
            email: account.email,
            name: account.name,
            role: account.role,
            is_verified: account.is_verified,
            profile_picture: account.profile_picture,
            bio: None,
            phone: None,
            location: None,
            last_login: account.last_login,
            created_at: now,
            updated_at: now,
        };
        inner.accounts.insert(id, record.clone());
        Ok(record)
    }

    async fn update(
        &self,
        id: AccountId,
        update: AccountUpdate,
    ) -> Result<Option<Account>, RepositoryError> {
        let mut inner = self.inner.write().await;

        if !inner.accounts.contains_key(&id) {
            return Ok(None);
        }
        if let Some(email) = &update.email
            && inner.email_taken(email, Some(id))
        {
            return Err(RepositoryError::Conflict(EMAIL_CONFLICT.to_owned()));
        }
        if let Some(federated_id) = &update.federated_id
            && inner.federated_id_taken(federated_id, Some(id))
        {
            return Err(RepositoryError::Conflict(FEDERATED_ID_CONFLICT.to_owned()));
        }

        let Some(account) = inner.accounts.get_mut(&id) else {
            return Ok(None);
        };
        update.apply_to(account, Utc::now());
        Ok(Some(account.clone()))
    }

    async fn delete(&self, id: AccountId) -> Result<Option<Account>, RepositoryError> {
        Ok(self.inner.write().await.accounts.remove(&id))
    }

    async fn list(&self) -> Result<Vec<Account>, RepositoryError> {
        Ok(self.inner.read().await.accounts.values().cloned().collect())
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}
