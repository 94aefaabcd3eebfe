//! Account domain types and the JSON views handed to callers.

use chrono::{DateTime, Utc};
use serde::Serialize;

use bazaar_core::{AccountId, Email, Role};

/// A marketplace account (domain type).
///
/// Every account holds a password hash, a federated ID, or both.
#[derive(Clone, PartialEq, Eq)]
pub struct Account {
    pub id: AccountId,
    /// Normalized, unique.
    pub email: Email,
    pub name: String,
    /// PHC-format Argon2 hash. Never leaves the service layer.
    pub password_hash: Option<String>,
    /// Provider subject ID. Stable once set.
    pub federated_id: Option<String>,
    pub role: Role,
    pub is_verified: bool,
    pub profile_picture: Option<String>,
    pub bio: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl std::fmt::Debug for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Account")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("name", &self.name)
            .field(
                "password_hash",
                &self.password_hash.as_ref().map(|_| "[REDACTED]"),
            )
            .field("federated_id", &self.federated_id)
            .field("role", &self.role)
            .field("is_verified", &self.is_verified)
            .field("last_login", &self.last_login)
            .finish_non_exhaustive()
    }
}

impl Account {
    /// First word of the display name.
    #[must_use]
    pub fn first_name(&self) -> &str {
        self.name.split_once(' ').map_or(self.name.as_str(), |(first, _)| first)
    }

    /// Everything after the first word of the display name.
    #[must_use]
    pub fn last_name(&self) -> &str {
        self.name.split_once(' ').map_or("", |(_, rest)| rest)
    }
}

/// The credential a new account is created with.
#[derive(Clone, PartialEq, Eq)]
pub enum SignupCredential {
    /// Argon2 hash of the chosen password.
    Password(String),
    /// Subject ID asserted by the identity provider.
    Federated(String),
}

impl std::fmt::Debug for SignupCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Password(_) => f.write_str("Password([REDACTED])"),
            Self::Federated(id) => f.debug_tuple("Federated").field(id).finish(),
        }
    }
}

/// Data required to create an account.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: Email,
    pub name: String,
    pub credential: SignupCredential,
    pub role: Role,
    pub is_verified: bool,
    pub profile_picture: Option<String>,
    pub last_login: Option<DateTime<Utc>>,
}

impl NewAccount {
    /// An unverified buyer signing up with a password.
    #[must_use]
    pub fn with_password(email: Email, name: String, password_hash: String) -> Self {
        Self {
            email,
            name,
            credential: SignupCredential::Password(password_hash),
            role: Role::default(),
            is_verified: false,
            profile_picture: None,
            last_login: None,
        }
    }

    /// A verified buyer created from a provider profile.
    #[must_use]
    pub fn federated(
        email: Email,
        name: String,
        federated_id: String,
        profile_picture: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            email,
            name,
            credential: SignupCredential::Federated(federated_id),
            role: Role::default(),
            is_verified: true,
            profile_picture,
            last_login: Some(now),
        }
    }

    /// The password hash, if this is a password signup.
    #[must_use]
    pub fn password_hash(&self) -> Option<&str> {
        match &self.credential {
            SignupCredential::Password(hash) => Some(hash),
            SignupCredential::Federated(_) => None,
        }
    }

    /// The federated ID, if this is a provider signup.
    #[must_use]
    pub fn federated_id(&self) -> Option<&str> {
        match &self.credential {
            SignupCredential::Password(_) => None,
            SignupCredential::Federated(id) => Some(id),
        }
    }
}

/// A partial update. `None` leaves the stored value untouched.
///
/// `federated_id` is only applied when the account has none yet.
#[derive(Debug, Clone, Default)]
pub struct AccountUpdate {
    pub name: Option<String>,
    pub email: Option<Email>,
    pub federated_id: Option<String>,
    pub role: Option<Role>,
    pub is_verified: Option<bool>,
    pub profile_picture: Option<String>,
    pub bio: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub last_login: Option<DateTime<Utc>>,
}

impl AccountUpdate {
    /// Record a successful login.
    #[must_use]
    pub fn login_at(now: DateTime<Utc>) -> Self {
        Self {
            last_login: Some(now),
            ..Self::default()
        }
    }

    /// Apply this update to an in-memory account.
    pub fn apply_to(self, account: &mut Account, now: DateTime<Utc>) {
        if let Some(name) = self.name {
            account.name = name;
        }
        if let Some(email) = self.email {
            account.email = email;
        }
        if account.federated_id.is_none() {
            account.federated_id = self.federated_id;
        }
        if let Some(role) = self.role {
            account.role = role;
        }
        if let Some(verified) = self.is_verified {
            account.is_verified = verified;
        }
        if let Some(picture) = self.profile_picture {
            account.profile_picture = Some(picture);
        }
        if let Some(bio) = self.bio {
            account.bio = Some(bio);
        }
        if let Some(phone) = self.phone {
            account.phone = Some(phone);
        }
        if let Some(location) = self.location {
            account.location = Some(location);
        }
        if let Some(at) = self.last_login {
            account.last_login = Some(at);
        }
        account.updated_at = now;
    }
}

// =============================================================================
// Views
// =============================================================================

/// Summary returned by signup, login and role changes.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountView {
    pub id: AccountId,
    pub name: String,
    pub email: Email,
    pub role: Role,
    pub is_verified: bool,
    pub profile_picture: Option<String>,
    pub last_login: Option<DateTime<Utc>>,
}

impl From<&Account> for AccountView {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            name: account.name.clone(),
            email: account.email.clone(),
            role: account.role,
            is_verified: account.is_verified,
            profile_picture: account.profile_picture.clone(),
            last_login: account.last_login,
        }
    }
}

/// Full profile of the signed-in account.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    pub id: AccountId,
    pub name: String,
    pub email: Email,
    pub role: Role,
    pub federated_id: Option<String>,
    pub is_verified: bool,
    pub profile_picture: Option<String>,
    pub bio: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Account> for ProfileView {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            name: account.name.clone(),
            email: account.email.clone(),
            role: account.role,
            federated_id: account.federated_id.clone(),
            is_verified: account.is_verified,
            profile_picture: account.profile_picture.clone(),
            bio: account.bio.clone(),
            phone: account.phone.clone(),
            location: account.location.clone(),
            last_login: account.last_login,
            created_at: account.created_at,
            updated_at: account.updated_at,
        }
    }
}

/// Frontend-shaped view of the signed-in account.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentAccountView {
    pub id: AccountId,
    pub name: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Email,
    /// Alias of `profile_picture`.
    pub photo: Option<String>,
    pub profile_picture: Option<String>,
    pub role: Role,
    pub is_verified: bool,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub bio: Option<String>,
}

impl From<&Account> for CurrentAccountView {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            name: account.name.clone(),
            first_name: account.first_name().to_string(),
            last_name: account.last_name().to_string(),
            email: account.email.clone(),
            photo: account.profile_picture.clone(),
            profile_picture: account.profile_picture.clone(),
            role: account.role,
            is_verified: account.is_verified,
            phone: account.phone.clone(),
            location: account.location.clone(),
            bio: account.bio.clone(),
        }
    }
}

/// One row of the admin account directory.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryEntry {
    pub name: String,
    pub email: Email,
    pub role: Role,
    pub last_login: Option<DateTime<Utc>>,
    pub is_verified: bool,
}

impl From<&Account> for DirectoryEntry {
    fn from(account: &Account) -> Self {
        Self {
            name: account.name.clone(),
            email: account.email.clone(),
            role: account.role,
            last_login: account.last_login,
            is_verified: account.is_verified,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample_account() -> Account {
        let now = Utc::now();
        Account {
            id: AccountId::new(1),
            email: Email::parse("ann@example.com").unwrap(),
            name: "Ann Marie Lee".to_string(),
            password_hash: Some("$argon2id$v=19$stub".to_string()),
            federated_id: None,
            role: Role::Buyer,
            is_verified: false,
            profile_picture: Some("https://img.test/ann.png".to_string()),
            bio: None,
            phone: None,
            location: None,
            last_login: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_name_split() {
        let account = sample_account();
        assert_eq!(account.first_name(), "Ann");
        assert_eq!(account.last_name(), "Marie Lee");

        let single = Account {
            name: "Cher".to_string(),
            ..sample_account()
        };
        assert_eq!(single.first_name(), "Cher");
        assert_eq!(single.last_name(), "");
    }

    #[test]
    fn test_views_never_contain_password_hash() {
        let account = sample_account();

        let views = [
            serde_json::to_string(&AccountView::from(&account)).unwrap(),
            serde_json::to_string(&ProfileView::from(&account)).unwrap(),
            serde_json::to_string(&CurrentAccountView::from(&account)).unwrap(),
            serde_json::to_string(&DirectoryEntry::from(&account)).unwrap(),
        ];
        for json in views {
            assert!(!json.contains("argon2"), "leaked hash in {json}");
            assert!(!json.contains("password"), "leaked field in {json}");
        }

        assert!(!format!("{account:?}").contains("argon2"));
    }

    #[test]
    fn test_current_view_aliases_photo() {
        let view = CurrentAccountView::from(&sample_account());
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["photo"], json["profilePicture"]);
        assert_eq!(json["firstName"], "Ann");
        assert_eq!(json["lastName"], "Marie Lee");
        assert_eq!(json["role"], "buyer");
    }

    #[test]
    fn test_update_never_replaces_federated_id() {
        let mut account = sample_account();
        let now = Utc::now();

        AccountUpdate {
            federated_id: Some("google-1".to_string()),
            ..AccountUpdate::default()
        }
        .apply_to(&mut account, now);
        assert_eq!(account.federated_id.as_deref(), Some("google-1"));

        AccountUpdate {
            federated_id: Some("google-2".to_string()),
            bio: Some(String::new()),
            ..AccountUpdate::default()
        }
        .apply_to(&mut account, now);
        assert_eq!(account.federated_id.as_deref(), Some("google-1"));
        assert_eq!(account.bio.as_deref(), Some(""));
    }

    #[test]
    fn test_new_account_credentials() {
        let email = Email::parse("bo@example.com").unwrap();
        let password = NewAccount::with_password(email.clone(), "Bo".into(), "hash".into());
        assert_eq!(password.password_hash(), Some("hash"));
        assert!(password.federated_id().is_none());
        assert!(!password.is_verified);

        let federated = NewAccount::federated(email, "Bo".into(), "g-9".into(), None, Utc::now());
        assert_eq!(federated.federated_id(), Some("g-9"));
        assert!(federated.password_hash().is_none());
        assert!(federated.is_verified);
        assert!(federated.last_login.is_some());
        assert!(!format!("{password:?}").contains("hash\""));
    }
}
