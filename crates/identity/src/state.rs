//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::IdentityConfig;
use crate::db::AccountStore;
use crate::middleware::SessionCookies;
use crate::oauth::GoogleClient;
use crate::services::auth::{AuthService, PasswordError};
use crate::services::{AssetStore, PasswordVerifier, TokenIssuer};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc`. The token secret, password
/// cost and cookie policy are fixed at construction.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: IdentityConfig,
    accounts: Arc<dyn AccountStore>,
    assets: Arc<dyn AssetStore>,
    passwords: PasswordVerifier,
    tokens: TokenIssuer,
    cookies: SessionCookies,
    google: Option<GoogleClient>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured Argon2 cost is invalid.
    pub fn new(
        config: IdentityConfig,
        accounts: Arc<dyn AccountStore>,
        assets: Arc<dyn AssetStore>,
    ) -> Result<Self, PasswordError> {
        let passwords = PasswordVerifier::new(&config.password)?;
        let tokens = TokenIssuer::new(&config.jwt_secret, config.token_ttl);
        let cookies = SessionCookies::new(&config.cookie, config.token_ttl);
        let google = config.google.as_ref().map(GoogleClient::new);

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                accounts,
                assets,
                passwords,
                tokens,
                cookies,
                google,
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &IdentityConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn accounts(&self) -> &dyn AccountStore {
        self.inner.accounts.as_ref()
    }

    #[must_use]
    pub fn assets(&self) -> &dyn AssetStore {
        self.inner.assets.as_ref()
    }

    #[must_use]
    pub fn tokens(&self) -> &TokenIssuer {
        &self.inner.tokens
    }

    #[must_use]
    pub fn cookies(&self) -> &SessionCookies {
        &self.inner.cookies
    }

    /// Google client, if federated login is configured.
    #[must_use]
    pub fn google(&self) -> Option<&GoogleClient> {
        self.inner.google.as_ref()
    }

    /// Auth service borrowing this state's store and password verifier.
    #[must_use]
    pub fn auth(&self) -> AuthService<'_> {
        AuthService::new(self.accounts(), &self.inner.passwords)
    }
}
