//! Federated login providers.
//!
//! Each provider client performs the OAuth 2.0 authorization code handshake
//! and turns the provider's user info into a [`FederatedProfile`], which the
//! auth service then reconciles with a local account.
//!
//! [`FederatedProfile`]: crate::services::auth::FederatedProfile

pub mod google;

pub use google::GoogleClient;

use rand::Rng;
use thiserror::Error;

/// Errors from an OAuth provider.
#[derive(Debug, Error)]
pub enum OAuthError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider rejected the request.
    #[error("OAuth error: {0}")]
    Provider(String),

    /// Provider user info is unusable (no email, unverified email).
    #[error("unusable profile: {0}")]
    Profile(String),
}

/// Generate a random alphanumeric string for the OAuth `state` parameter.
#[must_use]
pub fn generate_state() -> String {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::rng();
    (0..32)
        .map(|_| {
            let idx = rng.random_range(0..CHARSET.len());
            CHARSET.get(idx).map_or('x', |&b| char::from(b))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_state() {
        let a = generate_state();
        let b = generate_state();
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }
}
