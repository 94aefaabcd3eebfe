//! Google OAuth 2.0 client.
//!
//! # Flow
//!
//! 1. Redirect the browser to [`GoogleClient::authorization_url`]
//! 2. Google redirects back to `/auth/google/callback` with `code` and `state`
//! 3. [`GoogleClient::exchange_code`] trades the code for an access token
//! 4. [`GoogleClient::fetch_profile`] reads the verified user info

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::OAuthError;
use crate::config::GoogleConfig;
use crate::services::auth::FederatedProfile;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// `OpenID` Connect user info.
#[derive(Debug, Deserialize)]
struct UserInfo {
    sub: String,
    email: Option<String>,
    email_verified: Option<bool>,
    name: Option<String>,
    picture: Option<String>,
}

impl TryFrom<UserInfo> for FederatedProfile {
    type Error = OAuthError;

    fn try_from(info: UserInfo) -> Result<Self, Self::Error> {
        let email = info
            .email
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| OAuthError::Profile("no email in user info".to_string()))?;

        if info.email_verified == Some(false) {
            return Err(OAuthError::Profile("email not verified".to_string()));
        }

        Ok(Self {
            email,
            name: info.name.unwrap_or_default(),
            federated_id: info.sub,
            profile_picture: info.picture,
        })
    }
}

/// Client for Google sign-in.
#[derive(Clone)]
pub struct GoogleClient {
    inner: Arc<GoogleClientInner>,
}

struct GoogleClientInner {
    client: reqwest::Client,
    client_id: String,
    client_secret: SecretString,
    authorize_url: String,
    token_url: String,
    userinfo_url: String,
}

impl GoogleClient {
    /// Create a new Google OAuth client.
    #[must_use]
    pub fn new(config: &GoogleConfig) -> Self {
        Self {
            inner: Arc::new(GoogleClientInner {
                client: reqwest::Client::new(),
                client_id: config.client_id.clone(),
                client_secret: config.client_secret.clone(),
                authorize_url: config.authorize_url.clone(),
                token_url: config.token_url.clone(),
                userinfo_url: config.userinfo_url.clone(),
            }),
        }
    }

    /// Build the consent screen URL.
    ///
    /// `state` must also be stored client-side and compared on callback.
    #[must_use]
    pub fn authorization_url(&self, redirect_uri: &str, state: &str) -> String {
        format!(
            "{}?\
            client_id={}&\
            response_type=code&\
            redirect_uri={}&\
            scope=openid%20email%20profile&\
            state={}",
            self.inner.authorize_url,
            urlencoding::encode(&self.inner.client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(state)
        )
    }

    /// Exchange an authorization code for an access token.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or Google rejects the code.
    pub async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<String, OAuthError> {
        let params = [
            ("grant_type", "authorization_code"),
            ("client_id", self.inner.client_id.as_str()),
            ("client_secret", self.inner.client_secret.expose_secret()),
            ("code", code),
            ("redirect_uri", redirect_uri),
        ];

        let response = self.inner.client.post(&self.inner.token_url).form(&params).send().await?;

        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(OAuthError::Provider(format!(
                "Token exchange failed: {text}"
            )));
        }

        let token: TokenResponse = response.json().await?;
        Ok(token.access_token)
    }

    /// Fetch the signed-in user's profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, or the profile has no verified
    /// email.
    pub async fn fetch_profile(&self, access_token: &str) -> Result<FederatedProfile, OAuthError> {
        let response = self
            .inner
            .client
            .get(&self.inner.userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(OAuthError::Provider(format!(
                "User info request failed: {text}"
            )));
        }

        let info: UserInfo = response.json().await?;
        info.try_into()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client() -> GoogleClient {
        GoogleClient::new(&GoogleConfig::new("client id", SecretString::from("shh")))
    }

    #[test]
    fn test_authorization_url_encodes_parameters() {
        let url = client().authorization_url("https://id.test/auth/google/callback", "abc123");

        assert!(url.starts_with("https://accounts.google.com/o/oauth2/v2/auth?"));
        assert!(url.contains("client_id=client%20id"));
        assert!(url.contains("redirect_uri=https%3A%2F%2Fid.test%2Fauth%2Fgoogle%2Fcallback"));
        assert!(url.contains("state=abc123"));
        assert!(url.contains("scope=openid%20email%20profile"));
        assert!(!url.contains("shh"));
    }

    #[test]
    fn test_user_info_maps_to_profile() {
        let info: UserInfo = serde_json::from_str(
            r#"{"sub":"1089","email":"Ann@Example.com","email_verified":true,
                "name":"Ann Lee","picture":"https://lh3.test/a.jpg"}"#,
        )
        .unwrap();

        let profile = FederatedProfile::try_from(info).unwrap();
        assert_eq!(profile.federated_id, "1089");
        assert_eq!(profile.email, "Ann@Example.com");
        assert_eq!(profile.name, "Ann Lee");
        assert_eq!(profile.profile_picture.as_deref(), Some("https://lh3.test/a.jpg"));
    }

    #[test]
    fn test_user_info_without_verified_email_is_rejected() {
        let missing: UserInfo = serde_json::from_str(r#"{"sub":"1"}"#).unwrap();
        assert!(matches!(
            FederatedProfile::try_from(missing),
            Err(OAuthError::Profile(_))
        ));

        let unverified: UserInfo =
            serde_json::from_str(r#"{"sub":"1","email":"a@b.test","email_verified":false}"#)
                .unwrap();
        assert!(matches!(
            FederatedProfile::try_from(unverified),
            Err(OAuthError::Profile(_))
        ));
    }
}
