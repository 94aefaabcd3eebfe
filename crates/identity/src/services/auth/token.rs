//! Signed identity tokens (HS256 JWT).
//!
//! The signing secret is handed over once at construction and kept for the
//! lifetime of the process.

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
    errors::ErrorKind,
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use bazaar_core::{AccountId, Role};

use crate::models::Account;

/// Why a token could not be issued or was rejected.
#[derive(Debug, Error)]
pub enum TokenError {
    /// Well-formed and correctly signed, but past `exp`.
    #[error("token expired")]
    Expired,

    /// Not a decodable token, or required claims are missing.
    #[error("malformed token: {0}")]
    Malformed(String),

    /// Signature does not match this process's secret.
    #[error("bad token signature")]
    BadSignature,

    /// Encoding a new token failed.
    #[error("token signing failed: {0}")]
    Signing(String),
}

/// Token payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub id: AccountId,
    pub name: String,
    pub email: String,
    pub role: Role,
    /// Expiry, seconds since the Unix epoch.
    pub exp: i64,
    /// Issued at, seconds since the Unix epoch.
    pub iat: i64,
}

/// Issues and verifies identity tokens.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenIssuer {
    /// Create an issuer with the given secret and default token lifetime.
    #[must_use]
    pub fn new(secret: &SecretString, ttl: Duration) -> Self {
        let key = secret.expose_secret().as_bytes();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "iat"]);

        Self {
            encoding: EncodingKey::from_secret(key),
            decoding: DecodingKey::from_secret(key),
            validation,
            ttl,
        }
    }

    /// Default lifetime of issued tokens. Also the session cookie `Max-Age`.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a token for an account with the default lifetime.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Signing` if encoding fails.
    pub fn issue(&self, account: &Account) -> Result<String, TokenError> {
        self.issue_with_ttl(account, self.ttl)
    }

    /// Issue a token for an account that expires after `ttl`.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Signing` if encoding fails.
    pub fn issue_with_ttl(&self, account: &Account, ttl: Duration) -> Result<String, TokenError> {
        let iat = Utc::now().timestamp();
        let ttl_secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);

        let claims = Claims {
            id: account.id,
            name: account.name.clone(),
            email: account.email.as_str().to_owned(),
            role: account.role,
            exp: iat.saturating_add(ttl_secs),
            iat,
        };
        self.sign(&claims)
    }

    fn sign(&self, claims: &Claims) -> Result<String, TokenError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Verify a token's signature and expiry and return its claims.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Expired`, `TokenError::BadSignature`, or
    /// `TokenError::Malformed` for anything else that fails to decode.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                ErrorKind::InvalidSignature => TokenError::BadSignature,
                _ => TokenError::Malformed(e.to_string()),
            })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::models::account::tests::sample_account;

    fn issuer(secret: &str) -> TokenIssuer {
        TokenIssuer::new(&SecretString::from(secret), Duration::from_secs(3600))
    }

    #[test]
    fn test_issue_then_verify_returns_claims() {
        let tokens = issuer("kP9#vX2!mQ7@zR4$wT8&yL3*nB6^cF1%");
        let account = sample_account();

        let token = tokens.issue(&account).unwrap();
        let claims = tokens.verify(&token).unwrap();

        assert_eq!(claims.id, account.id);
        assert_eq!(claims.email, "ann@example.com");
        assert_eq!(claims.name, account.name);
        assert_eq!(claims.role, Role::Buyer);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let tokens = issuer("kP9#vX2!mQ7@zR4$wT8&yL3*nB6^cF1%");
        let now = Utc::now().timestamp();
        let claims = Claims {
            id: AccountId::new(1),
            name: "Ann".into(),
            email: "ann@example.com".into(),
            role: Role::Buyer,
            exp: now - 5,
            iat: now - 3605,
        };

        let token = tokens.sign(&claims).unwrap();
        assert!(matches!(tokens.verify(&token), Err(TokenError::Expired)));
    }

    #[test]
    fn test_foreign_signature_is_rejected() {
        let ours = issuer("kP9#vX2!mQ7@zR4$wT8&yL3*nB6^cF1%");
        let theirs = issuer("Zq4!Lm8#Rt2$Wx6&Np0*Hv5^Jb9%Kc3@");

        let token = theirs.issue(&sample_account()).unwrap();
        assert!(matches!(ours.verify(&token), Err(TokenError::BadSignature)));
    }

    #[test]
    fn test_tampered_payload_is_rejected() {
        let tokens = issuer("kP9#vX2!mQ7@zR4$wT8&yL3*nB6^cF1%");
        let buyer = tokens.issue(&sample_account()).unwrap();
        let admin = tokens
            .issue(&Account {
                role: Role::Admin,
                ..sample_account()
            })
            .unwrap();

        // Admin payload with the buyer token's signature.
        let buyer_parts: Vec<&str> = buyer.split('.').collect();
        let admin_parts: Vec<&str> = admin.split('.').collect();
        let forged = format!("{}.{}.{}", buyer_parts[0], admin_parts[1], buyer_parts[2]);

        assert!(matches!(tokens.verify(&forged), Err(TokenError::BadSignature)));
    }

    #[test]
    fn test_garbage_is_malformed() {
        let tokens = issuer("kP9#vX2!mQ7@zR4$wT8&yL3*nB6^cF1%");
        assert!(matches!(tokens.verify("not-a-token"), Err(TokenError::Malformed(_))));
        assert!(matches!(tokens.verify(""), Err(TokenError::Malformed(_))));
    }

    #[test]
    fn test_debug_hides_keys() {
        let debug = format!("{:?}", issuer("kP9#vX2!mQ7@zR4$wT8&yL3*nB6^cF1%"));
        assert!(!debug.contains("kP9"));
    }
}
