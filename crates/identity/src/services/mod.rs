//! Business logic services.

pub mod assets;
pub mod auth;

pub use assets::{AssetError, AssetStore, LocalAssetStore};
pub use auth::{AuthError, AuthService, PasswordVerifier, TokenIssuer};
