//! CLI subcommand implementations.

pub mod account;
pub mod migrate;

use secrecy::SecretString;

/// Identity database URL from `IDENTITY_DATABASE_URL`, falling back to
/// `DATABASE_URL`.
pub(crate) fn database_url() -> Option<SecretString> {
    dotenvy::dotenv().ok();

    std::env::var("IDENTITY_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()
        .filter(|url| !url.trim().is_empty())
        .map(SecretString::from)
}
