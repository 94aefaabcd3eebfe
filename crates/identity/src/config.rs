//! Identity service configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `IDENTITY_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string
//! - `JWT_SECRET` - Token signing secret (min 32 chars, high entropy)
//!
//! ## Optional
//! - `IDENTITY_HOST` - Bind address (default: 127.0.0.1)
//! - `IDENTITY_PORT` - Listen port (default: 4000)
//! - `IDENTITY_BASE_URL` - Public URL (default: `http://localhost:4000`)
//! - `FRONTEND_URL` - Where federated login lands afterwards (default: base URL)
//! - `APP_ENV` - `production` switches the default cookie mode to hardened
//! - `TOKEN_TTL_SECONDS` - Token and cookie lifetime (default: 3600)
//! - `COOKIE_MODE` - `hardened` or `relaxed`
//! - `COOKIE_DOMAIN` - Cookie `Domain` attribute (ignored when blank)
//! - `PASSWORD_MEMORY_KIB`, `PASSWORD_ITERATIONS`, `PASSWORD_PARALLELISM` - Argon2 cost
//! - `GOOGLE_CLIENT_ID`, `GOOGLE_CLIENT_SECRET` - Enable Google sign-in (both or neither)
//! - `GOOGLE_AUTHORIZE_URL`, `GOOGLE_TOKEN_URL`, `GOOGLE_USERINFO_URL` - Override
//!   Google's OAuth endpoints (default: Google's public endpoints)
//! - `ASSET_DIR` - Local directory for uploaded images (default: ./data/assets)
//! - `LOG_FORMAT` - `json` for structured output, anything else for pretty
//! - `SENTRY_DSN`, `SENTRY_ENVIRONMENT` - Error tracking

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_JWT_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const DEFAULT_TOKEN_TTL_SECONDS: u64 = 60 * 60;

const GOOGLE_AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// How strictly session cookies are scoped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CookieMode {
    /// `Secure` + `SameSite=None`, for HTTPS deployments with a separate frontend origin.
    Hardened,
    /// No `Secure` + `SameSite=Lax`, for local development over plain HTTP.
    Relaxed,
}

impl std::str::FromStr for CookieMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hardened" => Ok(Self::Hardened),
            "relaxed" => Ok(Self::Relaxed),
            other => Err(format!("expected 'hardened' or 'relaxed', got '{other}'")),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Session cookie settings.
#[derive(Debug, Clone)]
pub struct CookieConfig {
    pub mode: CookieMode,
    /// Only set when configured and non-blank.
    pub domain: Option<String>,
}

/// Argon2 work factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            memory_kib: argon2::Params::DEFAULT_M_COST,
            iterations: argon2::Params::DEFAULT_T_COST,
            parallelism: argon2::Params::DEFAULT_P_COST,
        }
    }
}

/// Google OAuth client credentials and endpoints.
///
/// Implements `Debug` manually to redact the client secret.
#[derive(Clone)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: SecretString,
    pub authorize_url: String,
    pub token_url: String,
    pub userinfo_url: String,
}

impl GoogleConfig {
    /// Credentials for Google's public endpoints.
    #[must_use]
    pub fn new(client_id: impl Into<String>, client_secret: SecretString) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret,
            authorize_url: GOOGLE_AUTHORIZE_URL.to_string(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
            userinfo_url: GOOGLE_USERINFO_URL.to_string(),
        }
    }
}

impl std::fmt::Debug for GoogleConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("authorize_url", &self.authorize_url)
            .field("token_url", &self.token_url)
            .field("userinfo_url", &self.userinfo_url)
            .finish()
    }
}

/// Identity service configuration.
///
/// `SecretString` fields print as redacted in `Debug` output.
#[derive(Debug, Clone)]
pub struct IdentityConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL of this service
    pub base_url: String,
    /// Frontend URL to land on after federated login
    pub frontend_url: String,
    /// Token signing secret
    pub jwt_secret: SecretString,
    /// Token and cookie lifetime
    pub token_ttl: Duration,
    pub cookie: CookieConfig,
    pub password: PasswordConfig,
    /// Google sign-in, when configured
    pub google: Option<GoogleConfig>,
    /// Local directory backing the asset store
    pub asset_dir: PathBuf,
    pub log_format: LogFormat,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    pub sentry_environment: Option<String>,
}

impl IdentityConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Same as [`IdentityConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env { lookup };

        let database_url = env.database_url("IDENTITY_DATABASE_URL")?;
        let host: IpAddr = env.parsed("IDENTITY_HOST", "127.0.0.1")?;
        let port: u16 = env.parsed("IDENTITY_PORT", "4000")?;
        let base_url = env
            .or_default("IDENTITY_BASE_URL", "http://localhost:4000")
            .trim_end_matches('/')
            .to_string();
        let frontend_url = env
            .optional("FRONTEND_URL")
            .map_or_else(|| base_url.clone(), |url| url.trim_end_matches('/').to_string());

        validate_url(&base_url, "IDENTITY_BASE_URL")?;
        validate_url(&frontend_url, "FRONTEND_URL")?;

        let jwt_secret = env.validated_secret("JWT_SECRET")?;
        validate_secret_length(&jwt_secret, "JWT_SECRET")?;

        let ttl_seconds: u64 =
            env.parsed("TOKEN_TTL_SECONDS", &DEFAULT_TOKEN_TTL_SECONDS.to_string())?;
        if ttl_seconds == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "TOKEN_TTL_SECONDS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        let production = env
            .optional("APP_ENV")
            .is_some_and(|v| v.eq_ignore_ascii_case("production"));
        let default_mode = if production { "hardened" } else { "relaxed" };
        let cookie = CookieConfig {
            mode: env.parsed("COOKIE_MODE", default_mode)?,
            domain: env.optional("COOKIE_DOMAIN"),
        };

        let defaults = PasswordConfig::default();
        let password = PasswordConfig {
            memory_kib: env.parsed("PASSWORD_MEMORY_KIB", &defaults.memory_kib.to_string())?,
            iterations: env.parsed("PASSWORD_ITERATIONS", &defaults.iterations.to_string())?,
            parallelism: env.parsed("PASSWORD_PARALLELISM", &defaults.parallelism.to_string())?,
        };

        let google = match (
            env.optional("GOOGLE_CLIENT_ID"),
            env.optional("GOOGLE_CLIENT_SECRET"),
        ) {
            (Some(client_id), Some(client_secret)) => {
                let mut google = GoogleConfig::new(client_id, SecretString::from(client_secret));
                for (var, target) in [
                    ("GOOGLE_AUTHORIZE_URL", &mut google.authorize_url),
                    ("GOOGLE_TOKEN_URL", &mut google.token_url),
                    ("GOOGLE_USERINFO_URL", &mut google.userinfo_url),
                ] {
                    if let Some(url) = env.optional(var) {
                        validate_url(&url, var)?;
                        *target = url;
                    }
                }
                Some(google)
            }
            (None, None) => None,
            (Some(_), None) => {
                return Err(ConfigError::MissingEnvVar("GOOGLE_CLIENT_SECRET".to_string()));
            }
            (None, Some(_)) => {
                return Err(ConfigError::MissingEnvVar("GOOGLE_CLIENT_ID".to_string()));
            }
        };

        let log_format = match env.optional("LOG_FORMAT") {
            Some(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            frontend_url,
            jwt_secret,
            token_ttl: Duration::from_secs(ttl_seconds),
            cookie,
            password,
            google,
            asset_dir: PathBuf::from(env.or_default("ASSET_DIR", "./data/assets")),
            log_format,
            sentry_dsn: env.optional("SENTRY_DSN"),
            sentry_environment: env.optional("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Redirect URI registered with the Google OAuth client.
    #[must_use]
    pub fn google_redirect_uri(&self) -> String {
        format!("{}/auth/google/callback", self.base_url)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

struct Env<F> {
    lookup: F,
}

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Get an optional variable, treating blank values as unset.
    fn optional(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    /// Get a required variable.
    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    /// Get a variable with a default value.
    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    /// Get a variable with a default value and parse it.
    fn parsed<T>(&self, key: &str, default: &str) -> Result<T, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        self.or_default(key, default)
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    }

    /// Get database URL with fallback to generic `DATABASE_URL`.
    fn database_url(&self, primary_key: &str) -> Result<SecretString, ConfigError> {
        self.optional(primary_key)
            .or_else(|| self.optional("DATABASE_URL"))
            .map(SecretString::from)
            .ok_or_else(|| ConfigError::MissingEnvVar(primary_key.to_string()))
    }

    /// Load and validate a secret.
    fn validated_secret(&self, key: &str) -> Result<SecretString, ConfigError> {
        let value = self.required(key)?;
        validate_secret_strength(&value, key)?;
        Ok(SecretString::from(value))
    }
}

/// Validate that a signing secret meets minimum length requirements.
/// Require an absolute `http` or `https` URL.
fn validate_url(value: &str, var_name: &str) -> Result<(), ConfigError> {
    let url = url::Url::parse(value)
        .map_err(|e| ConfigError::InvalidEnvVar(var_name.to_string(), e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            var_name.to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    Ok(())
}

fn validate_secret_length(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_JWT_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_JWT_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}
