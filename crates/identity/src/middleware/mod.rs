//! HTTP middleware stack for the identity service.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Rate limiting on credential endpoints (governor)
//!
//! The session cookie is read per handler through the [`CurrentAccount`]
//! extractor rather than a layer.

pub mod auth;
pub mod rate_limit;
pub mod request_id;
pub mod session;

pub use auth::CurrentAccount;
pub use rate_limit::auth_rate_limiter;
pub use request_id::request_id_middleware;
pub use session::SessionCookies;
