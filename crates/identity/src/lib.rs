//! Bazaar identity service library.
//!
//! Accounts, password and Google sign-in, signed session tokens, and the
//! authorization gate used by the rest of the marketplace. The binary in
//! `main.rs` wires this library to `PostgreSQL`; tests drive the same router
//! against [`db::MemoryAccountStore`].

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod oauth;
pub mod routes;
pub mod services;
pub mod state;

pub use routes::router;
pub use state::AppState;
