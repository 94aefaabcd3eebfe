//! Bazaar Core - Shared identity types.
//!
//! This crate provides the types every Bazaar component agrees on when it
//! talks about an account:
//! - `identity` - Signup, login, session tokens and the authorization gate
//! - `cli` - Migrations and out-of-band account administration
//! - order and catalog services, which receive an [`AccountId`] and [`Role`]
//!   from the identity layer
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Type-safe account IDs, normalized emails, and marketplace roles

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
