//! Domain models for the identity service.
//!
//! [`Account`] is the stored record and deliberately does not implement
//! `Serialize`; handlers respond with one of the view types, none of which
//! carry the password hash.

pub mod account;

pub use account::{
    Account, AccountUpdate, AccountView, CurrentAccountView, DirectoryEntry, NewAccount,
    ProfileView, SignupCredential,
};
