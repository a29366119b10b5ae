//! User domain module.
//!
//! Account records identified by a unique username and a unique email.

pub mod user;

pub use user::{Email, NewUser, UniqueField, User, Username, EMAIL_MAX_CHARS, USERNAME_MAX_CHARS};
