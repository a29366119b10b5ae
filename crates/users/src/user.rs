//! User records.
//!
//! Users are created once and never updated or deleted through the API.
//! Username and email are each unique across all users; this module only
//! names the conflicts, the store is what enforces them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use longhorn_core::value_object::required_text;
use longhorn_core::{DomainError, DomainResult, Entity, UserId, ValueObject};

/// Maximum username length, in characters (matches the `users.username` column).
pub const USERNAME_MAX_CHARS: usize = 80;

/// Maximum email length, in characters (matches the `users.email` column).
pub const EMAIL_MAX_CHARS: usize = 120;

// ─────────────────────────────────────────────────────────────────────────────
// Value objects
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Username(String);

impl Username {
    pub fn parse(value: String) -> DomainResult<Self> {
        required_text("Username", value, USERNAME_MAX_CHARS).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl ValueObject for Username {}

/// Email address as submitted. Only presence and length are checked.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    pub fn parse(value: String) -> DomainResult<Self> {
        required_text("Email", value, EMAIL_MAX_CHARS).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl ValueObject for Email {}

// ─────────────────────────────────────────────────────────────────────────────
// Unique fields
// ─────────────────────────────────────────────────────────────────────────────

/// A user attribute that must be unique across all users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniqueField {
    Username,
    Email,
}

impl UniqueField {
    pub fn as_str(&self) -> &'static str {
        match self {
            UniqueField::Username => "username",
            UniqueField::Email => "email",
        }
    }

    /// The conflict reported when this field is already taken.
    pub fn conflict(&self) -> DomainError {
        match self {
            UniqueField::Username => DomainError::conflict("Username already exists"),
            UniqueField::Email => DomainError::conflict("Email already exists"),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Entity
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    id: UserId,
    username: String,
    email: String,
    created_at: DateTime<Utc>,
}

impl User {
    /// Rebuild a user from stored columns.
    pub fn restore(id: UserId, username: String, email: String, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            username,
            email,
            created_at,
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Entity for User {
    type Id = UserId;

    fn id(&self) -> UserId {
        self.id
    }
}

/// A validated user that has no id yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: Username,
    pub email: Email,
    pub created_at: DateTime<Utc>,
}

impl NewUser {
    /// Validate creation input. Both fields are required; presence is
    /// checked for both before either value is validated.
    pub fn new(
        username: Option<String>,
        email: Option<String>,
        created_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let (Some(username), Some(email)) = (username, email) else {
            return Err(DomainError::validation("Username and email are required"));
        };
        Ok(Self {
            username: Username::parse(username)?,
            email: Email::parse(email)?,
            created_at,
        })
    }

    pub fn into_user(self, id: UserId) -> User {
        User {
            id,
            username: self.username.0,
            email: self.email.0,
            created_at: self.created_at,
        }
    }
}
