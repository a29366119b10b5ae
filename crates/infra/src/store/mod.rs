//! Persistence layer: entity stores over Postgres, SQLite, or memory.
//!
//! Each store is an explicitly constructed value, shared behind an `Arc` and
//! injected into the HTTP layer at startup. There is no global handle.
//!
//! ## Atomicity
//!
//! Every write is one atomic unit. The SQL stores run each write in its own
//! transaction and roll it back before returning an error; the in-memory
//! stores hold a single write guard for the whole operation. Either way a
//! failed write leaves the store unchanged.
//!
//! ## Uniqueness
//!
//! User `username` and `email` uniqueness is enforced by the store itself and
//! reported as [`StoreError::Duplicate`], so racing inserts cannot both win.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use longhorn_core::ItemId;
use longhorn_items::{Item, ItemChanges, NewItem};
use longhorn_users::{NewUser, UniqueField, User};

pub mod in_memory;
pub mod postgres;
pub mod schema;
pub mod sqlite;

pub use in_memory::{InMemoryItemStore, InMemoryUserStore};
pub use postgres::{PostgresItemStore, PostgresUserStore};
pub use schema::{ensure_schema, ensure_sqlite_schema};
pub use sqlite::{SqliteItemStore, SqliteUserStore};

/// Store operation error.
///
/// `Database` carries backend detail for logs only; it must never be echoed
/// to API clients.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique user field is already taken.
    #[error("duplicate {}", .0.as_str())]
    Duplicate(UniqueField),

    #[error("database error in {operation}: {message}")]
    Database {
        operation: &'static str,
        message: String,
    },

    #[error("store lock poisoned")]
    Poisoned,
}

#[async_trait]
pub trait ItemStore: Send + Sync {
    /// All items, ordered by id ascending.
    async fn list(&self) -> Result<Vec<Item>, StoreError>;

    async fn get(&self, id: ItemId) -> Result<Option<Item>, StoreError>;

    /// Persist a new item and return it with its assigned id.
    async fn insert(&self, item: NewItem) -> Result<Item, StoreError>;

    /// Apply a partial update. `Ok(None)` if the item does not exist.
    async fn update(
        &self,
        id: ItemId,
        changes: ItemChanges,
        at: DateTime<Utc>,
    ) -> Result<Option<Item>, StoreError>;

    /// Remove an item and return what was removed. `Ok(None)` if it did not exist.
    async fn delete(&self, id: ItemId) -> Result<Option<Item>, StoreError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// All users, ordered by id ascending.
    async fn list(&self) -> Result<Vec<User>, StoreError>;

    async fn count(&self) -> Result<u64, StoreError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Persist a new user. Fails with [`StoreError::Duplicate`] if the username
    /// (checked first) or the email is taken.
    async fn insert(&self, user: NewUser) -> Result<User, StoreError>;
}

#[async_trait]
impl<S> ItemStore for Arc<S>
where
    S: ItemStore + ?Sized,
{
    async fn list(&self) -> Result<Vec<Item>, StoreError> {
        (**self).list().await
    }

    async fn get(&self, id: ItemId) -> Result<Option<Item>, StoreError> {
        (**self).get(id).await
    }

    async fn insert(&self, item: NewItem) -> Result<Item, StoreError> {
        (**self).insert(item).await
    }

    async fn update(
        &self,
        id: ItemId,
        changes: ItemChanges,
        at: DateTime<Utc>,
    ) -> Result<Option<Item>, StoreError> {
        (**self).update(id, changes, at).await
    }

    async fn delete(&self, id: ItemId) -> Result<Option<Item>, StoreError> {
        (**self).delete(id).await
    }
}

#[async_trait]
impl<S> UserStore for Arc<S>
where
    S: UserStore + ?Sized,
{
    async fn list(&self) -> Result<Vec<User>, StoreError> {
        (**self).list().await
    }

    async fn count(&self) -> Result<u64, StoreError> {
        (**self).count().await
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        (**self).find_by_username(username).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        (**self).find_by_email(email).await
    }

    async fn insert(&self, user: NewUser) -> Result<User, StoreError> {
        (**self).insert(user).await
    }
}
