use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use longhorn_core::{Entity, ItemId, UserId};
use longhorn_items::{Item, ItemChanges, NewItem};
use longhorn_users::{NewUser, UniqueField, User};

use super::{ItemStore, StoreError, UserStore};

#[derive(Debug)]
struct Table<K, V> {
    rows: BTreeMap<K, V>,
    /// Last id handed out. Ids are never reused, even after deletes.
    last_id: i64,
}

impl<K, V> Default for Table<K, V> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            last_id: 0,
        }
    }
}

impl<K, V> Table<K, V> {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }
}

/// In-memory item store.
///
/// Intended for tests/dev. Every operation holds one lock guard for its whole
/// duration, so writes are atomic.
#[derive(Debug, Default)]
pub struct InMemoryItemStore {
    inner: RwLock<Table<ItemId, Item>>,
}

impl InMemoryItemStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ItemStore for InMemoryItemStore {
    async fn list(&self) -> Result<Vec<Item>, StoreError> {
        let table = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(table.rows.values().cloned().collect())
    }

    async fn get(&self, id: ItemId) -> Result<Option<Item>, StoreError> {
        let table = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(table.rows.get(&id).cloned())
    }

    async fn insert(&self, item: NewItem) -> Result<Item, StoreError> {
        let mut table = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        let id = ItemId::from_i64(table.next_id());
        let item = item.into_item(id);
        table.rows.insert(id, item.clone());
        Ok(item)
    }

    async fn update(
        &self,
        id: ItemId,
        changes: ItemChanges,
        at: DateTime<Utc>,
    ) -> Result<Option<Item>, StoreError> {
        let mut table = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        Ok(table.rows.get_mut(&id).map(|item| {
            item.apply(&changes, at);
            item.clone()
        }))
    }

    async fn delete(&self, id: ItemId) -> Result<Option<Item>, StoreError> {
        let mut table = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        Ok(table.rows.remove(&id))
    }
}

/// In-memory user store.
///
/// Uniqueness is checked under the write guard, so it holds under concurrent
/// inserts just like the Postgres unique constraints.
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    inner: RwLock<Table<UserId, User>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn find_by(&self, pred: impl Fn(&User) -> bool) -> Result<Option<User>, StoreError> {
        let table = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(table.rows.values().find(|u| pred(u)).cloned())
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn list(&self) -> Result<Vec<User>, StoreError> {
        let table = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(table.rows.values().cloned().collect())
    }

    async fn count(&self) -> Result<u64, StoreError> {
        let table = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(table.rows.len() as u64)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        self.find_by(|u| u.username() == username)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.find_by(|u| u.email() == email)
    }

    async fn insert(&self, user: NewUser) -> Result<User, StoreError> {
        let mut table = self.inner.write().map_err(|_| StoreError::Poisoned)?;

        if table
            .rows
            .values()
            .any(|u| u.username() == user.username.as_str())
        {
            return Err(StoreError::Duplicate(UniqueField::Username));
        }
        if table.rows.values().any(|u| u.email() == user.email.as_str()) {
            return Err(StoreError::Duplicate(UniqueField::Email));
        }

        let id = UserId::from_i64(table.next_id());
        let user = user.into_user(id);
        table.rows.insert(user.id(), user.clone());
        Ok(user)
    }
}
