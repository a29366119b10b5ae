//! SQLite-backed entity stores, the durable default for single-node setups.
//!
//! ## Error Mapping
//!
//! | SQLx Error | SQLite message | StoreError |
//! |------------|----------------|------------|
//! | Database (unique violation) | `UNIQUE constraint failed: users.username` | `Duplicate(Username)` |
//! | Database (unique violation) | `UNIQUE constraint failed: users.email` | `Duplicate(Email)` |
//! | Database (other) / Io / PoolClosed | any | `Database` |
//!
//! ## Transactions
//!
//! The pool holds a single connection. SQLite admits one writer at a time, so
//! each transaction runs alone and a read-then-write never hits `SQLITE_BUSY`.
//! Writes are rolled back explicitly before any error is returned.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use tracing::{info, instrument, warn};

use longhorn_core::{ItemId, UserId};
use longhorn_items::{Item, ItemChanges, NewItem};
use longhorn_users::{NewUser, UniqueField, User};

use crate::config::DatabaseConfig;

use super::{ItemStore, StoreError, UserStore};

const ITEM_COLUMNS: &str = "id, name, description, created_at, updated_at";
const USER_COLUMNS: &str = "id, username, email, created_at";

/// Open the database file named by `config.url`, creating it if missing.
pub async fn connect(config: &DatabaseConfig) -> Result<SqlitePool, StoreError> {
    connect_url(&config.url).await
}

pub(crate) async fn connect_url(url: &str) -> Result<SqlitePool, StoreError> {
    let options = SqliteConnectOptions::from_str(url)
        .map_err(|e| map_sqlx_error("connect", e))?
        .create_if_missing(true);

    // `sqlite::memory:` databases live only as long as their connection.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .map_err(|e| map_sqlx_error("connect", e))?;

    info!("connected to sqlite");
    Ok(pool)
}

/// SQLite item store over the `items` table.
#[derive(Debug, Clone)]
pub struct SqliteItemStore {
    pool: SqlitePool,
}

impl SqliteItemStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ItemStore for SqliteItemStore {
    #[instrument(skip(self), err)]
    async fn list(&self) -> Result<Vec<Item>, StoreError> {
        let rows = sqlx::query_as::<_, ItemRow>(&format!(
            "SELECT {ITEM_COLUMNS} FROM items ORDER BY id ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_items", e))?;

        Ok(rows.into_iter().map(Item::from).collect())
    }

    #[instrument(skip(self), fields(item_id = %id), err)]
    async fn get(&self, id: ItemId) -> Result<Option<Item>, StoreError> {
        let row = sqlx::query_as::<_, ItemRow>(&format!(
            "SELECT {ITEM_COLUMNS} FROM items WHERE id = ?1"
        ))
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_item", e))?;

        Ok(row.map(Item::from))
    }

    #[instrument(skip(self, item), err)]
    async fn insert(&self, item: NewItem) -> Result<Item, StoreError> {
        let mut tx = begin(&self.pool).await?;

        let inserted = sqlx::query_as::<_, ItemRow>(&format!(
            r#"
            INSERT INTO items (name, description, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?3)
            RETURNING {ITEM_COLUMNS}
            "#
        ))
        .bind(item.name.as_str())
        .bind(&item.description)
        .bind(item.created_at)
        .fetch_one(&mut *tx)
        .await;

        let row = match inserted {
            Ok(row) => row,
            Err(e) => return Err(rollback(tx, map_sqlx_error("insert_item", e)).await),
        };

        commit(tx).await?;
        Ok(row.into())
    }

    #[instrument(skip(self, changes), fields(item_id = %id), err)]
    async fn update(
        &self,
        id: ItemId,
        changes: ItemChanges,
        at: DateTime<Utc>,
    ) -> Result<Option<Item>, StoreError> {
        let mut tx = begin(&self.pool).await?;

        let current = sqlx::query_as::<_, ItemRow>(&format!(
            "SELECT {ITEM_COLUMNS} FROM items WHERE id = ?1"
        ))
        .bind(id.as_i64())
        .fetch_optional(&mut *tx)
        .await;

        let mut item: Item = match current {
            Ok(Some(row)) => row.into(),
            Ok(None) => {
                rollback_quietly(tx).await;
                return Ok(None);
            }
            Err(e) => return Err(rollback(tx, map_sqlx_error("read_item", e)).await),
        };

        item.apply(&changes, at);

        let written = sqlx::query(
            "UPDATE items SET name = ?2, description = ?3, updated_at = ?4 WHERE id = ?1",
        )
        .bind(id.as_i64())
        .bind(item.name())
        .bind(item.description())
        .bind(item.updated_at())
        .execute(&mut *tx)
        .await;

        if let Err(e) = written {
            return Err(rollback(tx, map_sqlx_error("update_item", e)).await);
        }

        commit(tx).await?;
        Ok(Some(item))
    }

    #[instrument(skip(self), fields(item_id = %id), err)]
    async fn delete(&self, id: ItemId) -> Result<Option<Item>, StoreError> {
        let mut tx = begin(&self.pool).await?;

        let deleted = sqlx::query_as::<_, ItemRow>(&format!(
            "DELETE FROM items WHERE id = ?1 RETURNING {ITEM_COLUMNS}"
        ))
        .bind(id.as_i64())
        .fetch_optional(&mut *tx)
        .await;

        let row = match deleted {
            Ok(row) => row,
            Err(e) => return Err(rollback(tx, map_sqlx_error("delete_item", e)).await),
        };

        commit(tx).await?;
        Ok(row.map(Item::from))
    }
}

/// SQLite user store over the `users` table. Uniqueness comes from the
/// `UNIQUE` column constraints.
#[derive(Debug, Clone)]
pub struct SqliteUserStore {
    pool: SqlitePool,
}

impl SqliteUserStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn find_one(
        &self,
        operation: &'static str,
        column: &str,
        value: &str,
    ) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE {column} = ?1"
        ))
        .bind(value)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error(operation, e))?;

        Ok(row.map(User::from))
    }
}

#[async_trait]
impl UserStore for SqliteUserStore {
    #[instrument(skip(self), err)]
    async fn list(&self) -> Result<Vec<User>, StoreError> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY id ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_users", e))?;

        Ok(rows.into_iter().map(User::from).collect())
    }

    #[instrument(skip(self), err)]
    async fn count(&self) -> Result<u64, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM users")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_users", e))?;
        let n: i64 = row
            .try_get("n")
            .map_err(|e| map_sqlx_error("count_users", e))?;
        Ok(n.max(0) as u64)
    }

    #[instrument(skip(self), err)]
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        self.find_one("find_user_by_username", "username", username).await
    }

    #[instrument(skip(self), err)]
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.find_one("find_user_by_email", "email", email).await
    }

    #[instrument(skip(self, user), fields(username = %user.username.as_str()), err)]
    async fn insert(&self, user: NewUser) -> Result<User, StoreError> {
        let mut tx = begin(&self.pool).await?;

        let inserted = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            INSERT INTO users (username, email, created_at)
            VALUES (?1, ?2, ?3)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user.username.as_str())
        .bind(user.email.as_str())
        .bind(user.created_at)
        .fetch_one(&mut *tx)
        .await;

        let row = match inserted {
            Ok(row) => row,
            Err(e) => {
                let err = match unique_violation_field(&e) {
                    Some(field) => StoreError::Duplicate(field),
                    None => map_sqlx_error("insert_user", e),
                };
                return Err(rollback(tx, err).await);
            }
        };

        commit(tx).await?;
        Ok(row.into())
    }
}

async fn begin(pool: &SqlitePool) -> Result<Transaction<'static, Sqlite>, StoreError> {
    pool.begin()
        .await
        .map_err(|e| map_sqlx_error("begin_transaction", e))
}

async fn commit(tx: Transaction<'static, Sqlite>) -> Result<(), StoreError> {
    tx.commit()
        .await
        .map_err(|e| map_sqlx_error("commit_transaction", e))
}

async fn rollback(tx: Transaction<'static, Sqlite>, err: StoreError) -> StoreError {
    rollback_quietly(tx).await;
    err
}

async fn rollback_quietly(tx: Transaction<'static, Sqlite>) {
    if let Err(e) = tx.rollback().await {
        warn!(error = %e, "transaction rollback failed");
    }
}

fn map_sqlx_error(operation: &'static str, err: sqlx::Error) -> StoreError {
    let message = match err {
        sqlx::Error::Database(db_err) => db_err.message().to_string(),
        sqlx::Error::PoolClosed => "connection pool closed".to_string(),
        sqlx::Error::PoolTimedOut => "timed out waiting for a connection".to_string(),
        other => other.to_string(),
    };
    StoreError::Database { operation, message }
}

/// SQLite reports no constraint name, only `table.column` in the message.
fn unique_violation_field(err: &sqlx::Error) -> Option<UniqueField> {
    let sqlx::Error::Database(db_err) = err else {
        return None;
    };
    if !db_err.is_unique_violation() {
        return None;
    }
    let message = db_err.message();
    if message.contains("users.username") {
        Some(UniqueField::Username)
    } else if message.contains("users.email") {
        Some(UniqueField::Email)
    } else {
        None
    }
}

#[derive(Debug)]
struct ItemRow {
    id: i64,
    name: String,
    description: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, SqliteRow> for ItemRow {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(ItemRow {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl From<ItemRow> for Item {
    fn from(row: ItemRow) -> Self {
        Item::restore(
            ItemId::from_i64(row.id),
            row.name,
            row.description,
            row.created_at,
            row.updated_at,
        )
    }
}

#[derive(Debug)]
struct UserRow {
    id: i64,
    username: String,
    email: String,
    created_at: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, SqliteRow> for UserRow {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(UserRow {
            id: row.try_get("id")?,
            username: row.try_get("username")?,
            email: row.try_get("email")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User::restore(
            UserId::from_i64(row.id),
            row.username,
            row.email,
            row.created_at,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::schema::ensure_sqlite_schema;
    use chrono::{Duration, TimeZone};
    use longhorn_core::Entity;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 18, 9, 15, 2).unwrap() + Duration::microseconds(123_456)
    }

    async fn memory_pool() -> SqlitePool {
        let pool = connect_url("sqlite::memory:").await.unwrap();
        ensure_sqlite_schema(&pool).await.unwrap();
        pool
    }

    fn new_item(name: &str) -> NewItem {
        NewItem::new(Some(name.to_string()), None, t0()).unwrap()
    }

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser::new(Some(username.to_string()), Some(email.to_string()), t0()).unwrap()
    }

    #[tokio::test]
    async fn item_lifecycle() {
        let store = SqliteItemStore::new(memory_pool().await);

        let created = store.insert(new_item("Soil sample A")).await.unwrap();
        assert_eq!(created.id(), ItemId::from_i64(1));
        assert_eq!(created.created_at(), t0());
        assert_eq!(created.updated_at(), t0());
        assert_eq!(created.description(), "");

        let changes = ItemChanges::new(None, Some("pH test".to_string())).unwrap();
        let updated = store
            .update(created.id(), changes, t0() + Duration::seconds(5))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.name(), "Soil sample A");
        assert_eq!(store.get(created.id()).await.unwrap(), Some(updated.clone()));

        assert_eq!(store.delete(created.id()).await.unwrap(), Some(updated));
        assert_eq!(store.get(created.id()).await.unwrap(), None);
        assert_eq!(store.delete(created.id()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn missing_item_update_is_none() {
        let store = SqliteItemStore::new(memory_pool().await);
        let result = store
            .update(ItemId::from_i64(3), ItemChanges::default(), t0())
            .await
            .unwrap();
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn deleted_ids_are_not_reused() {
        let store = SqliteItemStore::new(memory_pool().await);
        let first = store.insert(new_item("a")).await.unwrap();
        let second = store.insert(new_item("b")).await.unwrap();
        store.delete(second.id()).await.unwrap();

        let third = store.insert(new_item("c")).await.unwrap();
        assert!(third.id() > second.id());

        let names: Vec<_> = store
            .list()
            .await
            .unwrap()
            .iter()
            .map(|i| i.name().to_string())
            .collect();
        assert_eq!(names, ["a", "c"]);
        assert_eq!(first.id(), ItemId::from_i64(1));
    }

    #[tokio::test]
    async fn duplicate_users_are_reported_by_field() {
        let store = SqliteUserStore::new(memory_pool().await);
        store.insert(new_user("alice", "a@x.com")).await.unwrap();

        let err = store.insert(new_user("alice", "b@x.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(UniqueField::Username)));

        let err = store.insert(new_user("bob", "a@x.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(UniqueField::Email)));

        assert_eq!(store.count().await.unwrap(), 1);
        let found = store.find_by_email("a@x.com").await.unwrap().unwrap();
        assert_eq!(found.username(), "alice");
        assert_eq!(store.find_by_username("bob").await.unwrap(), None);
    }

    #[tokio::test]
    async fn data_survives_reopening_the_file() {
        let path = std::env::temp_dir().join(format!("longhorn-{}.db", std::process::id()));
        let url = format!("sqlite://{}", path.display());
        let _ = std::fs::remove_file(&path);

        {
            let pool = connect_url(&url).await.unwrap();
            ensure_sqlite_schema(&pool).await.unwrap();
            SqliteItemStore::new(pool.clone())
                .insert(new_item("kept"))
                .await
                .unwrap();
            pool.close().await;
        }

        let pool = connect_url(&url).await.unwrap();
        ensure_sqlite_schema(&pool).await.unwrap();
        let items = SqliteItemStore::new(pool.clone()).list().await.unwrap();
        pool.close().await;
        let _ = std::fs::remove_file(&path);

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name(), "kept");
        assert_eq!(items[0].created_at(), t0());
    }
}
