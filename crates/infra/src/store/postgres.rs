//! Postgres-backed entity stores.
//!
//! ## Error Mapping
//!
//! SQLx errors are mapped to `StoreError` as follows:
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError | Scenario |
//! |------------|----------------------|------------|----------|
//! | Database (unique violation on `users_username_key`) | `23505` | `Duplicate(Username)` | Username taken by a concurrent insert |
//! | Database (unique violation on `users_email_key`) | `23505` | `Duplicate(Email)` | Email taken by a concurrent insert |
//! | Database (other) | Any other | `Database` | Constraint or query failure |
//! | PoolClosed / Io / Other | N/A | `Database` | Connection failures, etc. |
//!
//! ## Transactions
//!
//! Reads run directly on the pool. Every write runs in its own transaction,
//! which is rolled back explicitly before any error is returned.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::{info, instrument, warn};

use longhorn_core::{ItemId, UserId};
use longhorn_items::{Item, ItemChanges, NewItem};
use longhorn_users::{NewUser, UniqueField, User};

use crate::config::DatabaseConfig;

use super::schema::{USERS_EMAIL_KEY, USERS_USERNAME_KEY};
use super::{ItemStore, StoreError, UserStore};

const ITEM_COLUMNS: &str = "id, name, description, created_at, updated_at";
const USER_COLUMNS: &str = "id, username, email, created_at";

/// Open a connection pool for the configured database.
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, StoreError> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.url)
        .await
        .map_err(|e| map_sqlx_error("connect", e))?;

    info!(max_connections = config.max_connections, "connected to postgres");
    Ok(pool)
}

/// Postgres item store over the `items` table.
#[derive(Debug, Clone)]
pub struct PostgresItemStore {
    pool: PgPool,
}

impl PostgresItemStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ItemStore for PostgresItemStore {
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
            "SELECT {ITEM_COLUMNS} FROM items WHERE id = $1"
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
            VALUES ($1, $2, $3, $3)
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

    /// Locks the row, applies the change in the domain model, and writes the
    /// full row back, all in one transaction.
    #[instrument(skip(self, changes), fields(item_id = %id), err)]
    async fn update(
        &self,
        id: ItemId,
        changes: ItemChanges,
        at: DateTime<Utc>,
    ) -> Result<Option<Item>, StoreError> {
        let mut tx = begin(&self.pool).await?;

        let current = sqlx::query_as::<_, ItemRow>(&format!(
            "SELECT {ITEM_COLUMNS} FROM items WHERE id = $1 FOR UPDATE"
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
            Err(e) => return Err(rollback(tx, map_sqlx_error("lock_item", e)).await),
        };

        item.apply(&changes, at);

        let written = sqlx::query(
            r#"
            UPDATE items
            SET name = $2, description = $3, updated_at = $4
            WHERE id = $1
            "#,
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
            "DELETE FROM items WHERE id = $1 RETURNING {ITEM_COLUMNS}"
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

/// Postgres user store over the `users` table.
///
/// Uniqueness is enforced by the `users_username_key` / `users_email_key`
/// constraints; violations surface as [`StoreError::Duplicate`].
#[derive(Debug, Clone)]
pub struct PostgresUserStore {
    pool: PgPool,
}

impl PostgresUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_one(
        &self,
        operation: &'static str,
        column: &str,
        value: &str,
    ) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE {column} = $1"
        ))
        .bind(value)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error(operation, e))?;

        Ok(row.map(User::from))
    }
}

#[async_trait]
impl UserStore for PostgresUserStore {
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
            VALUES ($1, $2, $3)
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

// ─────────────────────────────────────────────────────────────────────────────
// Transactions
// ─────────────────────────────────────────────────────────────────────────────

async fn begin(pool: &PgPool) -> Result<Transaction<'static, Postgres>, StoreError> {
    pool.begin()
        .await
        .map_err(|e| map_sqlx_error("begin_transaction", e))
}

async fn commit(tx: Transaction<'static, Postgres>) -> Result<(), StoreError> {
    tx.commit()
        .await
        .map_err(|e| map_sqlx_error("commit_transaction", e))
}

/// Roll back and hand back the original error. A failed rollback is logged;
/// the connection is discarded by the pool in that case anyway.
async fn rollback(tx: Transaction<'static, Postgres>, err: StoreError) -> StoreError {
    rollback_quietly(tx).await;
    err
}

async fn rollback_quietly(tx: Transaction<'static, Postgres>) {
    if let Err(e) = tx.rollback().await {
        warn!(error = %e, "transaction rollback failed");
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Error mapping
// ─────────────────────────────────────────────────────────────────────────────

fn map_sqlx_error(operation: &'static str, err: sqlx::Error) -> StoreError {
    let message = match err {
        sqlx::Error::Database(db_err) => match db_err.code() {
            Some(code) => format!("{} (code {})", db_err.message(), code),
            None => db_err.message().to_string(),
        },
        sqlx::Error::PoolClosed => "connection pool closed".to_string(),
        sqlx::Error::PoolTimedOut => "timed out waiting for a connection".to_string(),
        other => other.to_string(),
    };
    StoreError::Database { operation, message }
}

fn unique_violation_field(err: &sqlx::Error) -> Option<UniqueField> {
    let sqlx::Error::Database(db_err) = err else {
        return None;
    };
    if db_err.code().as_deref() != Some("23505") {
        return None;
    }
    match db_err.constraint() {
        Some(USERS_USERNAME_KEY) => Some(UniqueField::Username),
        Some(USERS_EMAIL_KEY) => Some(UniqueField::Email),
        _ => None,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SQLx row types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug)]
struct ItemRow {
    id: i64,
    name: String,
    description: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for ItemRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
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

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for UserRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
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
