//! Table bootstrap.
//!
//! Tables are created if missing and never altered afterwards. There is no
//! migration history.

use sqlx::{PgPool, SqlitePool};
use tracing::info;

use longhorn_items::NAME_MAX_CHARS;
use longhorn_users::{EMAIL_MAX_CHARS, USERNAME_MAX_CHARS};

use super::StoreError;

pub const USERS_USERNAME_KEY: &str = "users_username_key";
pub const USERS_EMAIL_KEY: &str = "users_email_key";

fn postgres_statements() -> [String; 2] {
    [
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS items (
                id          BIGSERIAL PRIMARY KEY,
                name        VARCHAR({NAME_MAX_CHARS}) NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                created_at  TIMESTAMPTZ NOT NULL,
                updated_at  TIMESTAMPTZ NOT NULL,
                CONSTRAINT items_updated_after_created CHECK (updated_at >= created_at)
            )
            "#
        ),
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id          BIGSERIAL PRIMARY KEY,
                username    VARCHAR({USERNAME_MAX_CHARS}) NOT NULL,
                email       VARCHAR({EMAIL_MAX_CHARS}) NOT NULL,
                created_at  TIMESTAMPTZ NOT NULL,
                CONSTRAINT {USERS_USERNAME_KEY} UNIQUE (username),
                CONSTRAINT {USERS_EMAIL_KEY} UNIQUE (email)
            )
            "#
        ),
    ]
}

/// SQLite keeps timestamps as RFC 3339 text. `AUTOINCREMENT` stops ids of
/// deleted rows from being handed out again.
fn sqlite_statements() -> [String; 2] {
    [
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS items (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                name        TEXT NOT NULL CHECK (length(name) <= {NAME_MAX_CHARS}),
                description TEXT NOT NULL DEFAULT '',
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            )
            "#
        ),
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                username    TEXT NOT NULL UNIQUE CHECK (length(username) <= {USERNAME_MAX_CHARS}),
                email       TEXT NOT NULL UNIQUE CHECK (length(email) <= {EMAIL_MAX_CHARS}),
                created_at  TEXT NOT NULL
            )
            "#
        ),
    ]
}

fn schema_error(err: sqlx::Error) -> StoreError {
    StoreError::Database {
        operation: "ensure_schema",
        message: err.to_string(),
    }
}

/// Create the `items` and `users` tables in Postgres if they do not exist yet.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), StoreError> {
    for sql in postgres_statements() {
        sqlx::query(&sql).execute(pool).await.map_err(schema_error)?;
    }
    info!(backend = "postgres", "database schema ready");
    Ok(())
}

/// Create the `items` and `users` tables in SQLite if they do not exist yet.
pub async fn ensure_sqlite_schema(pool: &SqlitePool) -> Result<(), StoreError> {
    for sql in sqlite_statements() {
        sqlx::query(&sql).execute(pool).await.map_err(schema_error)?;
    }
    info!(backend = "sqlite", "database schema ready");
    Ok(())
}
