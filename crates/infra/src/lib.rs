//! Infrastructure layer: persistence and configuration.

pub mod config;
pub mod store;

pub use config::{AppConfig, ConfigError, DatabaseBackend, DatabaseConfig};
pub use store::{
    InMemoryItemStore, InMemoryUserStore, ItemStore, PostgresItemStore, PostgresUserStore,
    SqliteItemStore, SqliteUserStore, StoreError, UserStore,
};
