use std::sync::Arc;

use tracing::warn;

use longhorn_infra::store::{self, ItemStore, StoreError, UserStore};
use longhorn_infra::{
    AppConfig, DatabaseBackend, InMemoryItemStore, InMemoryUserStore, PostgresItemStore,
    PostgresUserStore, SqliteItemStore, SqliteUserStore,
};

/// Store handles shared by every handler, injected as an axum `Extension`.
#[derive(Clone)]
pub struct AppServices {
    pub items: Arc<dyn ItemStore>,
    pub users: Arc<dyn UserStore>,
}

impl AppServices {
    pub fn new(items: Arc<dyn ItemStore>, users: Arc<dyn UserStore>) -> Self {
        Self { items, users }
    }

    /// Fresh, empty in-memory stores (`DATABASE_URL=memory` and tests).
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(InMemoryItemStore::new()),
            Arc::new(InMemoryUserStore::new()),
        )
    }
}

/// Build the stores selected by `config`, creating the tables if needed.
pub async fn build_services(config: &AppConfig) -> Result<AppServices, StoreError> {
    let database = &config.database;
    match database.backend {
        DatabaseBackend::InMemory => {
            warn!("using in-memory stores; all data is lost when the process exits");
            Ok(AppServices::in_memory())
        }
        DatabaseBackend::Sqlite => {
            let pool = store::sqlite::connect(database).await?;
            store::ensure_sqlite_schema(&pool).await?;
            Ok(AppServices::new(
                Arc::new(SqliteItemStore::new(pool.clone())),
                Arc::new(SqliteUserStore::new(pool)),
            ))
        }
        DatabaseBackend::Postgres => {
            let pool = store::postgres::connect(database).await?;
            store::ensure_schema(&pool).await?;
            Ok(AppServices::new(
                Arc::new(PostgresItemStore::new(pool.clone())),
                Arc::new(PostgresUserStore::new(pool)),
            ))
        }
    }
}
