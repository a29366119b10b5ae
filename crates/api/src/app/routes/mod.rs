use axum::{routing::get, Router};

pub mod items;
pub mod system;
pub mod users;

/// Router for everything under `/api`.
pub fn router() -> Router {
    Router::new()
        .route("/health", get(system::health))
        .nest("/items", items::router())
        .nest("/users", users::router())
}
