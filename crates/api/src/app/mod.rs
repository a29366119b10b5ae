//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store wiring (Postgres or in-memory)
//! - `routes/`: HTTP routes + handlers (one file per entity)
//! - `dto.rs`: request DTOs, body parsing and JSON mapping helpers
//! - `errors.rs`: the `{"error": ...}` envelope and error-to-status mapping

use std::any::Any;
use std::sync::Arc;

use axum::{extract::DefaultBodyLimit, http::StatusCode, response::Response, Extension, Router};
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{self, CorsLayer};

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

use services::AppServices;

/// Build the full HTTP router (public entrypoint used by `main.rs` and the
/// black-box tests).
pub fn build_app(services: Arc<AppServices>) -> Router {
    let cors_layer = CorsLayer::new()
        .allow_origin(cors::Any)
        .allow_methods(cors::Any)
        .allow_headers(cors::Any);

    Router::new()
        .nest("/api", routes::router().layer(cors_layer))
        .fallback(routes::system::not_found)
        // `description` is unbounded, so request bodies are too.
        .layer(DefaultBodyLimit::disable())
        .layer(Extension(services))
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn(middleware::request_logging))
                .layer(CatchPanicLayer::custom(handle_panic)),
        )
}

fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else {
        "unknown panic payload"
    };
    tracing::error!(panic = detail, "handler panicked");

    errors::json_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
}
