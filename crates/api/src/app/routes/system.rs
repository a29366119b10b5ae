use axum::{http::StatusCode, response::IntoResponse, Json};

use longhorn_core::timestamp;

use crate::app::errors;

pub const HEALTH_MESSAGE: &str = "Longhorn Studies API is running";

/// Liveness only; no dependency checks.
pub async fn health() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "healthy",
            "message": HEALTH_MESSAGE,
            "timestamp": timestamp::to_iso8601(&timestamp::now()),
        })),
    )
}

/// Router fallback for unmatched paths.
pub async fn not_found() -> axum::response::Response {
    errors::not_found()
}
