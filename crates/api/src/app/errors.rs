use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;
use tracing::error;

use longhorn_core::DomainError;
use longhorn_infra::StoreError;

pub const RESOURCE_NOT_FOUND: &str = "Resource not found";
pub const BAD_REQUEST: &str = "Bad request";

/// The error envelope every failed request returns: `{"error": message}`.
pub fn json_error(status: StatusCode, message: impl Into<String>) -> axum::response::Response {
    (status, axum::Json(json!({ "error": message.into() }))).into_response()
}

pub fn not_found() -> axum::response::Response {
    json_error(StatusCode::NOT_FOUND, RESOURCE_NOT_FOUND)
}

pub fn bad_request() -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, BAD_REQUEST)
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::Validation(msg) | DomainError::Conflict(msg) => {
            json_error(StatusCode::BAD_REQUEST, msg)
        }
        DomainError::NotFound(msg) => json_error(StatusCode::NOT_FOUND, msg),
        // An id that cannot exist is indistinguishable from an unknown route.
        DomainError::InvalidId(_) => not_found(),
    }
}

/// Map a store failure onto a response.
///
/// Uniqueness violations become the matching conflict message. Anything
/// else is logged with the operation name and answered with a 500 carrying
/// only `message`; backend detail never reaches the client.
pub fn store_error_to_response(
    operation: &'static str,
    err: StoreError,
    message: &'static str,
) -> axum::response::Response {
    match err {
        StoreError::Duplicate(field) => domain_error_to_response(field.conflict()),
        other => {
            error!(operation, error = %other, "store operation failed");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use longhorn_users::UniqueField;

    async fn body_json(resp: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn not_found_keeps_its_message() {
        let resp = domain_error_to_response(DomainError::not_found("Item not found"));
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(resp).await, json!({"error": "Item not found"}));
    }

    #[tokio::test]
    async fn invalid_id_is_an_unknown_resource() {
        let resp = domain_error_to_response(DomainError::invalid_id("ItemId: not an integer"));
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(resp).await, json!({"error": "Resource not found"}));
    }

    #[tokio::test]
    async fn duplicates_are_bad_requests_with_field_message() {
        let resp = store_error_to_response(
            "create_user",
            StoreError::Duplicate(UniqueField::Email),
            "Failed to create user",
        );
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await, json!({"error": "Email already exists"}));
    }

    #[tokio::test]
    async fn database_errors_hide_backend_detail() {
        let resp = store_error_to_response(
            "get_item",
            StoreError::Database {
                operation: "get_item",
                message: "relation \"items\" does not exist".to_string(),
            },
            "Failed to fetch item",
        );
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(resp).await, json!({"error": "Failed to fetch item"}));
    }
}
