use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use tracing::{error_span, info};

use longhorn_core::{timestamp, DomainError, Entity, ItemId};
use longhorn_infra::StoreError;
use longhorn_items::{ItemChanges, NewItem};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

const ITEM_NOT_FOUND: &str = "Item not found";

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_items).post(create_item))
        .route("/:item_id", get(get_item).put(update_item).delete(delete_item))
}

fn parse_id(raw: &str) -> Result<ItemId, axum::response::Response> {
    raw.parse().map_err(errors::domain_error_to_response)
}

fn item_not_found() -> axum::response::Response {
    errors::domain_error_to_response(DomainError::not_found(ITEM_NOT_FOUND))
}

/// Store failure on one item; the error is logged inside a span carrying its id.
fn item_store_error(
    operation: &'static str,
    id: ItemId,
    err: StoreError,
    message: &'static str,
) -> axum::response::Response {
    error_span!("item", item_id = %id)
        .in_scope(|| errors::store_error_to_response(operation, err, message))
}

pub async fn list_items(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.items.list().await {
        Ok(items) => Json(items.iter().map(dto::item_to_json).collect::<Vec<_>>()).into_response(),
        Err(e) => errors::store_error_to_response("list_items", e, "Failed to fetch items"),
    }
}

pub async fn get_item(
    Extension(services): Extension<Arc<AppServices>>,
    Path(item_id): Path<String>,
) -> axum::response::Response {
    let id = match parse_id(&item_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.items.get(id).await {
        Ok(Some(item)) => Json(dto::item_to_json(&item)).into_response(),
        Ok(None) => item_not_found(),
        Err(e) => item_store_error("get_item", id, e, "Failed to fetch item"),
    }
}

pub async fn create_item(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Bytes, BytesRejection>,
) -> axum::response::Response {
    let body = match dto::body_bytes(body) {
        Ok(body) => body,
        Err(resp) => return resp,
    };
    let req: dto::CreateItemRequest = match dto::parse_body(&body) {
        Ok(req) => req,
        Err(resp) => return resp,
    };

    let new_item = match NewItem::new(req.name, req.description, timestamp::now()) {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    let name = new_item.name.as_str().to_string();
    match services.items.insert(new_item).await {
        Ok(item) => {
            info!(item_id = %item.id(), name = item.name(), "Created item");
            (StatusCode::CREATED, Json(dto::item_to_json(&item))).into_response()
        }
        Err(e) => error_span!("item", item_name = name.as_str()).in_scope(|| {
            errors::store_error_to_response("create_item", e, "Failed to create item")
        }),
    }
}

/// Existence is checked before the body is looked at, so an unknown id is a
/// 404 whatever the payload.
pub async fn update_item(
    Extension(services): Extension<Arc<AppServices>>,
    Path(item_id): Path<String>,
    body: Result<Bytes, BytesRejection>,
) -> axum::response::Response {
    let body = match dto::body_bytes(body) {
        Ok(body) => body,
        Err(resp) => return resp,
    };
    const FAILED: &str = "Failed to update item";

    let id = match parse_id(&item_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.items.get(id).await {
        Ok(Some(_)) => {}
        Ok(None) => return item_not_found(),
        Err(e) => return item_store_error("update_item", id, e, FAILED),
    }

    let fields = match dto::json_object(&body) {
        Ok(Some(fields)) if !fields.is_empty() => fields,
        Ok(_) => return errors::json_error(StatusCode::BAD_REQUEST, "No data provided"),
        Err(resp) => return resp,
    };
    let req: dto::UpdateItemRequest = match dto::from_object(fields) {
        Ok(req) => req,
        Err(resp) => return resp,
    };
    let changes = match ItemChanges::new(req.name, req.description) {
        Ok(c) => c,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.items.update(id, changes, timestamp::now()).await {
        Ok(Some(item)) => {
            info!(item_id = %id, "Updated item");
            Json(dto::item_to_json(&item)).into_response()
        }
        // Deleted between the existence check and the write.
        Ok(None) => item_not_found(),
        Err(e) => item_store_error("update_item", id, e, FAILED),
    }
}

pub async fn delete_item(
    Extension(services): Extension<Arc<AppServices>>,
    Path(item_id): Path<String>,
) -> axum::response::Response {
    let id = match parse_id(&item_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.items.delete(id).await {
        Ok(Some(_)) => {
            info!(item_id = %id, "Deleted item");
            Json(serde_json::json!({ "message": "Item deleted successfully" })).into_response()
        }
        Ok(None) => item_not_found(),
        Err(e) => item_store_error("delete_item", id, e, "Failed to delete item"),
    }
}
