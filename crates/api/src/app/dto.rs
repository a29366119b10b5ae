use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};

use longhorn_core::{timestamp, Entity};
use longhorn_items::Item;
use longhorn_users::User;

use crate::app::errors;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Default, Deserialize)]
pub struct CreateItemRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// Partial update. `null` and absent fields both mean "leave unchanged";
/// unknown fields are ignored.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateItemRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateUserRequest {
    pub username: Option<String>,
    pub email: Option<String>,
}

// -------------------------
// Body parsing
// -------------------------

/// Unwrap the buffered request body. A body that could not be read is
/// answered with `400 Bad request` in the JSON envelope.
pub fn body_bytes(body: Result<Bytes, BytesRejection>) -> Result<Bytes, axum::response::Response> {
    body.map_err(|rejection| {
        tracing::warn!(status = rejection.status().as_u16(), error = %rejection, "request body rejected");
        errors::bad_request()
    })
}

/// Parse a request body as a JSON object.
///
/// `Ok(None)` when there is nothing to read: an empty body, or valid JSON that
/// is not an object. Unparsable JSON is rejected with `400 Bad request`.
pub fn json_object(body: &Bytes) -> Result<Option<Map<String, Value>>, axum::response::Response> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(Some(map)),
        Ok(_) => Ok(None),
        Err(_) => Err(errors::bad_request()),
    }
}

/// Deserialize a request DTO from a parsed body. Fields of the wrong JSON
/// type are rejected with `400 Bad request`.
pub fn from_object<T: DeserializeOwned>(
    map: Map<String, Value>,
) -> Result<T, axum::response::Response> {
    serde_json::from_value(Value::Object(map)).map_err(|_| errors::bad_request())
}

/// Parse an optional body straight into a DTO; a missing body yields
/// `T::default()`.
pub fn parse_body<T: DeserializeOwned + Default>(
    body: &Bytes,
) -> Result<T, axum::response::Response> {
    match json_object(body)? {
        Some(map) => from_object(map),
        None => Ok(T::default()),
    }
}

// -------------------------
// Response mapping
// -------------------------

pub fn item_to_json(item: &Item) -> Value {
    serde_json::json!({
        "id": item.id().as_i64(),
        "name": item.name(),
        "description": item.description(),
        "created_at": timestamp::to_iso8601(&item.created_at()),
        "updated_at": timestamp::to_iso8601(&item.updated_at()),
    })
}

pub fn user_to_json(user: &User) -> Value {
    serde_json::json!({
        "id": user.id().as_i64(),
        "username": user.username(),
        "email": user.email(),
        "created_at": timestamp::to_iso8601(&user.created_at()),
    })
}
