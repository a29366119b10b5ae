use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, Extension},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use tracing::{error_span, info};

use longhorn_core::{timestamp, Entity};
use longhorn_infra::StoreError;
use longhorn_users::{NewUser, UniqueField};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new().route("/", get(list_users).post(create_user))
}

pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.users.list().await {
        Ok(users) => Json(users.iter().map(dto::user_to_json).collect::<Vec<_>>()).into_response(),
        Err(e) => errors::store_error_to_response("list_users", e, "Failed to fetch users"),
    }
}

/// Store failure while creating `username`; logged inside a span carrying it.
fn create_user_store_error(username: &str, err: StoreError) -> axum::response::Response {
    error_span!("user", username)
        .in_scope(|| errors::store_error_to_response("create_user", err, "Failed to create user"))
}

/// Username is checked before email so a request clashing on both reports
/// the username. The store enforces both again on insert.
pub async fn create_user(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Bytes, BytesRejection>,
) -> axum::response::Response {
    let body = match dto::body_bytes(body) {
        Ok(body) => body,
        Err(resp) => return resp,
    };
    let req: dto::CreateUserRequest = match dto::parse_body(&body) {
        Ok(req) => req,
        Err(resp) => return resp,
    };

    let new_user = match NewUser::new(req.username, req.email, timestamp::now()) {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.users.find_by_username(new_user.username.as_str()).await {
        Ok(None) => {}
        Ok(Some(_)) => return errors::domain_error_to_response(UniqueField::Username.conflict()),
        Err(e) => return create_user_store_error(new_user.username.as_str(), e),
    }
    match services.users.find_by_email(new_user.email.as_str()).await {
        Ok(None) => {}
        Ok(Some(_)) => return errors::domain_error_to_response(UniqueField::Email.conflict()),
        Err(e) => return create_user_store_error(new_user.username.as_str(), e),
    }

    let username = new_user.username.as_str().to_string();
    match services.users.insert(new_user).await {
        Ok(user) => {
            info!(user_id = %user.id(), username = user.username(), "Created user");
            (StatusCode::CREATED, Json(dto::user_to_json(&user))).into_response()
        }
        Err(e) => create_user_store_error(&username, e),
    }
}
