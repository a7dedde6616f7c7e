//! Address book of the authenticated caller. Foreign ids answer 404.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use tracing::debug;

use super::MessageResponse;
use crate::auth::{require_auth, AuthUser};
use crate::error::{ApiError, ApiResult};
use crate::AppState;
use storefront_core::Address;
use storefront_db::AddressInput;

pub fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(list_addresses).post(create_address))
        .route(
            "/{id}",
            get(get_address).put(update_address).delete(delete_address),
        )
        .route("/{id}/set-default", post(set_default))
        .route_layer(from_fn_with_state(state.clone(), require_auth))
}

async fn list_addresses(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<Json<Vec<Address>>> {
    Ok(Json(state.db.addresses().list(&auth.id).await?))
}

async fn get_address(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Address>> {
    state
        .db
        .addresses()
        .get(&auth.id, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Address not found"))
}

async fn create_address(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(input): Json<AddressInput>,
) -> ApiResult<(StatusCode, Json<Address>)> {
    let address = state.db.addresses().create(&auth.id, &input).await?;
    debug!(user_id = %auth.id, address_id = address.id, "Address created");

    Ok((StatusCode::CREATED, Json(address)))
}

async fn update_address(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<i64>,
    Json(input): Json<AddressInput>,
) -> ApiResult<Json<Address>> {
    Ok(Json(state.db.addresses().update(&auth.id, id, &input).await?))
}

async fn delete_address(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> ApiResult<Json<MessageResponse>> {
    state.db.addresses().delete(&auth.id, id).await?;
    Ok(Json(MessageResponse::new("Address deleted")))
}

async fn set_default(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> ApiResult<Json<MessageResponse>> {
    state.db.addresses().set_default(&auth.id, id).await?;
    Ok(Json(MessageResponse::new("Default address updated")))
}
