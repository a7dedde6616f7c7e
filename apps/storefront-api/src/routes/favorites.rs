//! Wish list. Customers only: admins are refused, and `check` answers false
//! for them.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use serde::Serialize;

use super::MessageResponse;
use crate::auth::{require_auth, AuthUser};
use crate::error::{ApiError, ApiResult};
use crate::AppState;
use storefront_core::FavoriteProduct;

pub fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(list_favorites))
        .route("/{product_id}", post(add_favorite).delete(remove_favorite))
        .route("/check/{product_id}", get(check_favorite))
        .route_layer(from_fn_with_state(state.clone(), require_auth))
}

fn customers_only(auth: &AuthUser) -> ApiResult<()> {
    if auth.is_admin() {
        return Err(ApiError::forbidden("Favorites are only available to customers"));
    }
    Ok(())
}

async fn list_favorites(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<Json<Vec<FavoriteProduct>>> {
    customers_only(&auth)?;
    Ok(Json(state.db.favorites().list(&auth.id).await?))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteAdded {
    pub message: String,
    pub favorite_id: i64,
}

async fn add_favorite(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(product_id): Path<i64>,
) -> ApiResult<(StatusCode, Json<FavoriteAdded>)> {
    customers_only(&auth)?;

    let favorite_id = state
        .db
        .favorites()
        .add(&auth.id, product_id)
        .await?
        .ok_or_else(|| ApiError::bad_request("Product is already in favorites"))?;

    Ok((
        StatusCode::CREATED,
        Json(FavoriteAdded {
            message: "Added to favorites".to_string(),
            favorite_id,
        }),
    ))
}

async fn remove_favorite(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(product_id): Path<i64>,
) -> ApiResult<Json<MessageResponse>> {
    customers_only(&auth)?;
    state.db.favorites().remove(&auth.id, product_id).await?;
    Ok(Json(MessageResponse::new("Removed from favorites")))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteCheck {
    pub is_favorite: bool,
}

async fn check_favorite(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(product_id): Path<i64>,
) -> ApiResult<Json<FavoriteCheck>> {
    let is_favorite = if auth.is_admin() {
        false
    } else {
        state.db.favorites().is_favorite(&auth.id, product_id).await?
    };

    Ok(Json(FavoriteCheck { is_favorite }))
}
