//! Saved card metadata of the authenticated caller.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::middleware::from_fn_with_state;
use axum::routing::{delete, get};
use axum::{Extension, Json, Router};
use tracing::info;

use super::MessageResponse;
use crate::auth::{require_auth, AuthUser};
use crate::error::ApiResult;
use crate::AppState;
use storefront_core::Card;
use storefront_db::NewCard;

pub fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(list_cards).post(add_card))
        .route("/{id}", delete(delete_card))
        .route_layer(from_fn_with_state(state.clone(), require_auth))
}

async fn list_cards(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<Json<Vec<Card>>> {
    Ok(Json(state.db.cards().list(&auth.id).await?))
}

async fn add_card(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(card): Json<NewCard>,
) -> ApiResult<(StatusCode, Json<Card>)> {
    let card = state.db.cards().create(&auth.id, &card).await?;
    info!(user_id = %auth.id, card_id = card.id, "Card saved");

    Ok((StatusCode::CREATED, Json(card)))
}

async fn delete_card(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> ApiResult<Json<MessageResponse>> {
    state.db.cards().delete(&auth.id, id).await?;
    Ok(Json(MessageResponse::new("Card deleted")))
}
