//! Storefront switches (admin only).

use std::collections::BTreeMap;

use axum::extract::State;
use axum::middleware::from_fn_with_state;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Map, Value};
use tracing::info;

use super::MessageResponse;
use crate::auth::require_admin;
use crate::error::ApiResult;
use crate::AppState;
use storefront_core::setting_value_to_string;

pub fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(list_settings).put(update_settings))
        .route_layer(from_fn_with_state(state.clone(), require_admin))
}

async fn list_settings(State(state): State<AppState>) -> ApiResult<Json<BTreeMap<String, String>>> {
    Ok(Json(state.db.settings().get_all().await?))
}

/// Upserts every key in the body. Non-string values are stored as JSON text.
async fn update_settings(
    State(state): State<AppState>,
    Json(body): Json<Map<String, Value>>,
) -> ApiResult<Json<MessageResponse>> {
    let pairs: Vec<(String, String)> = body
        .iter()
        .map(|(key, value)| (key.clone(), setting_value_to_string(value)))
        .collect();

    state.db.settings().upsert_many(&pairs).await?;
    info!(keys = pairs.len(), "Settings updated");

    Ok(Json(MessageResponse::new("Settings updated")))
}
