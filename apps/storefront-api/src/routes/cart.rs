//! Shopping cart of the authenticated caller.
//!
//! Adding and changing quantities is refused with 403 for non-admins while
//! sales are switched off.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::middleware::from_fn_with_state;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Extension, Json, Router};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::MessageResponse;
use crate::auth::{require_auth, AuthUser};
use crate::error::{ApiError, ApiResult};
use crate::AppState;
use storefront_core::checkout::ensure_sales_open;
use storefront_core::validation::{validate_cart_quantity, validate_quantity};
use storefront_core::{CartItem, CartLine};

pub fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(list_cart))
        .route("/items", post(add_item))
        .route("/items/{product_id}", put(set_quantity).delete(remove_item))
        .route_layer(from_fn_with_state(state.clone(), require_auth))
}

/// Integer out of a loosely typed JSON body field.
fn whole_number(value: Option<&Value>) -> Option<i64> {
    value.and_then(Value::as_i64)
}

async fn sales_gate(state: &AppState, auth: &AuthUser) -> ApiResult<()> {
    let settings = state.db.settings().store_settings().await;
    ensure_sales_open(&settings, auth.role)?;
    Ok(())
}

async fn list_cart(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<Json<Vec<CartLine>>> {
    Ok(Json(state.db.carts().lines(&auth.id).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    pub product_id: Option<Value>,
    pub quantity: Option<Value>,
}

async fn add_item(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<AddItemRequest>,
) -> ApiResult<(StatusCode, Json<CartItem>)> {
    let invalid = || ApiError::bad_request("Invalid product id or quantity");

    let product_id = whole_number(req.product_id.as_ref())
        .filter(|id| *id > 0)
        .ok_or_else(invalid)?;
    let quantity = whole_number(req.quantity.as_ref()).ok_or_else(invalid)?;
    validate_quantity(quantity)?;

    sales_gate(&state, &auth).await?;

    let item = state.db.carts().add_item(&auth.id, product_id, quantity).await?;
    debug!(user_id = %auth.id, product_id, quantity, "Cart item added");

    Ok((StatusCode::CREATED, Json(item)))
}

#[derive(Debug, Deserialize)]
pub struct SetQuantityRequest {
    pub quantity: Option<Value>,
}

async fn set_quantity(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(product_id): Path<i64>,
    Json(req): Json<SetQuantityRequest>,
) -> ApiResult<Response> {
    let quantity = whole_number(req.quantity.as_ref())
        .ok_or_else(|| ApiError::bad_request("Invalid quantity"))?;
    validate_cart_quantity(quantity)?;

    sales_gate(&state, &auth).await?;

    let updated = state
        .db
        .carts()
        .set_quantity(&auth.id, product_id, quantity)
        .await?;

    Ok(match updated {
        Some(item) => Json(item).into_response(),
        None => Json(MessageResponse::new("Item removed from cart")).into_response(),
    })
}

async fn remove_item(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(product_id): Path<i64>,
) -> ApiResult<StatusCode> {
    state.db.carts().remove_item(&auth.id, product_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_whole_number() {
        assert_eq!(whole_number(Some(&json!(3))), Some(3));
        assert_eq!(whole_number(Some(&json!("3"))), None);
        assert_eq!(whole_number(Some(&json!(1.5))), None);
        assert_eq!(whole_number(None), None);
    }
}
