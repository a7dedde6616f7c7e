//! # Order Routes
//!
//! Checkout for customers, fulfilment for admins.
//!
//! ```text
//! POST   /                    auth    place order (one transaction) → notify admins
//! GET    /user/my-orders      auth    caller's orders
//! GET    /{id}                auth    owner or admin
//! POST   /{id}/cancel         auth    owner, restores stock
//! GET    /                    admin   paginated listing
//! PATCH  /{id}/status         admin   → notify owner when order status changed
//! PATCH  /{id}/shipping       admin
//! PATCH  /{id}/note           admin
//! ```

use std::str::FromStr;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, patch, post};
use axum::{Extension, Json, Router};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::MessageResponse;
use crate::auth::{require_admin, require_auth, AuthUser};
use crate::error::{ApiError, ApiResult};
use crate::AppState;
use storefront_core::checkout::CheckoutRequest;
use storefront_core::validation::optional_text;
use storefront_core::{Order, OrderHistoryEntry, OrderItem, OrderStatus, OrderWithCustomer, PaymentStatus};
use storefront_db::{OrderFilter, ShippingUpdate, StatusUpdate};

/// Largest page an admin may request.
const MAX_PAGE_SIZE: i64 = 100;

pub fn router(state: &AppState) -> Router<AppState> {
    let customer = Router::new()
        .route("/", post(place_order))
        .route("/user/my-orders", get(my_orders))
        .route("/{id}", get(get_order))
        .route("/{id}/cancel", post(cancel_order))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    let admin = Router::new()
        .route("/", get(list_orders))
        .route("/{id}/status", patch(update_status))
        .route("/{id}/shipping", patch(update_shipping))
        .route("/{id}/note", patch(update_note))
        .route_layer(from_fn_with_state(state.clone(), require_admin));

    customer.merge(admin)
}

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub message: String,
    pub order: Order,
}

// =============================================================================
// Customer
// =============================================================================

async fn place_order(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<CheckoutRequest>,
) -> ApiResult<(StatusCode, Json<OrderResponse>)> {
    let checkout = req.validate()?;

    let placed = state.db.orders().place_order(&auth.id, checkout).await?;
    info!(
        order_id = placed.order.id,
        user_id = %auth.id,
        total_cents = placed.order.total_cents,
        lines = placed.items.len(),
        "Order placed"
    );

    state.notifier.order_placed(&placed, &auth.id);

    Ok((
        StatusCode::CREATED,
        Json(OrderResponse {
            message: "Order created".to_string(),
            order: placed.order,
        }),
    ))
}

async fn my_orders(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<Json<Vec<Order>>> {
    Ok(Json(state.db.orders().list_for_user(&auth.id).await?))
}

#[derive(Debug, Serialize)]
pub struct OrderDetail {
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub history: Vec<OrderHistoryEntry>,
}

async fn get_order(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> ApiResult<Json<OrderDetail>> {
    let orders = state.db.orders();

    let order = orders
        .get(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Order not found"))?;

    if !auth.is_admin() && order.user_id.as_deref() != Some(auth.id.as_str()) {
        return Err(ApiError::forbidden("You do not have access to this order"));
    }

    let items = orders.items(id).await?;
    let history = orders.history(id).await?;

    Ok(Json(OrderDetail {
        order,
        items,
        history,
    }))
}

async fn cancel_order(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> ApiResult<Json<MessageResponse>> {
    state.db.orders().cancel(id, &auth.id).await?;
    info!(order_id = id, user_id = %auth.id, "Order cancelled by customer");

    Ok(Json(MessageResponse::new("Order cancelled")))
}

// =============================================================================
// Admin
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl ListQuery {
    fn into_filter(self) -> ApiResult<OrderFilter> {
        let defaults = OrderFilter::default();

        let status = match self.status.as_deref().map(str::trim) {
            Some(s) if !s.is_empty() => Some(OrderStatus::from_str(s)?),
            _ => None,
        };

        Ok(OrderFilter {
            status,
            page: self.page.filter(|p| *p >= 1).unwrap_or(defaults.page),
            limit: self
                .limit
                .filter(|l| *l >= 1)
                .map_or(defaults.limit, |l| l.min(MAX_PAGE_SIZE)),
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
}

impl Pagination {
    fn new(page: i64, limit: i64, total: i64) -> Self {
        Pagination {
            page,
            limit,
            total,
            total_pages: (total + limit - 1) / limit,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OrderPage {
    pub orders: Vec<OrderWithCustomer>,
    pub pagination: Pagination,
}

async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<OrderPage>> {
    let filter = query.into_filter()?;
    let (orders, total) = state.db.orders().list(filter).await?;

    Ok(Json(OrderPage {
        orders,
        pagination: Pagination::new(filter.page, filter.limit, total),
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusRequest {
    pub order_status: Option<String>,
    pub payment_status: Option<String>,
    pub note: Option<String>,
}

impl StatusRequest {
    fn into_update(self) -> ApiResult<StatusUpdate> {
        let order_status = match optional_text(self.order_status.as_deref()) {
            Some(s) => Some(OrderStatus::from_str(&s)?),
            None => None,
        };
        let payment_status = match optional_text(self.payment_status.as_deref()) {
            Some(s) => Some(PaymentStatus::from_str(&s)?),
            None => None,
        };

        if order_status.is_none() && payment_status.is_none() {
            return Err(ApiError::bad_request("orderStatus or paymentStatus is required"));
        }

        Ok(StatusUpdate {
            order_status,
            payment_status,
            note: optional_text(self.note.as_deref()),
        })
    }
}

async fn update_status(
    State(state): State<AppState>,
    Extension(admin): Extension<AuthUser>,
    Path(id): Path<i64>,
    Json(req): Json<StatusRequest>,
) -> ApiResult<Json<OrderResponse>> {
    let update = req.into_update()?;

    let change = state.db.orders().update_status(id, update, &admin.id).await?;
    info!(
        order_id = id,
        from = %change.previous_status,
        to = %change.order.order_status,
        payment = %change.order.payment_status,
        "Order status updated"
    );

    if let Some(status) = change.changed_to() {
        state
            .notifier
            .order_status_changed(change.order.user_id.clone(), id, status);
    }

    Ok(Json(OrderResponse {
        message: "Order status updated".to_string(),
        order: change.order,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingRequest {
    pub cargo_company: Option<String>,
    pub tracking_number: Option<String>,
    pub estimated_delivery_date: Option<String>,
}

async fn update_shipping(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<ShippingRequest>,
) -> ApiResult<Json<OrderResponse>> {
    let update = ShippingUpdate {
        cargo_company: optional_text(req.cargo_company.as_deref()),
        tracking_number: optional_text(req.tracking_number.as_deref()),
        estimated_delivery_date: optional_text(req.estimated_delivery_date.as_deref()),
    };

    let order = state.db.orders().update_shipping(id, &update).await?;
    info!(order_id = id, "Shipping details updated");

    Ok(Json(OrderResponse {
        message: "Shipping details updated".to_string(),
        order,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteRequest {
    pub admin_note: Option<String>,
}

async fn update_note(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<NoteRequest>,
) -> ApiResult<Json<OrderResponse>> {
    let note = optional_text(req.admin_note.as_deref());
    let order = state.db.orders().set_admin_note(id, note.as_deref()).await?;

    Ok(Json(OrderResponse {
        message: "Admin note saved".to_string(),
        order,
    }))
}
