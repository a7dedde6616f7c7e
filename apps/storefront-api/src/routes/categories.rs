//! Categories and product links.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::auth::require_admin;
use crate::error::{ApiError, ApiResult};
use crate::AppState;
use storefront_core::validation::validate_category_name;
use storefront_core::{Category, Product};
use storefront_db::DbError;

use super::MessageResponse;

pub fn router(state: &AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/", get(list_categories))
        .route("/{id}", get(get_category))
        .route("/product/{product_id}", get(product_categories));

    let admin = Router::new()
        .route("/", post(create_category))
        .route("/{id}", put(rename_category).delete(delete_category))
        .route(
            "/product/{product_id}/category/{category_id}",
            post(link_category).delete(unlink_category),
        )
        .route("/bulk-assign", post(bulk_assign))
        .route_layer(from_fn_with_state(state.clone(), require_admin));

    public.merge(admin)
}

#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    pub name: Option<String>,
}

impl CategoryRequest {
    fn name(&self) -> ApiResult<String> {
        Ok(validate_category_name(self.name.as_deref().unwrap_or_default())?)
    }
}

#[derive(Debug, Serialize)]
pub struct CategoryDetail {
    pub category: Category,
    pub products: Vec<Product>,
}

#[derive(Debug, Serialize)]
pub struct CategoryDeleted {
    pub message: String,
    pub category: Category,
}

async fn list_categories(State(state): State<AppState>) -> ApiResult<Json<Vec<Category>>> {
    Ok(Json(state.db.categories().list().await?))
}

async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<CategoryDetail>> {
    let categories = state.db.categories();

    let category = categories
        .get(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Category not found"))?;
    let products = categories.products_in(id).await?;

    Ok(Json(CategoryDetail { category, products }))
}

async fn product_categories(
    State(state): State<AppState>,
    Path(product_id): Path<i64>,
) -> ApiResult<Json<Vec<Category>>> {
    Ok(Json(state.db.categories().for_product(product_id).await?))
}

async fn create_category(
    State(state): State<AppState>,
    Json(req): Json<CategoryRequest>,
) -> ApiResult<(StatusCode, Json<Category>)> {
    let category = state.db.categories().create(&req.name()?).await?;
    info!(category_id = category.id, name = %category.name, "Category created");

    Ok((StatusCode::CREATED, Json(category)))
}

async fn rename_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<CategoryRequest>,
) -> ApiResult<Json<Category>> {
    let category = state.db.categories().rename(id, &req.name()?).await?;
    Ok(Json(category))
}

async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<CategoryDeleted>> {
    let category = state.db.categories().delete(id).await?;
    info!(category_id = id, "Category deleted");

    Ok(Json(CategoryDeleted {
        message: "Category deleted".to_string(),
        category,
    }))
}

async fn link_category(
    State(state): State<AppState>,
    Path((product_id, category_id)): Path<(i64, i64)>,
) -> ApiResult<(StatusCode, Json<MessageResponse>)> {
    state.db.categories().link(product_id, category_id).await?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new("Category added to product")),
    ))
}

async fn unlink_category(
    State(state): State<AppState>,
    Path((product_id, category_id)): Path<(i64, i64)>,
) -> ApiResult<Json<MessageResponse>> {
    state.db.categories().unlink(product_id, category_id).await?;
    Ok(Json(MessageResponse::new("Category removed from product")))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkAssignRequest {
    #[serde(default)]
    pub product_ids: Vec<i64>,
    pub category_id: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkAssignResponse {
    pub message: String,
    pub added_count: u64,
}

async fn bulk_assign(
    State(state): State<AppState>,
    Json(req): Json<BulkAssignRequest>,
) -> ApiResult<Json<BulkAssignResponse>> {
    if req.product_ids.is_empty() {
        return Err(ApiError::bad_request("productIds must not be empty"));
    }
    let category_id = req
        .category_id
        .ok_or_else(|| ApiError::bad_request("categoryId is required"))?;

    let added = match state.db.categories().bulk_assign(&req.product_ids, category_id).await {
        Ok(added) => added,
        // A bad id in the request body is the caller's mistake, not a missing resource.
        Err(DbError::NotFound { entity, id }) => {
            return Err(ApiError::bad_request(format!("{entity} {id} does not exist")));
        }
        Err(e) => return Err(e.into()),
    };

    info!(category_id, added, "Categories bulk assigned");
    Ok(Json(BulkAssignResponse {
        message: format!("{added} products added to category"),
        added_count: added,
    }))
}
