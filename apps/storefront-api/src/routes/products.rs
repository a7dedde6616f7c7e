//! # Product Routes
//!
//! Catalog reads for everyone, multipart CRUD for admins.
//!
//! ## Image Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  multipart body                                                         │
//! │      │                                                                  │
//! │      ▼                                                                  │
//! │  read_form ── productImage ──► save_image ──► /uploads/productImage-…  │
//! │      │                                                                  │
//! │      ▼                                                                  │
//! │  validate fields ──► repository write                                  │
//! │      │                     │                                            │
//! │      │ rejected            │ committed                                  │
//! │      ▼                     ▼                                            │
//! │  new file removed      previous file removed (replaced or cleared)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;
use std::str::FromStr;

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post, put};
use axum::{Extension, Json, Router};
use tracing::{debug, info};

use crate::auth::{optional_auth, require_admin, AuthUser};
use crate::error::{ApiError, ApiResult};
use crate::uploads::{self, StoredImage};
use crate::AppState;
use storefront_core::validation::{
    optional_text, validate_price_cents, validate_product_name, validate_stock,
    validate_stock_threshold,
};
use storefront_core::{Money, OutOfStockRule, Product, ValidationError};
use storefront_db::ProductInput;

/// Multipart field carrying the product image.
const IMAGE_FIELD: &str = "productImage";

pub fn router(state: &AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/", get(list_products))
        .route("/{id}", get(get_product))
        .route_layer(from_fn_with_state(state.clone(), optional_auth));

    let admin = Router::new()
        .route("/", post(create_product))
        .route("/{id}", put(update_product).delete(delete_product))
        .route_layer(from_fn_with_state(state.clone(), require_admin));

    public.merge(admin)
}

// =============================================================================
// Reads
// =============================================================================

async fn list_products(
    State(state): State<AppState>,
    auth: Option<Extension<AuthUser>>,
) -> ApiResult<Json<Vec<Product>>> {
    let products = state.db.products();

    let list = match auth {
        Some(Extension(user)) if user.is_admin() => products.list_all().await?,
        _ => {
            let settings = state.db.settings().store_settings().await;
            products.list_visible(&settings).await?
        }
    };

    Ok(Json(list))
}

async fn get_product(
    State(state): State<AppState>,
    auth: Option<Extension<AuthUser>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Product>> {
    let products = state.db.products();
    let is_admin = auth.is_some_and(|Extension(user)| user.is_admin());

    let product = if is_admin {
        products.get_by_id(id).await?
    } else {
        products.get_active(id).await?
    };

    product
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Product not found"))
}

// =============================================================================
// Multipart Form
// =============================================================================

/// Text fields plus the image already written to disk, if one was sent.
#[derive(Debug, Default)]
struct ProductForm {
    fields: HashMap<String, String>,
    image: Option<StoredImage>,
}

impl ProductForm {
    fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    fn flag(&self, name: &str) -> ApiResult<Option<bool>> {
        self.text(name).map(|v| parse_flag(name, v)).transpose()
    }

    fn integer(&self, name: &str) -> ApiResult<Option<i64>> {
        match self.text(name).map(str::trim).filter(|v| !v.is_empty()) {
            Some(v) => v.parse::<i64>().map(Some).map_err(|_| {
                ValidationError::InvalidFormat {
                    field: name.to_string(),
                    reason: "must be a whole number".to_string(),
                }
                .into()
            }),
            None => Ok(None),
        }
    }

    /// Builds the repository input. `current` supplies fallbacks on update.
    fn to_input(&self, current: Option<&Product>) -> ApiResult<ProductInput> {
        let name = validate_product_name(self.text("name").unwrap_or_default())?;

        let price = Money::parse_decimal(self.text("price").unwrap_or_default())?;
        validate_price_cents(price.cents())?;

        let stock_quantity = match self.integer("stock_quantity")? {
            Some(stock) => stock,
            None => current.map_or(0, |p| p.stock_quantity),
        };
        validate_stock(stock_quantity)?;

        let critical_stock_threshold = self.integer("critical_stock_threshold")?;
        validate_stock_threshold(critical_stock_threshold)?;

        let out_of_stock_display_rule = match self.text("out_of_stock_display_rule") {
            Some(rule) if !rule.trim().is_empty() => OutOfStockRule::from_str(rule.trim())?,
            _ => OutOfStockRule::Default,
        };

        Ok(ProductInput {
            name,
            description: optional_text(self.text("description")),
            price_cents: price.cents(),
            image_url: current.and_then(|p| p.image_url.clone()),
            stock_quantity,
            is_active: match self.flag("is_active")? {
                Some(active) => active,
                None => current.map_or(true, |p| p.is_active),
            },
            out_of_stock_display_rule,
            critical_stock_threshold,
        })
    }

    /// Removes the uploaded file after a rejected request.
    async fn discard(self) {
        if let Some(image) = self.image {
            debug!(file = %image.path.display(), "Discarding rejected upload");
            uploads::remove_file(&image.path).await;
        }
    }
}

fn parse_flag(field: &str, value: &str) -> ApiResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "on" | "yes" => Ok(true),
        "false" | "0" | "off" | "no" | "" => Ok(false),
        _ => Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "must be true or false".to_string(),
        }
        .into()),
    }
}

/// Drains the multipart body. An image saved before a later failure is
/// removed before the error is returned.
async fn read_form(state: &AppState, mut multipart: Multipart) -> ApiResult<ProductForm> {
    let mut form = ProductForm::default();

    match read_fields(state, &mut multipart, &mut form).await {
        Ok(()) => Ok(form),
        Err(e) => {
            form.discard().await;
            Err(e)
        }
    }
}

async fn read_fields(
    state: &AppState,
    multipart: &mut Multipart,
    form: &mut ProductForm,
) -> ApiResult<()> {
    while let Some(field) = multipart.next_field().await? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        if name != IMAGE_FIELD {
            let value = field.text().await?;
            form.fields.insert(name, value);
            continue;
        }

        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await?;
        if bytes.is_empty() {
            continue;
        }

        let stored = uploads::save_image(
            &state.config.upload_dir,
            file_name.as_deref(),
            content_type.as_deref(),
            &bytes,
        )
        .await?;

        // Only the last image counts.
        if let Some(previous) = form.image.replace(stored) {
            uploads::remove_file(&previous.path).await;
        }
    }

    Ok(())
}

// =============================================================================
// Writes
// =============================================================================

async fn create_product(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<Product>)> {
    let form = read_form(&state, multipart).await?;

    let mut input = match form.to_input(None) {
        Ok(input) => input,
        Err(e) => {
            form.discard().await;
            return Err(e);
        }
    };
    input.image_url = form.image.as_ref().map(|i| i.url.clone());

    match state.db.products().create(&input).await {
        Ok(product) => {
            info!(product_id = product.id, name = %product.name, "Product created");
            Ok((StatusCode::CREATED, Json(product)))
        }
        Err(e) => {
            form.discard().await;
            Err(e.into())
        }
    }
}

async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> ApiResult<Json<Product>> {
    let form = read_form(&state, multipart).await?;

    let current = match state.db.products().get_by_id(id).await {
        Ok(Some(product)) => product,
        Ok(None) => {
            form.discard().await;
            return Err(ApiError::not_found("Product not found"));
        }
        Err(e) => {
            form.discard().await;
            return Err(e.into());
        }
    };

    let remove_current = match form.flag("removeCurrentImage") {
        Ok(flag) => flag.unwrap_or(false),
        Err(e) => {
            form.discard().await;
            return Err(e);
        }
    };

    let mut input = match form.to_input(Some(&current)) {
        Ok(input) => input,
        Err(e) => {
            form.discard().await;
            return Err(e);
        }
    };

    let replaced = form.image.is_some() || remove_current;
    if let Some(image) = &form.image {
        input.image_url = Some(image.url.clone());
    } else if remove_current {
        input.image_url = None;
    }

    let product = match state.db.products().update(id, &input).await {
        Ok(product) => product,
        Err(e) => {
            form.discard().await;
            return Err(e.into());
        }
    };

    if replaced {
        if let Some(old) = current.image_url.as_deref() {
            if product.image_url.as_deref() != Some(old) {
                uploads::remove_by_url(&state.config.upload_dir, old).await;
            }
        }
    }

    info!(product_id = id, "Product updated");
    Ok(Json(product))
}

async fn delete_product(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<StatusCode> {
    let removed = state.db.products().delete(id).await?;

    if let Some(url) = removed.image_url.as_deref() {
        uploads::remove_by_url(&state.config.upload_dir, url).await;
    }

    info!(product_id = id, "Product deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(pairs: &[(&str, &str)]) -> ProductForm {
        ProductForm {
            fields: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            image: None,
        }
    }

    #[test]
    fn test_to_input_defaults() {
        let input = form(&[("name", " Mug "), ("price", "12.50")]).to_input(None).unwrap();
        assert_eq!(input.name, "Mug");
        assert_eq!(input.price_cents, 1250);
        assert_eq!(input.stock_quantity, 0);
        assert!(input.is_active);
        assert_eq!(input.out_of_stock_display_rule, OutOfStockRule::Default);
        assert_eq!(input.critical_stock_threshold, None);
    }

    #[test]
    fn test_to_input_rejects_bad_fields() {
        assert!(form(&[("price", "1.00")]).to_input(None).is_err());
        assert!(form(&[("name", "Mug")]).to_input(None).is_err());
        assert!(form(&[("name", "Mug"), ("price", "0")]).to_input(None).is_err());
        assert!(form(&[("name", "Mug"), ("price", "1"), ("stock_quantity", "-1")])
            .to_input(None)
            .is_err());
        assert!(form(&[("name", "Mug"), ("price", "1"), ("stock_quantity", "many")])
            .to_input(None)
            .is_err());
        assert!(form(&[("name", "Mug"), ("price", "1"), ("out_of_stock_display_rule", "maybe")])
            .to_input(None)
            .is_err());
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("is_active", "true").unwrap());
        assert!(parse_flag("is_active", "1").unwrap());
        assert!(!parse_flag("is_active", "false").unwrap());
        assert!(parse_flag("is_active", "perhaps").is_err());
    }
}
