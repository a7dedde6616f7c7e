//! # Product Repository
//!
//! Database operations for the catalog.
//!
//! ## Storefront Visibility
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Who Sees Which Product                               │
//! │                                                                         │
//! │  admin            → every row, ordered by id                           │
//! │                                                                         │
//! │  everyone else    → is_active = 1 AND                                  │
//! │                     ( stock_quantity > 0                               │
//! │                       OR rule = 'show'                                 │
//! │                       OR (rule = 'default' AND store shows sold-out) ) │
//! │                                                                         │
//! │  Same predicate as Product::is_listed_for, evaluated in SQL.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use storefront_core::{OutOfStockBehavior, OutOfStockRule, Product, StoreSettings};

/// Editable product fields, as accepted by create and update.
#[derive(Debug, Clone)]
pub struct ProductInput {
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub image_url: Option<String>,
    pub stock_quantity: i64,
    pub is_active: bool,
    pub out_of_stock_display_rule: OutOfStockRule,
    pub critical_stock_threshold: Option<i64>,
}

impl Default for ProductInput {
    fn default() -> Self {
        ProductInput {
            name: String::new(),
            description: None,
            price_cents: 0,
            image_url: None,
            stock_quantity: 0,
            is_active: true,
            out_of_stock_display_rule: OutOfStockRule::Default,
            critical_stock_threshold: None,
        }
    }
}

pub(crate) const PRODUCT_COLUMNS: &str = "id, name, description, price_cents, image_url, \
     stock_quantity, is_active, out_of_stock_display_rule, critical_stock_threshold, \
     created_at, updated_at";

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Lists every product, active or not (admin view).
    pub async fn list_all(&self) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Lists the products a visitor may see under the given settings.
    pub async fn list_visible(&self, settings: &StoreSettings) -> DbResult<Vec<Product>> {
        let show_sold_out = settings.out_of_stock_behavior == OutOfStockBehavior::ShowAsOutOfStock;

        debug!(show_sold_out, "Listing storefront products");

        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products
             WHERE is_active = 1
               AND (stock_quantity > 0
                    OR out_of_stock_display_rule = 'show'
                    OR (out_of_stock_display_rule = 'default' AND ?1))
             ORDER BY id"
        ))
        .bind(show_sold_out)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Gets a product by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found
    /// * `Ok(None)` - Product not found
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Gets a product only when it is active.
    pub async fn get_active(&self, id: i64) -> DbResult<Option<Product>> {
        Ok(self.get_by_id(id).await?.filter(|p| p.is_active))
    }

    /// Inserts a new product.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - name already in the catalog
    pub async fn create(&self, input: &ProductInput) -> DbResult<Product> {
        debug!(name = %input.name, "Inserting product");

        let now = Utc::now();

        let product = sqlx::query_as::<_, Product>(&format!(
            "INSERT INTO products (
                name, description, price_cents, image_url, stock_quantity, is_active,
                out_of_stock_display_rule, critical_stock_threshold, created_at, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.price_cents)
        .bind(&input.image_url)
        .bind(input.stock_quantity)
        .bind(input.is_active)
        .bind(input.out_of_stock_display_rule)
        .bind(input.critical_stock_threshold)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| name_conflict(e, &input.name))?;

        Ok(product)
    }

    /// Replaces every editable field of a product.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - Product doesn't exist
    /// * `Err(DbError::UniqueViolation)` - name taken by another product
    pub async fn update(&self, id: i64, input: &ProductInput) -> DbResult<Product> {
        debug!(id, "Updating product");

        let now = Utc::now();

        let product = sqlx::query_as::<_, Product>(&format!(
            "UPDATE products SET
                name = ?2,
                description = ?3,
                price_cents = ?4,
                image_url = ?5,
                stock_quantity = ?6,
                is_active = ?7,
                out_of_stock_display_rule = ?8,
                critical_stock_threshold = ?9,
                updated_at = ?10
             WHERE id = ?1
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(id)
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.price_cents)
        .bind(&input.image_url)
        .bind(input.stock_quantity)
        .bind(input.is_active)
        .bind(input.out_of_stock_display_rule)
        .bind(input.critical_stock_threshold)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| name_conflict(e, &input.name))?;

        product.ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Deletes a product and returns the removed row (for image cleanup).
    ///
    /// Order items keep their snapshot with `product_id` set to NULL.
    pub async fn delete(&self, id: i64) -> DbResult<Product> {
        debug!(id, "Deleting product");

        let product = sqlx::query_as::<_, Product>(&format!(
            "DELETE FROM products WHERE id = ?1 RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        product.ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Counts products (seed idempotency, diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

fn name_conflict(err: sqlx::Error, name: &str) -> DbError {
    match DbError::from(err) {
        DbError::UniqueViolation { .. } => DbError::duplicate("product name", name),
        other => other,
    }
}
