//! # Cart Repository
//!
//! Per-user carts with stock-checked line items.
//!
//! ## Add to Cart
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  add_item(user, product, qty)            one transaction               │
//! │                                                                         │
//! │  1. load product (must be active)         → ProductNotFound            │
//! │  2. read quantity already in the cart                                  │
//! │  3. check_cart_addition(stock, in_cart, qty)                           │
//! │        can_add <= 0                       → OutOfStock                 │
//! │        can_add <  qty                     → CartLimitReached           │
//! │  4. create the cart row if missing                                     │
//! │  5. upsert the line: quantity = quantity + qty                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::begin_write;
use storefront_core::checkout::{check_cart_addition, check_cart_quantity};
use storefront_core::{CartItem, CartLine, CoreError, Product};

use crate::repository::product::PRODUCT_COLUMNS;

#[derive(Debug, Clone)]
pub struct CartRepository {
    pool: SqlitePool,
}

impl CartRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CartRepository { pool }
    }

    /// The caller's cart lines joined with product name and price.
    pub async fn lines(&self, user_id: &str) -> DbResult<Vec<CartLine>> {
        let lines = sqlx::query_as::<_, CartLine>(
            "SELECT p.id, p.name, p.price_cents, p.image_url, ci.quantity
             FROM cart_items ci
             JOIN carts c ON c.id = ci.cart_id
             JOIN products p ON p.id = ci.product_id
             WHERE c.user_id = ?1
             ORDER BY ci.added_at, ci.id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(lines)
    }

    /// Adds `quantity` units of a product, creating the cart when needed.
    pub async fn add_item(&self, user_id: &str, product_id: i64, quantity: i64) -> DbResult<CartItem> {
        debug!(user_id, product_id, quantity, "Adding to cart");

        let now = Utc::now();
        let mut tx = begin_write(&self.pool).await?;

        let product = active_product(&mut tx, product_id).await?;

        let in_cart: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(ci.quantity), 0) FROM cart_items ci
             JOIN carts c ON c.id = ci.cart_id
             WHERE c.user_id = ?1 AND ci.product_id = ?2",
        )
        .bind(user_id)
        .bind(product_id)
        .fetch_one(&mut *tx)
        .await?;

        check_cart_addition(&product.name, product.stock_quantity, in_cart, quantity)?;

        sqlx::query("INSERT OR IGNORE INTO carts (user_id, created_at) VALUES (?1, ?2)")
            .bind(user_id)
            .bind(now)
            .execute(&mut *tx)
            .await?;

        let cart_id: i64 = sqlx::query_scalar("SELECT id FROM carts WHERE user_id = ?1")
            .bind(user_id)
            .fetch_one(&mut *tx)
            .await?;

        let item = sqlx::query_as::<_, CartItem>(
            "INSERT INTO cart_items (cart_id, product_id, quantity, added_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (cart_id, product_id) DO UPDATE SET quantity = quantity + excluded.quantity
             RETURNING id, cart_id, product_id, quantity, added_at",
        )
        .bind(cart_id)
        .bind(product_id)
        .bind(quantity)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(item)
    }

    /// Sets a line to exactly `quantity` units. Zero removes the line.
    ///
    /// ## Returns
    /// * `Ok(Some(item))` - line updated
    /// * `Ok(None)` - line removed
    /// * `Err(NotFound)` - no cart, or the product is not in it
    pub async fn set_quantity(
        &self,
        user_id: &str,
        product_id: i64,
        quantity: i64,
    ) -> DbResult<Option<CartItem>> {
        debug!(user_id, product_id, quantity, "Setting cart quantity");

        let mut tx = begin_write(&self.pool).await?;

        if quantity > 0 {
            let product = active_product(&mut tx, product_id).await?;
            check_cart_quantity(&product.name, product.stock_quantity, quantity)?;
        }

        let cart_id = cart_id(&mut tx, user_id).await?;

        let item = if quantity == 0 {
            let result = sqlx::query("DELETE FROM cart_items WHERE cart_id = ?1 AND product_id = ?2")
                .bind(cart_id)
                .bind(product_id)
                .execute(&mut *tx)
                .await?;

            if result.rows_affected() == 0 {
                return Err(DbError::not_found("Cart item", product_id));
            }
            None
        } else {
            let item = sqlx::query_as::<_, CartItem>(
                "UPDATE cart_items SET quantity = ?3
                 WHERE cart_id = ?1 AND product_id = ?2
                 RETURNING id, cart_id, product_id, quantity, added_at",
            )
            .bind(cart_id)
            .bind(product_id)
            .bind(quantity)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| DbError::not_found("Cart item", product_id))?;
            Some(item)
        };

        tx.commit().await?;
        Ok(item)
    }

    /// Removes a product's line from the caller's cart.
    pub async fn remove_item(&self, user_id: &str, product_id: i64) -> DbResult<()> {
        let mut tx = begin_write(&self.pool).await?;
        let cart_id = cart_id(&mut tx, user_id).await?;

        let result = sqlx::query("DELETE FROM cart_items WHERE cart_id = ?1 AND product_id = ?2")
            .bind(cart_id)
            .bind(product_id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Cart item", product_id));
        }

        tx.commit().await?;
        Ok(())
    }
}

/// Empties a user's cart inside an existing transaction.
pub(crate) async fn clear_in_tx(tx: &mut Transaction<'_, Sqlite>, user_id: &str) -> DbResult<u64> {
    let result = sqlx::query(
        "DELETE FROM cart_items WHERE cart_id IN (SELECT id FROM carts WHERE user_id = ?1)",
    )
    .bind(user_id)
    .execute(&mut **tx)
    .await?;

    Ok(result.rows_affected())
}

async fn active_product(tx: &mut Transaction<'_, Sqlite>, product_id: i64) -> DbResult<Product> {
    let product = sqlx::query_as::<_, Product>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1 AND is_active = 1"
    ))
    .bind(product_id)
    .fetch_optional(&mut **tx)
    .await?;

    product.ok_or_else(|| CoreError::ProductNotFound(product_id).into())
}

async fn cart_id(tx: &mut Transaction<'_, Sqlite>, user_id: &str) -> DbResult<i64> {
    let id: Option<i64> = sqlx::query_scalar("SELECT id FROM carts WHERE user_id = ?1")
        .bind(user_id)
        .fetch_optional(&mut **tx)
        .await?;

    id.ok_or_else(|| DbError::not_found("Cart", user_id))
}
