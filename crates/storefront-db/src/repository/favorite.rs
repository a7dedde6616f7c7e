//! Wish list: products a customer marked as favorite.

use chrono::Utc;
use sqlx::SqlitePool;

use crate::error::{DbError, DbResult};
use storefront_core::{CoreError, FavoriteProduct};

#[derive(Debug, Clone)]
pub struct FavoriteRepository {
    pool: SqlitePool,
}

impl FavoriteRepository {
    pub fn new(pool: SqlitePool) -> Self {
        FavoriteRepository { pool }
    }

    /// Favorite products with the time they were added, newest first.
    pub async fn list(&self, user_id: &str) -> DbResult<Vec<FavoriteProduct>> {
        let favorites = sqlx::query_as::<_, FavoriteProduct>(
            "SELECT p.id, p.name, p.description, p.price_cents, p.image_url, p.stock_quantity,
                    p.is_active, p.out_of_stock_display_rule, p.critical_stock_threshold,
                    p.created_at, p.updated_at, f.created_at AS favorited_at
             FROM favorites f
             JOIN products p ON p.id = f.product_id
             WHERE f.user_id = ?1
             ORDER BY f.created_at DESC, f.id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(favorites)
    }

    /// Adds a favorite.
    ///
    /// ## Returns
    /// * `Ok(Some(id))` - the new favorite row
    /// * `Ok(None)` - already a favorite
    /// * `Err(ProductNotFound)` - no such product
    pub async fn add(&self, user_id: &str, product_id: i64) -> DbResult<Option<i64>> {
        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM products WHERE id = ?1")
            .bind(product_id)
            .fetch_optional(&self.pool)
            .await?;
        if exists.is_none() {
            return Err(CoreError::ProductNotFound(product_id).into());
        }

        let id: Option<i64> = sqlx::query_scalar(
            "INSERT INTO favorites (user_id, product_id, created_at) VALUES (?1, ?2, ?3)
             ON CONFLICT (user_id, product_id) DO NOTHING
             RETURNING id",
        )
        .bind(user_id)
        .bind(product_id)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        Ok(id)
    }

    pub async fn remove(&self, user_id: &str, product_id: i64) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM favorites WHERE user_id = ?1 AND product_id = ?2")
            .bind(user_id)
            .bind(product_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Favorite", product_id));
        }

        Ok(())
    }

    pub async fn is_favorite(&self, user_id: &str, product_id: i64) -> DbResult<bool> {
        let found: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM favorites WHERE user_id = ?1 AND product_id = ?2)",
        )
        .bind(user_id)
        .bind(product_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(found)
    }
}
