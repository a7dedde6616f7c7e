//! # Category Repository
//!
//! Categories and the many-to-many links between products and categories.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::begin_write;
use crate::repository::product::PRODUCT_COLUMNS;
use storefront_core::{Category, Product};

#[derive(Debug, Clone)]
pub struct CategoryRepository {
    pool: SqlitePool,
}

impl CategoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CategoryRepository { pool }
    }

    /// All categories ordered by name.
    pub async fn list(&self) -> DbResult<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT id, name, created_at FROM categories ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }

    pub async fn get(&self, id: i64) -> DbResult<Option<Category>> {
        let category = sqlx::query_as::<_, Category>(
            "SELECT id, name, created_at FROM categories WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(category)
    }

    /// Products linked to a category, ordered by name.
    pub async fn products_in(&self, category_id: i64) -> DbResult<Vec<Product>> {
        let columns = prefixed_product_columns();
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {columns} FROM products p
             JOIN product_categories pc ON pc.product_id = p.id
             WHERE pc.category_id = ?1
             ORDER BY p.name"
        ))
        .bind(category_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Creates a category. `name` must already be trimmed and validated.
    pub async fn create(&self, name: &str) -> DbResult<Category> {
        debug!(name, "Creating category");

        let category = sqlx::query_as::<_, Category>(
            "INSERT INTO categories (name, created_at) VALUES (?1, ?2)
             RETURNING id, name, created_at",
        )
        .bind(name)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| name_conflict(e, name))?;

        Ok(category)
    }

    pub async fn rename(&self, id: i64, name: &str) -> DbResult<Category> {
        let category = sqlx::query_as::<_, Category>(
            "UPDATE categories SET name = ?2 WHERE id = ?1 RETURNING id, name, created_at",
        )
        .bind(id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| name_conflict(e, name))?;

        category.ok_or_else(|| DbError::not_found("Category", id))
    }

    /// Deletes a category and its product links, returning the removed row.
    pub async fn delete(&self, id: i64) -> DbResult<Category> {
        let category = sqlx::query_as::<_, Category>(
            "DELETE FROM categories WHERE id = ?1 RETURNING id, name, created_at",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        category.ok_or_else(|| DbError::not_found("Category", id))
    }

    /// Categories a product belongs to, ordered by name.
    pub async fn for_product(&self, product_id: i64) -> DbResult<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT c.id, c.name, c.created_at FROM categories c
             JOIN product_categories pc ON pc.category_id = c.id
             WHERE pc.product_id = ?1
             ORDER BY c.name",
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }

    /// Links a product to a category.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - product or category missing
    /// * `Err(DbError::UniqueViolation)` - link already exists
    pub async fn link(&self, product_id: i64, category_id: i64) -> DbResult<()> {
        let mut tx = begin_write(&self.pool).await?;

        ensure_exists(&mut tx, "products", "Product", product_id).await?;
        ensure_exists(&mut tx, "categories", "Category", category_id).await?;

        sqlx::query(
            "INSERT INTO product_categories (product_id, category_id, created_at) VALUES (?1, ?2, ?3)",
        )
        .bind(product_id)
        .bind(category_id)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => {
                DbError::duplicate("product category", format!("{product_id}/{category_id}"))
            }
            other => other,
        })?;

        tx.commit().await?;
        Ok(())
    }

    pub async fn unlink(&self, product_id: i64, category_id: i64) -> DbResult<()> {
        let result = sqlx::query(
            "DELETE FROM product_categories WHERE product_id = ?1 AND category_id = ?2",
        )
        .bind(product_id)
        .bind(category_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found(
                "Product category",
                format!("{product_id}/{category_id}"),
            ));
        }

        Ok(())
    }

    /// Links many products to one category in a single transaction.
    ///
    /// Existing links are skipped. A missing product or category rolls the
    /// whole batch back. Returns the number of links added.
    pub async fn bulk_assign(&self, product_ids: &[i64], category_id: i64) -> DbResult<u64> {
        debug!(category_id, count = product_ids.len(), "Bulk assigning category");

        let now = Utc::now();
        let mut tx = begin_write(&self.pool).await?;

        ensure_exists(&mut tx, "categories", "Category", category_id).await?;

        let mut added = 0;
        for &product_id in product_ids {
            ensure_exists(&mut tx, "products", "Product", product_id).await?;

            let result = sqlx::query(
                "INSERT OR IGNORE INTO product_categories (product_id, category_id, created_at)
                 VALUES (?1, ?2, ?3)",
            )
            .bind(product_id)
            .bind(category_id)
            .bind(now)
            .execute(&mut *tx)
            .await?;

            added += result.rows_affected();
        }

        tx.commit().await?;
        Ok(added)
    }
}

fn prefixed_product_columns() -> String {
    PRODUCT_COLUMNS
        .split(',')
        .map(|c| format!("p.{}", c.trim()))
        .collect::<Vec<_>>()
        .join(", ")
}

async fn ensure_exists(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    table: &str,
    entity: &str,
    id: i64,
) -> DbResult<()> {
    let found: Option<i64> = sqlx::query_scalar(&format!("SELECT id FROM {table} WHERE id = ?1"))
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;

    match found {
        Some(_) => Ok(()),
        None => Err(DbError::not_found(entity, id)),
    }
}

fn name_conflict(err: sqlx::Error, name: &str) -> DbError {
    match DbError::from(err) {
        DbError::UniqueViolation { .. } => DbError::duplicate("category name", name),
        other => other,
    }
}
