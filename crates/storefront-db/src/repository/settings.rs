//! # Settings Repository
//!
//! Key/value switches that control the storefront.
//!
//! ```text
//! settings
//! ┌───────────────────────┬──────────────────────┐
//! │ key                   │ value                │
//! ├───────────────────────┼──────────────────────┤
//! │ sales_active          │ "true" / "false"     │
//! │ out_of_stock_behavior │ "hide" / "show_as_…" │
//! └───────────────────────┴──────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::error::DbResult;
use crate::repository::begin_write;
use storefront_core::StoreSettings;

#[derive(Debug, Clone)]
pub struct SettingsRepository {
    pool: SqlitePool,
}

impl SettingsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SettingsRepository { pool }
    }

    /// Every setting as raw strings, ordered by key.
    pub async fn get_all(&self) -> DbResult<BTreeMap<String, String>> {
        let rows = sqlx::query_as::<_, (String, String)>("SELECT key, value FROM settings")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().collect())
    }

    /// Reads a single raw value.
    pub async fn get(&self, key: &str) -> DbResult<Option<String>> {
        let value = sqlx::query_scalar::<_, String>("SELECT value FROM settings WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(value)
    }

    /// Upserts every pair in one transaction.
    pub async fn upsert_many(&self, pairs: &[(String, String)]) -> DbResult<()> {
        debug!(count = pairs.len(), "Updating settings");

        let now = Utc::now();
        let mut tx = begin_write(&self.pool).await?;

        for (key, value) in pairs {
            sqlx::query(
                "INSERT INTO settings (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT (key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            )
            .bind(key)
            .bind(value)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Upserts one value.
    pub async fn set(&self, key: &str, value: &str) -> DbResult<()> {
        self.upsert_many(&[(key.to_string(), value.to_string())]).await
    }

    /// Typed view used by the cart gate and product listing.
    ///
    /// A failed read falls back to the defaults (sales closed, sold-out hidden).
    pub async fn store_settings(&self) -> StoreSettings {
        match self.get_all().await {
            Ok(map) => StoreSettings::from_pairs(map.iter().map(|(k, v)| (k.as_str(), v.as_str()))),
            Err(e) => {
                warn!(error = %e, "Failed to read settings, using defaults");
                StoreSettings::default()
            }
        }
    }
}
