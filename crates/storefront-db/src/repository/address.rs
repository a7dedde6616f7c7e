//! # Address Repository
//!
//! The caller's address book. Every query is scoped by user id, so another
//! user's address looks exactly like a missing one.
//!
//! ## Default Address
//! ```text
//! create(is_default)     first address? ──► always default
//!                        is_default     ──► clear the others first
//! update(is_default)     is_default     ──► clear the others first
//! delete(default)        promote the oldest remaining address
//! set_default(id)        clear all, set one
//! ```
//! A user with any address has exactly one default.

use chrono::Utc;
use serde::Deserialize;
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::begin_write;
use storefront_core::validation::{optional_text, require_text};
use storefront_core::{Address, CoreResult};

const ADDRESS_COLUMNS: &str = "id, user_id, address_title, full_name, phone, city, district, \
     neighborhood, address_line, postal_code, is_default, created_at, updated_at";

/// Address fields as submitted by the client.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AddressInput {
    pub address_title: Option<String>,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub district: Option<String>,
    pub neighborhood: Option<String>,
    pub address_line: Option<String>,
    pub postal_code: Option<String>,
    pub is_default: bool,
}

/// Trimmed, required fields present.
struct CleanAddress {
    address_title: String,
    full_name: String,
    phone: String,
    city: String,
    district: String,
    neighborhood: Option<String>,
    address_line: String,
    postal_code: Option<String>,
}

impl AddressInput {
    fn clean(&self) -> CoreResult<CleanAddress> {
        Ok(CleanAddress {
            address_title: require_text("address_title", self.address_title.as_deref())?,
            full_name: require_text("full_name", self.full_name.as_deref())?,
            phone: require_text("phone", self.phone.as_deref())?,
            city: require_text("city", self.city.as_deref())?,
            district: require_text("district", self.district.as_deref())?,
            neighborhood: optional_text(self.neighborhood.as_deref()),
            address_line: require_text("address_line", self.address_line.as_deref())?,
            postal_code: optional_text(self.postal_code.as_deref()),
        })
    }
}

/// Repository for saved delivery addresses.
#[derive(Debug, Clone)]
pub struct AddressRepository {
    pool: SqlitePool,
}

impl AddressRepository {
    pub fn new(pool: SqlitePool) -> Self {
        AddressRepository { pool }
    }

    /// Default first, then newest.
    pub async fn list(&self, user_id: &str) -> DbResult<Vec<Address>> {
        let addresses = sqlx::query_as::<_, Address>(&format!(
            "SELECT {ADDRESS_COLUMNS} FROM addresses
             WHERE user_id = ?1
             ORDER BY is_default DESC, created_at DESC, id DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(addresses)
    }

    pub async fn get(&self, user_id: &str, id: i64) -> DbResult<Option<Address>> {
        let address = sqlx::query_as::<_, Address>(&format!(
            "SELECT {ADDRESS_COLUMNS} FROM addresses WHERE id = ?1 AND user_id = ?2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(address)
    }

    /// Saves a new address. The caller's first address is always the default.
    pub async fn create(&self, user_id: &str, input: &AddressInput) -> DbResult<Address> {
        let clean = input.clean()?;
        let now = Utc::now();
        let mut tx = begin_write(&self.pool).await?;

        let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM addresses WHERE user_id = ?1")
            .bind(user_id)
            .fetch_one(&mut *tx)
            .await?;

        let is_default = input.is_default || existing == 0;
        if is_default {
            clear_default(&mut tx, user_id).await?;
        }

        let address = sqlx::query_as::<_, Address>(&format!(
            "INSERT INTO addresses (
                user_id, address_title, full_name, phone, city, district,
                neighborhood, address_line, postal_code, is_default, created_at, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)
             RETURNING {ADDRESS_COLUMNS}"
        ))
        .bind(user_id)
        .bind(&clean.address_title)
        .bind(&clean.full_name)
        .bind(&clean.phone)
        .bind(&clean.city)
        .bind(&clean.district)
        .bind(&clean.neighborhood)
        .bind(&clean.address_line)
        .bind(&clean.postal_code)
        .bind(is_default)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!(user_id, address_id = address.id, is_default, "Address created");
        Ok(address)
    }

    /// Rewrites an address. `is_default = false` leaves the current flag alone.
    pub async fn update(&self, user_id: &str, id: i64, input: &AddressInput) -> DbResult<Address> {
        let clean = input.clean()?;
        let mut tx = begin_write(&self.pool).await?;

        ensure_owned(&mut tx, user_id, id).await?;
        if input.is_default {
            clear_default(&mut tx, user_id).await?;
        }

        let address = sqlx::query_as::<_, Address>(&format!(
            "UPDATE addresses SET
                address_title = ?3, full_name = ?4, phone = ?5, city = ?6, district = ?7,
                neighborhood = ?8, address_line = ?9, postal_code = ?10,
                is_default = CASE WHEN ?11 THEN 1 ELSE is_default END,
                updated_at = ?12
             WHERE id = ?1 AND user_id = ?2
             RETURNING {ADDRESS_COLUMNS}"
        ))
        .bind(id)
        .bind(user_id)
        .bind(&clean.address_title)
        .bind(&clean.full_name)
        .bind(&clean.phone)
        .bind(&clean.city)
        .bind(&clean.district)
        .bind(&clean.neighborhood)
        .bind(&clean.address_line)
        .bind(&clean.postal_code)
        .bind(input.is_default)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(address)
    }

    /// Deletes an address, promoting the oldest remaining one if it was the default.
    pub async fn delete(&self, user_id: &str, id: i64) -> DbResult<()> {
        let mut tx = begin_write(&self.pool).await?;

        let was_default: bool = sqlx::query_scalar(
            "DELETE FROM addresses WHERE id = ?1 AND user_id = ?2 RETURNING is_default",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DbError::not_found("Address", id))?;

        if was_default {
            sqlx::query(
                "UPDATE addresses SET is_default = 1
                 WHERE id = (
                    SELECT id FROM addresses WHERE user_id = ?1
                    ORDER BY created_at ASC, id ASC LIMIT 1
                 )",
            )
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Makes `id` the caller's only default address.
    pub async fn set_default(&self, user_id: &str, id: i64) -> DbResult<()> {
        let mut tx = begin_write(&self.pool).await?;

        ensure_owned(&mut tx, user_id, id).await?;
        clear_default(&mut tx, user_id).await?;

        sqlx::query("UPDATE addresses SET is_default = 1, updated_at = ?3 WHERE id = ?1 AND user_id = ?2")
            .bind(id)
            .bind(user_id)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}

async fn ensure_owned(tx: &mut Transaction<'_, Sqlite>, user_id: &str, id: i64) -> DbResult<()> {
    let found: Option<i64> =
        sqlx::query_scalar("SELECT id FROM addresses WHERE id = ?1 AND user_id = ?2")
            .bind(id)
            .bind(user_id)
            .fetch_optional(&mut **tx)
            .await?;

    found.map(|_| ()).ok_or_else(|| DbError::not_found("Address", id))
}

async fn clear_default(tx: &mut Transaction<'_, Sqlite>, user_id: &str) -> DbResult<()> {
    sqlx::query("UPDATE addresses SET is_default = 0 WHERE user_id = ?1 AND is_default = 1")
        .bind(user_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{test_db, user};
    use storefront_core::{CoreError, Role};

    fn input(title: &str, is_default: bool) -> AddressInput {
        AddressInput {
            address_title: Some(title.to_string()),
            full_name: Some("Ada Lovelace".to_string()),
            phone: Some("5550001122".to_string()),
            city: Some("London".to_string()),
            district: Some("Marylebone".to_string()),
            neighborhood: None,
            address_line: Some("1 Analytical St".to_string()),
            postal_code: Some(" ".to_string()),
            is_default,
        }
    }

    fn defaults(addresses: &[Address]) -> Vec<&str> {
        addresses
            .iter()
            .filter(|a| a.is_default)
            .map(|a| a.address_title.as_str())
            .collect()
    }

    #[tokio::test]
    async fn test_first_address_is_default() {
        let db = test_db().await;
        let u = user(&db, "ada@example.com", Role::Customer).await;

        let home = db.addresses().create(&u.id, &input("Home", false)).await.unwrap();
        assert!(home.is_default);
        assert_eq!(home.postal_code, None);

        let work = db.addresses().create(&u.id, &input("Work", false)).await.unwrap();
        assert!(!work.is_default);

        let list = db.addresses().list(&u.id).await.unwrap();
        assert_eq!(list[0].address_title, "Home");
        assert_eq!(defaults(&list), vec!["Home"]);
    }

    #[tokio::test]
    async fn test_single_default_across_operations() {
        let db = test_db().await;
        let u = user(&db, "ada@example.com", Role::Customer).await;

        let home = db.addresses().create(&u.id, &input("Home", false)).await.unwrap();
        let work = db.addresses().create(&u.id, &input("Work", true)).await.unwrap();
        assert_eq!(defaults(&db.addresses().list(&u.id).await.unwrap()), vec!["Work"]);

        db.addresses().set_default(&u.id, home.id).await.unwrap();
        assert_eq!(defaults(&db.addresses().list(&u.id).await.unwrap()), vec!["Home"]);

        db.addresses().update(&u.id, work.id, &input("Office", true)).await.unwrap();
        assert_eq!(defaults(&db.addresses().list(&u.id).await.unwrap()), vec!["Office"]);

        db.addresses().delete(&u.id, work.id).await.unwrap();
        assert_eq!(defaults(&db.addresses().list(&u.id).await.unwrap()), vec!["Home"]);
    }

    #[tokio::test]
    async fn test_scoped_to_owner() {
        let db = test_db().await;
        let ada = user(&db, "ada@example.com", Role::Customer).await;
        let bob = user(&db, "bob@example.com", Role::Customer).await;

        let home = db.addresses().create(&ada.id, &input("Home", false)).await.unwrap();

        assert!(db.addresses().get(&bob.id, home.id).await.unwrap().is_none());
        assert!(matches!(
            db.addresses().delete(&bob.id, home.id).await,
            Err(DbError::NotFound { .. })
        ));
        assert!(matches!(
            db.addresses().set_default(&bob.id, home.id).await,
            Err(DbError::NotFound { .. })
        ));
        assert!(matches!(
            db.addresses().update(&bob.id, home.id, &input("Mine", false)).await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_required_fields() {
        let db = test_db().await;
        let u = user(&db, "ada@example.com", Role::Customer).await;

        let mut bad = input("Home", false);
        bad.city = Some("  ".to_string());
        assert!(matches!(
            db.addresses().create(&u.id, &bad).await,
            Err(DbError::Domain(CoreError::Validation(_)))
        ));
        assert!(db.addresses().list(&u.id).await.unwrap().is_empty());
    }
}
