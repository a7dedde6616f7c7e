//! Saved payment card metadata. Only the holder name, last four digits, brand
//! and expiry are kept.

use chrono::Utc;
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::error::{DbError, DbResult};
use storefront_core::validation::{optional_text, require_text, validate_card_expiry, validate_card_last4};
use storefront_core::{Card, CoreResult, ValidationError};

const CARD_COLUMNS: &str =
    "id, user_id, card_holder_name, last_four_digits, card_type, expiry_month, expiry_year, created_at";

/// Card fields as submitted by the client.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewCard {
    pub card_holder_name: Option<String>,
    pub last_four_digits: Option<String>,
    pub card_type: Option<String>,
    pub expiry_month: Option<i64>,
    pub expiry_year: Option<i64>,
}

impl NewCard {
    fn validate(&self) -> CoreResult<(String, String, i64, i64)> {
        let holder = require_text("card_holder_name", self.card_holder_name.as_deref())?;
        let last4 = require_text("last_four_digits", self.last_four_digits.as_deref())?;
        let month = self
            .expiry_month
            .ok_or_else(|| ValidationError::required("expiry_month"))?;
        let year = self
            .expiry_year
            .ok_or_else(|| ValidationError::required("expiry_year"))?;

        validate_card_last4(&last4)?;
        validate_card_expiry(month, year)?;

        Ok((holder, last4, month, year))
    }
}

#[derive(Debug, Clone)]
pub struct CardRepository {
    pool: SqlitePool,
}

impl CardRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CardRepository { pool }
    }

    /// Newest first.
    pub async fn list(&self, user_id: &str) -> DbResult<Vec<Card>> {
        let cards = sqlx::query_as::<_, Card>(&format!(
            "SELECT {CARD_COLUMNS} FROM cards WHERE user_id = ?1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(cards)
    }

    pub async fn create(&self, user_id: &str, card: &NewCard) -> DbResult<Card> {
        let (holder, last4, month, year) = card.validate()?;

        let card = sqlx::query_as::<_, Card>(&format!(
            "INSERT INTO cards (
                user_id, card_holder_name, last_four_digits, card_type,
                expiry_month, expiry_year, created_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             RETURNING {CARD_COLUMNS}"
        ))
        .bind(user_id)
        .bind(holder)
        .bind(last4)
        .bind(optional_text(card.card_type.as_deref()))
        .bind(month)
        .bind(year)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(card)
    }

    pub async fn delete(&self, user_id: &str, id: i64) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM cards WHERE id = ?1 AND user_id = ?2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Card", id));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{test_db, user};
    use storefront_core::{CoreError, Role};

    fn visa(last4: &str, month: i64, year: i64) -> NewCard {
        NewCard {
            card_holder_name: Some("ADA LOVELACE".to_string()),
            last_four_digits: Some(last4.to_string()),
            card_type: Some("visa".to_string()),
            expiry_month: Some(month),
            expiry_year: Some(year),
        }
    }

    #[tokio::test]
    async fn test_create_list_delete() {
        let db = test_db().await;
        let ada = user(&db, "ada@example.com", Role::Customer).await;
        let bob = user(&db, "bob@example.com", Role::Customer).await;

        let first = db.cards().create(&ada.id, &visa("4242", 12, 29)).await.unwrap();
        let second = db.cards().create(&ada.id, &visa("1881", 1, 30)).await.unwrap();
        assert_eq!(first.last_four_digits, "4242");

        let cards = db.cards().list(&ada.id).await.unwrap();
        assert_eq!(cards.iter().map(|c| c.id).collect::<Vec<_>>(), vec![second.id, first.id]);
        assert!(db.cards().list(&bob.id).await.unwrap().is_empty());

        assert!(matches!(
            db.cards().delete(&bob.id, first.id).await,
            Err(DbError::NotFound { .. })
        ));
        db.cards().delete(&ada.id, first.id).await.unwrap();
        assert_eq!(db.cards().list(&ada.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_rejects_bad_card_data() {
        let db = test_db().await;
        let ada = user(&db, "ada@example.com", Role::Customer).await;

        for card in [
            visa("424", 12, 29),
            visa("42a4", 12, 29),
            visa("4242", 13, 29),
            visa("4242", 0, 29),
            visa("4242", 12, 100),
            NewCard {
                expiry_month: None,
                ..visa("4242", 12, 29)
            },
        ] {
            assert!(matches!(
                db.cards().create(&ada.id, &card).await,
                Err(DbError::Domain(CoreError::Validation(_)))
            ));
        }
    }
}
