//! # Content Repository
//!
//! Editable pages, the help contact singleton and the FAQ.
//!
//! ```text
//! page_contents   page_name → content        (upsert)
//! help_info       single row id = 1          (upsert)
//! faqs            admin entries + user questions (unpublished until answered)
//! ```

use chrono::Utc;
use sqlx::SqlitePool;

use crate::error::{DbError, DbResult};
use crate::repository::begin_write;
use storefront_core::validation::{optional_text, require_text};
use storefront_core::{FaqEntry, FaqEntryWithAuthor, HelpInfo, PageContent};

const FAQ_COLUMNS: &str =
    "id, question, answer, is_published, is_user_question, user_id, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct ContentRepository {
    pool: SqlitePool,
}

impl ContentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ContentRepository { pool }
    }

    // =========================================================================
    // Pages
    // =========================================================================

    pub async fn get_page(&self, page_name: &str) -> DbResult<Option<PageContent>> {
        let page = sqlx::query_as::<_, PageContent>(
            "SELECT page_name, content, updated_at FROM page_contents WHERE page_name = ?1",
        )
        .bind(page_name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(page)
    }

    pub async fn upsert_page(&self, page_name: &str, content: &str) -> DbResult<PageContent> {
        let page = sqlx::query_as::<_, PageContent>(
            "INSERT INTO page_contents (page_name, content, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT (page_name) DO UPDATE SET
                content = excluded.content,
                updated_at = excluded.updated_at
             RETURNING page_name, content, updated_at",
        )
        .bind(page_name)
        .bind(content)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(page)
    }

    // =========================================================================
    // Help
    // =========================================================================

    /// Support contacts, or empty strings when never set.
    pub async fn help_info(&self) -> DbResult<HelpInfo> {
        let info = sqlx::query_as::<_, HelpInfo>(
            "SELECT phone, email, updated_at FROM help_info WHERE id = 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(info.unwrap_or_default())
    }

    pub async fn update_help(&self, phone: &str, email: &str) -> DbResult<HelpInfo> {
        let info = sqlx::query_as::<_, HelpInfo>(
            "INSERT INTO help_info (id, phone, email, updated_at) VALUES (1, ?1, ?2, ?3)
             ON CONFLICT (id) DO UPDATE SET
                phone = excluded.phone,
                email = excluded.email,
                updated_at = excluded.updated_at
             RETURNING phone, email, updated_at",
        )
        .bind(phone.trim())
        .bind(email.trim())
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(info)
    }

    // =========================================================================
    // FAQ
    // =========================================================================

    /// Published entries, newest first.
    pub async fn published_faqs(&self) -> DbResult<Vec<FaqEntry>> {
        let faqs = sqlx::query_as::<_, FaqEntry>(&format!(
            "SELECT {FAQ_COLUMNS} FROM faqs WHERE is_published = 1 ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(faqs)
    }

    /// Every entry with the asking user's contact details.
    pub async fn all_faqs(&self) -> DbResult<Vec<FaqEntryWithAuthor>> {
        let faqs = sqlx::query_as::<_, FaqEntryWithAuthor>(
            "SELECT f.id, f.question, f.answer, f.is_published, f.is_user_question, f.user_id,
                    f.created_at, f.updated_at, u.first_name, u.last_name, u.email
             FROM faqs f
             LEFT JOIN users u ON u.id = f.user_id
             ORDER BY f.created_at DESC, f.id DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(faqs)
    }

    pub async fn get_faq(&self, id: i64) -> DbResult<Option<FaqEntry>> {
        let faq = sqlx::query_as::<_, FaqEntry>(&format!("SELECT {FAQ_COLUMNS} FROM faqs WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(faq)
    }

    /// Stores a customer's question, unpublished and unanswered.
    pub async fn create_user_question(&self, user_id: &str, question: &str) -> DbResult<FaqEntry> {
        let question = require_text("question", Some(question))?;
        self.insert_faq(&question, None, false, Some(user_id)).await
    }

    /// Stores an admin-authored entry.
    pub async fn create_faq(&self, question: &str, answer: Option<&str>, published: bool) -> DbResult<FaqEntry> {
        let question = require_text("question", Some(question))?;
        let answer = optional_text(answer);
        self.insert_faq(&question, answer.as_deref(), published, None).await
    }

    /// Rewrites an entry and returns it before and after the change.
    pub async fn update_faq(
        &self,
        id: i64,
        question: &str,
        answer: Option<&str>,
        published: bool,
    ) -> DbResult<(FaqEntry, FaqEntry)> {
        let question = require_text("question", Some(question))?;
        let answer = optional_text(answer);

        let mut tx = begin_write(&self.pool).await?;

        let before = sqlx::query_as::<_, FaqEntry>(&format!("SELECT {FAQ_COLUMNS} FROM faqs WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| DbError::not_found("FAQ", id))?;

        let after = sqlx::query_as::<_, FaqEntry>(&format!(
            "UPDATE faqs SET question = ?2, answer = ?3, is_published = ?4, updated_at = ?5
             WHERE id = ?1
             RETURNING {FAQ_COLUMNS}"
        ))
        .bind(id)
        .bind(&question)
        .bind(&answer)
        .bind(published)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok((before, after))
    }

    pub async fn delete_faq(&self, id: i64) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM faqs WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("FAQ", id));
        }

        Ok(())
    }

    async fn insert_faq(
        &self,
        question: &str,
        answer: Option<&str>,
        published: bool,
        user_id: Option<&str>,
    ) -> DbResult<FaqEntry> {
        let faq = sqlx::query_as::<_, FaqEntry>(&format!(
            "INSERT INTO faqs (question, answer, is_published, is_user_question, user_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
             RETURNING {FAQ_COLUMNS}"
        ))
        .bind(question)
        .bind(answer)
        .bind(published)
        .bind(user_id.is_some())
        .bind(user_id)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(faq)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{test_db, user};
    use storefront_core::{CoreError, Role};

    #[tokio::test]
    async fn test_pages_upsert() {
        let db = test_db().await;

        assert!(db.content().get_page("about").await.unwrap().is_none());
        db.content().upsert_page("about", "<p>v1</p>").await.unwrap();
        db.content().upsert_page("about", "<p>v2</p>").await.unwrap();
        assert_eq!(db.content().get_page("about").await.unwrap().unwrap().content, "<p>v2</p>");
    }

    #[tokio::test]
    async fn test_help_defaults_then_singleton() {
        let db = test_db().await;

        let empty = db.content().help_info().await.unwrap();
        assert_eq!(empty.phone, "");
        assert!(empty.updated_at.is_none());

        db.content().update_help("555 0100", "help@example.com").await.unwrap();
        db.content().update_help("555 0199", "help@example.com").await.unwrap();
        let info = db.content().help_info().await.unwrap();
        assert_eq!(info.phone, "555 0199");
        assert!(info.updated_at.is_some());
    }

    #[tokio::test]
    async fn test_faq_workflow() {
        let db = test_db().await;
        let u = user(&db, "ada@example.com", Role::Customer).await;

        let asked = db.content().create_user_question(&u.id, " Do you ship abroad? ").await.unwrap();
        assert_eq!(asked.question, "Do you ship abroad?");
        assert!(asked.is_user_question && !asked.is_published);
        assert!(db.content().published_faqs().await.unwrap().is_empty());

        db.content().create_faq("Returns?", Some("Within 14 days"), true).await.unwrap();

        let all = db.content().all_faqs().await.unwrap();
        assert_eq!(all.len(), 2);
        let mine = all.iter().find(|f| f.entry.id == asked.id).unwrap();
        assert_eq!(mine.email.as_deref(), Some("ada@example.com"));

        let (before, after) = db
            .content()
            .update_faq(asked.id, "Do you ship abroad?", Some("Yes, to the EU"), true)
            .await
            .unwrap();
        assert_eq!(before.answer, None);
        assert_eq!(after.answer.as_deref(), Some("Yes, to the EU"));
        assert_eq!(db.content().published_faqs().await.unwrap().len(), 2);

        db.content().delete_faq(asked.id).await.unwrap();
        assert!(matches!(db.content().delete_faq(asked.id).await, Err(DbError::NotFound { .. })));
        assert!(matches!(
            db.content().update_faq(asked.id, "q", None, false).await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_blank_question_rejected() {
        let db = test_db().await;
        let u = user(&db, "ada@example.com", Role::Customer).await;

        assert!(matches!(
            db.content().create_user_question(&u.id, "   ").await,
            Err(DbError::Domain(CoreError::Validation(_)))
        ));
    }
}
