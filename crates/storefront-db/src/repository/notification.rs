//! # Notification Repository
//!
//! Stores in-app notifications and per-user preferences.
//!
//! ## Delivery
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create_for(user, draft)                                                │
//! │     draft.is_global?  ──yes──►  INSERT                                 │
//! │            │ no                                                         │
//! │            ▼                                                            │
//! │     preferences row?  ──none──►  INSERT                                │
//! │            │                                                            │
//! │            ▼                                                            │
//! │     preferences_allow(kind)?  ──no──►  skipped (nothing stored)        │
//! │            │ yes                                                        │
//! │            ▼                                                            │
//! │         INSERT                                                          │
//! │                                                                         │
//! │  notify_users / notify_role / notify_all_customers loop over the       │
//! │  recipients and return how many rows were written.                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{debug, warn};

use crate::error::{DbError, DbResult};
use crate::repository::user::UserRepository;
use storefront_core::notification::{preferences_allow, NotificationDraft};
use storefront_core::{Notification, NotificationPreferences, Role};

const NOTIFICATION_COLUMNS: &str = "n.id, n.user_id, n.type, n.title, n.message, n.link, n.order_id, \
     n.question_id, n.campaign_code, n.is_global, n.sender_id, n.is_read, n.read_at, n.created_at";

const PREFERENCE_COLUMNS: &str = "user_id, order_status_updates, campaign_notifications, \
     question_answers, general_announcements, new_orders, new_questions, low_stock_alerts, \
     email_order_status, email_campaigns, email_announcements, updated_at";

// =============================================================================
// Views
// =============================================================================

/// Who sent a broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SenderInfo {
    pub id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Role,
}

/// A notification as listed to its recipient.
#[derive(Debug, Clone, Serialize)]
pub struct NotificationView {
    #[serde(flatten)]
    pub notification: Notification,
    pub sender: Option<SenderInfo>,
}

#[derive(sqlx::FromRow)]
struct NotificationRow {
    #[sqlx(flatten)]
    notification: Notification,
    sender_first_name: Option<String>,
    sender_last_name: Option<String>,
    sender_role: Option<Role>,
}

impl From<NotificationRow> for NotificationView {
    fn from(row: NotificationRow) -> Self {
        let sender = match (&row.notification.sender_id, row.sender_role) {
            (Some(id), Some(role)) => Some(SenderInfo {
                id: id.clone(),
                first_name: row.sender_first_name,
                last_name: row.sender_last_name,
                role,
            }),
            _ => None,
        };

        NotificationView {
            notification: row.notification,
            sender,
        }
    }
}

/// One page of the caller's notifications.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPage {
    pub notifications: Vec<NotificationView>,
    pub total: i64,
    pub unread_count: i64,
}

/// Partial preference update. Absent fields keep their value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PreferencesUpdate {
    pub order_status_updates: Option<bool>,
    pub campaign_notifications: Option<bool>,
    pub question_answers: Option<bool>,
    pub general_announcements: Option<bool>,
    pub new_orders: Option<bool>,
    pub new_questions: Option<bool>,
    pub low_stock_alerts: Option<bool>,
    pub email_order_status: Option<bool>,
    pub email_campaigns: Option<bool>,
    pub email_announcements: Option<bool>,
}

// =============================================================================
// Repository
// =============================================================================

#[derive(Debug, Clone)]
pub struct NotificationRepository {
    pool: SqlitePool,
}

impl NotificationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        NotificationRepository { pool }
    }

    /// Delivers `draft` to one user.
    ///
    /// Returns `None` when the user's preferences suppress this type.
    pub async fn create_for(
        &self,
        user_id: &str,
        draft: &NotificationDraft,
    ) -> DbResult<Option<Notification>> {
        if !draft.is_global {
            let prefs = self.find_preferences(user_id).await?;
            if !preferences_allow(prefs.as_ref(), draft.kind) {
                debug!(user_id, kind = ?draft.kind, "Notification suppressed by preferences");
                return Ok(None);
            }
        }

        let notification = sqlx::query_as::<_, Notification>(
            "INSERT INTO notifications (
                user_id, type, title, message, link, order_id, question_id,
                campaign_code, is_global, sender_id, created_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
             RETURNING id, user_id, type, title, message, link, order_id, question_id,
                       campaign_code, is_global, sender_id, is_read, read_at, created_at",
        )
        .bind(user_id)
        .bind(draft.kind)
        .bind(&draft.title)
        .bind(&draft.message)
        .bind(&draft.link)
        .bind(draft.order_id)
        .bind(draft.question_id)
        .bind(&draft.campaign_code)
        .bind(draft.is_global)
        .bind(&draft.sender_id)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(Some(notification))
    }

    /// Delivers `draft` to each user in turn. Returns how many were stored.
    ///
    /// A failed delivery is logged and the remaining users still get theirs.
    pub async fn notify_users(&self, user_ids: &[String], draft: &NotificationDraft) -> DbResult<usize> {
        let mut sent = 0;
        for user_id in user_ids {
            match self.create_for(user_id, draft).await {
                Ok(Some(_)) => sent += 1,
                Ok(None) => {}
                Err(e) => {
                    warn!(user_id = %user_id, kind = ?draft.kind, error = %e, "Notification delivery failed");
                }
            }
        }
        Ok(sent)
    }

    /// Delivers `draft` to every user with `role`.
    pub async fn notify_role(&self, role: Role, draft: &NotificationDraft) -> DbResult<usize> {
        let ids = UserRepository::new(self.pool.clone()).ids_by_role(role).await?;
        self.notify_users(&ids, draft).await
    }

    /// Broadcasts `draft` to every customer, optionally skipping the sender.
    pub async fn notify_all_customers(
        &self,
        draft: &NotificationDraft,
        exclude: Option<&str>,
    ) -> DbResult<usize> {
        let ids: Vec<String> = UserRepository::new(self.pool.clone())
            .ids_by_role(Role::Customer)
            .await?
            .into_iter()
            .filter(|id| Some(id.as_str()) != exclude)
            .collect();
        let sent = self.notify_users(&ids, draft).await?;
        debug!(kind = ?draft.kind, sent, "Broadcast delivered");
        Ok(sent)
    }

    /// The caller's notifications, newest first, with sender details.
    pub async fn list(
        &self,
        user_id: &str,
        limit: i64,
        offset: i64,
        unread_only: bool,
    ) -> DbResult<NotificationPage> {
        let rows = sqlx::query_as::<_, NotificationRow>(&format!(
            "SELECT {NOTIFICATION_COLUMNS},
                    s.first_name AS sender_first_name,
                    s.last_name  AS sender_last_name,
                    s.role       AS sender_role
             FROM notifications n
             LEFT JOIN users s ON s.id = n.sender_id
             WHERE n.user_id = ?1 AND (?2 = 0 OR n.is_read = 0)
             ORDER BY n.created_at DESC, n.id DESC
             LIMIT ?3 OFFSET ?4"
        ))
        .bind(user_id)
        .bind(unread_only)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE user_id = ?1 AND (?2 = 0 OR is_read = 0)",
        )
        .bind(user_id)
        .bind(unread_only)
        .fetch_one(&self.pool)
        .await?;

        Ok(NotificationPage {
            notifications: rows.into_iter().map(NotificationView::from).collect(),
            total,
            unread_count: self.unread_count(user_id).await?,
        })
    }

    pub async fn unread_count(&self, user_id: &str) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM notifications WHERE user_id = ?1 AND is_read = 0")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    /// Marks one notification read. The first read time is kept.
    pub async fn mark_read(&self, user_id: &str, id: i64) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = 1, read_at = COALESCE(read_at, ?3)
             WHERE id = ?1 AND user_id = ?2",
        )
        .bind(id)
        .bind(user_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Notification", id));
        }

        Ok(())
    }

    /// Returns how many notifications changed.
    pub async fn mark_all_read(&self, user_id: &str) -> DbResult<u64> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = 1, read_at = ?2 WHERE user_id = ?1 AND is_read = 0",
        )
        .bind(user_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn delete(&self, user_id: &str, id: i64) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = ?1 AND user_id = ?2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Notification", id));
        }

        Ok(())
    }

    // =========================================================================
    // Preferences
    // =========================================================================

    /// The caller's preferences, created with every switch on if missing.
    pub async fn preferences(&self, user_id: &str) -> DbResult<NotificationPreferences> {
        sqlx::query(
            "INSERT INTO notification_preferences (user_id, updated_at) VALUES (?1, ?2)
             ON CONFLICT (user_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        self.find_preferences(user_id)
            .await?
            .ok_or_else(|| DbError::not_found("Notification preferences", user_id))
    }

    /// Applies a partial update and returns the full row.
    pub async fn update_preferences(
        &self,
        user_id: &str,
        update: &PreferencesUpdate,
    ) -> DbResult<NotificationPreferences> {
        self.preferences(user_id).await?;

        let prefs = sqlx::query_as::<_, NotificationPreferences>(&format!(
            "UPDATE notification_preferences SET
                order_status_updates   = COALESCE(?2, order_status_updates),
                campaign_notifications = COALESCE(?3, campaign_notifications),
                question_answers       = COALESCE(?4, question_answers),
                general_announcements  = COALESCE(?5, general_announcements),
                new_orders             = COALESCE(?6, new_orders),
                new_questions          = COALESCE(?7, new_questions),
                low_stock_alerts       = COALESCE(?8, low_stock_alerts),
                email_order_status     = COALESCE(?9, email_order_status),
                email_campaigns        = COALESCE(?10, email_campaigns),
                email_announcements    = COALESCE(?11, email_announcements),
                updated_at             = ?12
             WHERE user_id = ?1
             RETURNING {PREFERENCE_COLUMNS}"
        ))
        .bind(user_id)
        .bind(update.order_status_updates)
        .bind(update.campaign_notifications)
        .bind(update.question_answers)
        .bind(update.general_announcements)
        .bind(update.new_orders)
        .bind(update.new_questions)
        .bind(update.low_stock_alerts)
        .bind(update.email_order_status)
        .bind(update.email_campaigns)
        .bind(update.email_announcements)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(prefs)
    }

    async fn find_preferences(&self, user_id: &str) -> DbResult<Option<NotificationPreferences>> {
        let prefs = sqlx::query_as::<_, NotificationPreferences>(&format!(
            "SELECT {PREFERENCE_COLUMNS} FROM notification_preferences WHERE user_id = ?1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(prefs)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
