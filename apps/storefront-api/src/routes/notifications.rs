//! # Notification Routes
//!
//! The caller's inbox and preferences, plus admin broadcasts.
//!
//! Broadcasts run inline because the response reports how many customers
//! were reached. Event notifications go through [`Notifier`](crate::notifier::Notifier).

use axum::extract::{Path, Query, State};
use axum::middleware::from_fn_with_state;
use axum::routing::{delete, get, post, put};
use axum::{Extension, Json, Router};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::auth::{require_admin, require_auth, AuthUser};
use crate::error::ApiResult;
use crate::AppState;
use storefront_core::notification::{self, NotificationDraft};
use storefront_core::validation::{optional_text, require_text};
use storefront_core::NotificationPreferences;
use storefront_db::{NotificationPage, PreferencesUpdate};

use super::MessageResponse;

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 200;

pub fn router(state: &AppState) -> Router<AppState> {
    let inbox = Router::new()
        .route("/", get(list_notifications))
        .route("/unread-count", get(unread_count))
        .route("/mark-all-read", put(mark_all_read))
        .route("/{id}/read", put(mark_read))
        .route("/{id}", delete(delete_notification))
        .route("/preferences", get(get_preferences).put(update_preferences))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    let admin = Router::new()
        .route("/announce", post(announce))
        .route("/campaign", post(campaign))
        .route_layer(from_fn_with_state(state.clone(), require_admin));

    inbox.merge(admin)
}

// =============================================================================
// Inbox
// =============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboxQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    #[serde(default)]
    pub unread_only: bool,
}

async fn list_notifications(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<InboxQuery>,
) -> ApiResult<Json<NotificationPage>> {
    let limit = query
        .limit
        .filter(|l| *l >= 1)
        .map_or(DEFAULT_LIMIT, |l| l.min(MAX_LIMIT));
    let offset = query.offset.unwrap_or(0).max(0);

    let page = state
        .db
        .notifications()
        .list(&auth.id, limit, offset, query.unread_only)
        .await?;

    Ok(Json(page))
}

#[derive(Debug, Serialize)]
pub struct UnreadCount {
    pub count: i64,
}

async fn unread_count(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<Json<UnreadCount>> {
    let count = state.db.notifications().unread_count(&auth.id).await?;
    Ok(Json(UnreadCount { count }))
}

async fn mark_read(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> ApiResult<Json<MessageResponse>> {
    state.db.notifications().mark_read(&auth.id, id).await?;
    Ok(Json(MessageResponse::new("Notification marked as read")))
}

/// `{message, count}` for bulk operations.
#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub message: String,
    pub count: u64,
}

async fn mark_all_read(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<Json<CountResponse>> {
    let count = state.db.notifications().mark_all_read(&auth.id).await?;

    Ok(Json(CountResponse {
        message: "All notifications marked as read".to_string(),
        count,
    }))
}

async fn delete_notification(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> ApiResult<Json<MessageResponse>> {
    state.db.notifications().delete(&auth.id, id).await?;
    Ok(Json(MessageResponse::new("Notification deleted")))
}

async fn get_preferences(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<Json<NotificationPreferences>> {
    Ok(Json(state.db.notifications().preferences(&auth.id).await?))
}

async fn update_preferences(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(update): Json<PreferencesUpdate>,
) -> ApiResult<Json<NotificationPreferences>> {
    let prefs = state
        .db
        .notifications()
        .update_preferences(&auth.id, &update)
        .await?;

    Ok(Json(prefs))
}

// =============================================================================
// Broadcasts
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastRequest {
    pub title: Option<String>,
    pub message: Option<String>,
    pub link: Option<String>,
    pub campaign_code: Option<String>,
}

impl BroadcastRequest {
    fn title_and_message(&self) -> ApiResult<(String, String)> {
        let title = require_text("title", self.title.as_deref())?;
        let message = require_text("message", self.message.as_deref())?;
        Ok((title, message))
    }
}

async fn broadcast(state: &AppState, admin: &AuthUser, draft: NotificationDraft) -> ApiResult<usize> {
    let count = state
        .db
        .notifications()
        .notify_all_customers(&draft, Some(&admin.id))
        .await?;

    info!(kind = ?draft.kind, count, admin_id = %admin.id, "Broadcast sent");
    Ok(count)
}

async fn announce(
    State(state): State<AppState>,
    Extension(admin): Extension<AuthUser>,
    Json(req): Json<BroadcastRequest>,
) -> ApiResult<Json<CountResponse>> {
    let (title, message) = req.title_and_message()?;
    let link = optional_text(req.link.as_deref());

    let draft = notification::announcement(&title, &message, link.as_deref(), Some(admin.id.clone()));
    let count = broadcast(&state, &admin, draft).await?;

    Ok(Json(CountResponse {
        message: format!("Announcement sent to {count} users"),
        count: count as u64,
    }))
}

async fn campaign(
    State(state): State<AppState>,
    Extension(admin): Extension<AuthUser>,
    Json(req): Json<BroadcastRequest>,
) -> ApiResult<Json<CountResponse>> {
    let (title, message) = req.title_and_message()?;
    let link = optional_text(req.link.as_deref());
    let code = optional_text(req.campaign_code.as_deref());

    let draft = notification::campaign(
        &title,
        &message,
        code.as_deref(),
        link.as_deref(),
        Some(admin.id.clone()),
    );
    let count = broadcast(&state, &admin, draft).await?;

    Ok(Json(CountResponse {
        message: format!("Campaign sent to {count} users"),
        count: count as u64,
    }))
}
