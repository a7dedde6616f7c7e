//! # Content Routes
//!
//! Editable pages, help contacts and the FAQ.
//!
//! ## Question Flow
//! ```text
//! customer ── POST /faq/question ──► unpublished entry ──► new_question → admins
//!                                            │
//! admin ──── PUT /faq/{id} (answer) ─────────┘──► question_answer → asking user
//!                                                 (only when the answer changed)
//! ```

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post, put};
use axum::{Extension, Json, Router};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::MessageResponse;
use crate::auth::{require_admin, require_auth, AuthUser};
use crate::error::{ApiError, ApiResult};
use crate::AppState;
use storefront_core::validation::{optional_text, require_text};
use storefront_core::{FaqEntry, FaqEntryWithAuthor, HelpInfo, PageContent, ValidationError};

pub fn router(state: &AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/page/{name}", get(get_page))
        .route("/help", get(get_help))
        .route("/faq", get(published_faqs));

    let customer = Router::new()
        .route("/faq/question", post(ask_question))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    let admin = Router::new()
        .route("/page/{name}", put(update_page))
        .route("/help", put(update_help))
        .route("/faq", post(create_faq))
        .route("/faq/all", get(all_faqs))
        .route("/faq/{id}", put(update_faq).delete(delete_faq))
        .route_layer(from_fn_with_state(state.clone(), require_admin));

    public.merge(customer).merge(admin)
}

// =============================================================================
// Pages & Help
// =============================================================================

async fn get_page(State(state): State<AppState>, Path(name): Path<String>) -> ApiResult<Json<PageContent>> {
    state
        .db
        .content()
        .get_page(&name)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Page not found"))
}

#[derive(Debug, Deserialize)]
pub struct PageRequest {
    pub content: Option<String>,
}

async fn update_page(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(req): Json<PageRequest>,
) -> ApiResult<Json<PageContent>> {
    let content = req
        .content
        .ok_or_else(|| ValidationError::required("content"))?;

    let page = state.db.content().upsert_page(&name, &content).await?;
    info!(page = %name, "Page content updated");

    Ok(Json(page))
}

async fn get_help(State(state): State<AppState>) -> ApiResult<Json<HelpInfo>> {
    Ok(Json(state.db.content().help_info().await?))
}

#[derive(Debug, Deserialize)]
pub struct HelpRequest {
    pub phone: Option<String>,
    pub email: Option<String>,
}

async fn update_help(
    State(state): State<AppState>,
    Json(req): Json<HelpRequest>,
) -> ApiResult<Json<HelpInfo>> {
    let phone = req.phone.as_deref().map(str::trim).unwrap_or_default();
    let email = req.email.as_deref().map(str::trim).unwrap_or_default();

    Ok(Json(state.db.content().update_help(phone, email).await?))
}

// =============================================================================
// FAQ
// =============================================================================

async fn published_faqs(State(state): State<AppState>) -> ApiResult<Json<Vec<FaqEntry>>> {
    Ok(Json(state.db.content().published_faqs().await?))
}

async fn all_faqs(State(state): State<AppState>) -> ApiResult<Json<Vec<FaqEntryWithAuthor>>> {
    Ok(Json(state.db.content().all_faqs().await?))
}

#[derive(Debug, Serialize)]
pub struct FaqCreated {
    pub message: String,
    pub id: i64,
}

#[derive(Debug, Deserialize)]
pub struct QuestionRequest {
    pub question: Option<String>,
}

async fn ask_question(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<QuestionRequest>,
) -> ApiResult<(StatusCode, Json<FaqCreated>)> {
    let question = require_text("question", req.question.as_deref())?;

    let entry = state
        .db
        .content()
        .create_user_question(&auth.id, &question)
        .await?;
    info!(faq_id = entry.id, user_id = %auth.id, "Question submitted");

    state.notifier.question_asked(entry.id, &auth.id, &entry.question);

    Ok((
        StatusCode::CREATED,
        Json(FaqCreated {
            message: "Your question has been received".to_string(),
            id: entry.id,
        }),
    ))
}

#[derive(Debug, Deserialize)]
pub struct FaqRequest {
    pub question: Option<String>,
    pub answer: Option<String>,
    pub is_published: Option<bool>,
}

async fn create_faq(
    State(state): State<AppState>,
    Json(req): Json<FaqRequest>,
) -> ApiResult<(StatusCode, Json<FaqCreated>)> {
    let entry = state
        .db
        .content()
        .create_faq(
            req.question.as_deref().unwrap_or_default(),
            req.answer.as_deref(),
            req.is_published.unwrap_or(true),
        )
        .await?;
    info!(faq_id = entry.id, "FAQ entry created");

    Ok((
        StatusCode::CREATED,
        Json(FaqCreated {
            message: "FAQ entry created".to_string(),
            id: entry.id,
        }),
    ))
}

async fn update_faq(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<FaqRequest>,
) -> ApiResult<Json<FaqEntry>> {
    let content = state.db.content();

    let published = match req.is_published {
        Some(published) => published,
        None => {
            content
                .get_faq(id)
                .await?
                .ok_or_else(|| ApiError::not_found("FAQ not found"))?
                .is_published
        }
    };

    let (before, after) = content
        .update_faq(
            id,
            req.question.as_deref().unwrap_or_default(),
            req.answer.as_deref(),
            published,
        )
        .await?;

    if let Some(answer) = newly_answered(&before, &after) {
        if let Some(user_id) = after.user_id.clone() {
            info!(faq_id = id, user_id = %user_id, "Question answered");
            state
                .notifier
                .question_answered(user_id, id, &after.question, &answer);
        }
    }

    Ok(Json(after))
}

/// The new answer of a user question, when it is non-blank and changed.
fn newly_answered(before: &FaqEntry, after: &FaqEntry) -> Option<String> {
    if after.user_id.is_none() {
        return None;
    }

    let answer = optional_text(after.answer.as_deref())?;
    let previous = optional_text(before.answer.as_deref());

    (previous.as_deref() != Some(answer.as_str())).then_some(answer)
}

async fn delete_faq(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Json<MessageResponse>> {
    state.db.content().delete_faq(id).await?;
    Ok(Json(MessageResponse::new("FAQ entry deleted")))
}
