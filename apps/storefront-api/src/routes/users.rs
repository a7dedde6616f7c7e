//! Registration, login and the caller's profile.

use axum::extract::State;
use axum::http::StatusCode;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::auth::{require_auth, AuthUser};
use crate::error::{ApiError, ApiResult};
use crate::AppState;
use storefront_core::validation::{optional_text, validate_email, validate_password};
use storefront_core::{Role, User, ValidationError};
use storefront_db::{hash_password, verify_password, NewUser};

pub fn router(state: &AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/register", post(register))
        .route("/login", post(login));

    let private = Router::new()
        .route("/me", get(me))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    public.merge(private)
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub id: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<RegisterResponse>)> {
    let email = validate_email(req.email.as_deref().unwrap_or_default())?;
    let password = req.password.unwrap_or_default();
    validate_password(&password)?;

    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(ApiError::internal)??;

    let user = state
        .db
        .users()
        .create(NewUser {
            email,
            password_hash,
            first_name: optional_text(req.first_name.as_deref()),
            last_name: optional_text(req.last_name.as_deref()),
            role: Role::Customer,
        })
        .await?;

    info!(user_id = %user.id, "User registered");
    state.notifier.welcome(&user.id, user.first_name.as_deref());

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            id: user.id,
            email: user.email,
            created_at: user.created_at,
        }),
    ))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: String,
    pub token: String,
    pub user: User,
}

async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let email = req
        .email
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .ok_or_else(|| ValidationError::required("email"))?
        .to_string();
    let password = req
        .password
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ValidationError::required("password"))?;

    let invalid = || ApiError::unauthorized("Invalid email or password");

    let (user, hash) = state
        .db
        .users()
        .find_credentials(&email)
        .await?
        .ok_or_else(invalid)?;

    let matches = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(ApiError::internal)?;
    if !matches {
        return Err(invalid());
    }

    let token = state.jwt.issue(&user)?;
    info!(user_id = %user.id, "User logged in");

    Ok(Json(LoginResponse {
        message: "Login successful".to_string(),
        token,
        user,
    }))
}

async fn me(State(state): State<AppState>, Extension(auth): Extension<AuthUser>) -> ApiResult<Json<User>> {
    let user = state
        .db
        .users()
        .get_by_id(&auth.id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(user))
}
