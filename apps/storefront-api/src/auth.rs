//! # Authentication
//!
//! JWT issuing and validation plus the axum middlewares that guard routes.
//!
//! ## Route Guards
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Authorization header         optional_auth   require_auth  require_admin│
//! │                                                                         │
//! │  (none)                       anonymous       401           401         │
//! │  Bearer <invalid/expired>     anonymous       403           403         │
//! │  Bearer <customer token>      AuthUser        AuthUser      403         │
//! │  Bearer <admin token>         AuthUser        AuthUser      AuthUser    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//! Accepted requests carry an [`AuthUser`] in their extensions. Handlers take
//! `Extension<AuthUser>`, or `Option<Extension<AuthUser>>` behind
//! `optional_auth`.

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderMap, Request};
use axum::middleware::Next;
use axum::response::Response;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::AppState;
use storefront_core::{Role, User};

/// JWT claims structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,

    pub email: String,

    pub role: Role,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration (Unix timestamp)
    pub exp: i64,

    /// JWT ID (unique identifier for this token)
    pub jti: String,
}

/// JWT token manager.
pub struct JwtManager {
    secret: String,
    lifetime_secs: i64,
}

impl JwtManager {
    pub fn new(secret: String, lifetime_secs: i64) -> Self {
        JwtManager {
            secret,
            lifetime_secs,
        }
    }

    /// Signs a session token for `user`.
    pub fn issue(&self, user: &User) -> ApiResult<String> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.lifetime_secs);

        let claims = Claims {
            sub: user.id.clone(),
            email: user.email.clone(),
            role: user.role,
            iat: now.timestamp(),
            exp: exp.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| ApiError::internal(format!("Failed to generate token: {}", e)))
    }

    /// Validate and decode a token.
    pub fn validate(&self, token: &str) -> ApiResult<Claims> {
        let token_data: TokenData<Claims> = decode(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| {
            debug!(error = %e, "Token rejected");
            ApiError::forbidden("Invalid or expired token")
        })?;

        Ok(token_data.claims)
    }
}

/// Extract bearer token from authorization header.
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// The authenticated caller.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: String,
    pub email: String,
    pub role: Role,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        AuthUser {
            id: claims.sub,
            email: claims.email,
            role: claims.role,
        }
    }
}

/// `Ok(None)` when no bearer token was sent.
fn authenticate(state: &AppState, headers: &HeaderMap) -> ApiResult<Option<AuthUser>> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(extract_bearer_token);

    match token {
        Some(token) => Ok(Some(state.jwt.validate(token)?.into())),
        None => Ok(None),
    }
}

// =============================================================================
// Middlewares
// =============================================================================

/// Attaches the caller when a valid token is present. Never rejects.
pub async fn optional_auth(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    if let Ok(Some(user)) = authenticate(&state, request.headers()) {
        request.extensions_mut().insert(user);
    }
    next.run(request).await
}

/// Requires a valid token.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let user = authenticate(&state, request.headers())?
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// Requires a valid token with the admin role.
pub async fn require_admin(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let user = authenticate(&state, request.headers())?
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    if !user.is_admin() {
        return Err(ApiError::forbidden("Admin access required"));
    }

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}
