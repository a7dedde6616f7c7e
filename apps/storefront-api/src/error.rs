//! # API Error Types
//!
//! Everything a handler can fail with, rendered as JSON.
//!
//! ## Mapping
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Source                                   ErrorCode       HTTP          │
//! │                                                                         │
//! │  ValidationError / bad input              BAD_REQUEST     400          │
//! │  CoreError::InsufficientStock, ...        BAD_REQUEST     400          │
//! │  missing token                            UNAUTHORIZED    401          │
//! │  bad token, wrong role, sales closed      FORBIDDEN       403          │
//! │  ProductNotFound, OrderNotFound,                                       │
//! │  DbError::NotFound                        NOT_FOUND       404          │
//! │  DbError::UniqueViolation                 CONFLICT        409          │
//! │  DbError::TransactionFailed (lock wait)   BUSY            503          │
//! │  anything else                            INTERNAL_ERROR  500          │
//! │                                                                         │
//! │  Body: {"code": "NOT_FOUND", "error": "Order not found: 42"}           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Internal failures are logged with their detail and answered with a
//! generic message.

use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::{error, warn};

use storefront_core::{CoreError, ValidationError};
use storefront_db::DbError;

/// Error categories exposed to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    Conflict,
    Busy,
    InternalError,
}

impl ErrorCode {
    /// Get HTTP status code.
    pub fn http_status(self) -> StatusCode {
        match self {
            Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict => StatusCode::CONFLICT,
            Self::Busy => StatusCode::SERVICE_UNAVAILABLE,
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// A failed request.
#[derive(Debug, Clone)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Conflict, message)
    }

    /// Logs `detail` and returns a generic 500.
    pub fn internal(detail: impl std::fmt::Display) -> Self {
        error!(error = %detail, "Internal error");
        Self::new(ErrorCode::InternalError, "Internal server error")
    }
}

/// JSON response body for errors.
#[derive(Debug, Serialize)]
struct ErrorBody {
    code: ErrorCode,
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            code: self.code,
            error: self.message,
        };
        (self.code.http_status(), Json(body)).into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::bad_request(err.to_string())
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let code = match &err {
            CoreError::ProductNotFound(_) | CoreError::OrderNotFound(_) => ErrorCode::NotFound,
            CoreError::SalesClosed => ErrorCode::Forbidden,
            CoreError::InsufficientStock { .. }
            | CoreError::OutOfStock { .. }
            | CoreError::CartLimitReached { .. }
            | CoreError::OrderNotCancellable { .. }
            | CoreError::OrderClosed { .. }
            | CoreError::EmptyOrder
            | CoreError::TooManyLines { .. }
            | CoreError::Validation(_) => ErrorCode::BadRequest,
        };
        ApiError::new(code, err.to_string())
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Domain(core) => core.into(),
            DbError::NotFound { entity, .. } => ApiError::not_found(format!("{entity} not found")),
            DbError::UniqueViolation { .. } => ApiError::conflict(err.to_string()),
            DbError::ForeignKeyViolation { .. } => {
                ApiError::bad_request("Referenced record does not exist")
            }
            DbError::TransactionFailed(detail) => {
                warn!(error = %detail, "Write lock wait timed out");
                ApiError::new(ErrorCode::Busy, "The store is busy, please try again")
            }
            other => ApiError::internal(other),
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError::bad_request(format!("Invalid form data: {}", err.body_text()))
    }
}

/// Result type for handlers.
pub type ApiResult<T> = Result<T, ApiError>;
