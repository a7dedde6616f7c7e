//! # Error Types
//!
//! Domain-specific error types for storefront-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  storefront-core errors (this file)                                    │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  storefront-db errors (separate crate)                                 │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  storefront-api errors (in app)                                        │
//! │  └── ApiError         - What the client sees (status + JSON body)      │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → HTTP         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These errors represent business rule violations. The API layer maps each
/// variant onto an HTTP status.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product does not exist, or is inactive and hidden from the caller.
    #[error("Product not found: {0}")]
    ProductNotFound(i64),

    /// Not enough stock to cover an order line or a cart quantity.
    ///
    /// ## User Workflow
    /// ```text
    /// Checkout (qty: 5)
    ///      │
    ///      ▼
    /// Check stock: available=3
    ///      │
    ///      ▼
    /// InsufficientStock { product: "Mug", available: 3, requested: 5 }
    /// ```
    #[error("Insufficient stock for {product}: available {available}, requested {requested}")]
    InsufficientStock {
        product: String,
        available: i64,
        requested: i64,
    },

    /// The cart already holds every unit in stock.
    #[error("{product} is out of stock")]
    OutOfStock { product: String },

    /// Adding the requested quantity would exceed stock, but some units remain.
    #[error("You can add at most {can_add} more of {product}")]
    CartLimitReached { product: String, can_add: i64 },

    /// Storefront sales are switched off in settings.
    #[error("Sales are currently closed")]
    SalesClosed,

    /// Order does not exist or does not belong to the caller.
    #[error("Order not found: {0}")]
    OrderNotFound(i64),

    /// Order status does not allow cancellation.
    #[error("Order {order_id} is {status} and can no longer be cancelled")]
    OrderNotCancellable { order_id: i64, status: String },

    /// Cancelled orders have had their stock restored and are closed for good.
    #[error("Order {order_id} is cancelled and cannot move to {requested}")]
    OrderClosed { order_id: i64, requested: String },

    /// Checkout was submitted without any lines.
    #[error("Order must contain at least one item")]
    EmptyOrder,

    /// Checkout was submitted with too many lines.
    #[error("Order cannot have more than {max} items")]
    TooManyLines { max: usize },

    /// Validation error (wraps ValidationError).
    #[error("{0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Amount does not fit in the money range.
    #[error("{field} is too large")]
    TooLarge { field: String },

    /// Value must be zero or more.
    #[error("{field} cannot be negative")]
    Negative { field: String },

    /// Invalid format (e.g., malformed email, non-numeric digits).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {}", allowed.join(", "))]
    NotAllowed { field: String, allowed: Vec<String> },
}

impl ValidationError {
    /// Shorthand for [`ValidationError::Required`].
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            product: "Ceramic Mug".to_string(),
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for Ceramic Mug: available 3, requested 5"
        );

        let err = CoreError::CartLimitReached {
            product: "Ceramic Mug".to_string(),
            can_add: 2,
        };
        assert_eq!(err.to_string(), "You can add at most 2 more of Ceramic Mug");
    }

    #[test]
    fn test_validation_error_messages() {
        assert_eq!(ValidationError::required("email").to_string(), "email is required");

        let err = ValidationError::NotAllowed {
            field: "order_status".to_string(),
            allowed: vec!["pending".to_string(), "shipped".to_string()],
        };
        assert_eq!(err.to_string(), "order_status must be one of: pending, shipped");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let core_err: CoreError = ValidationError::required("name").into();
        assert!(matches!(core_err, CoreError::Validation(_)));
        assert_eq!(core_err.to_string(), "name is required");
    }
}
