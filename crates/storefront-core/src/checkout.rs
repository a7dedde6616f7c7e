//! # Checkout Rules
//!
//! Stock checks for the cart and pricing for order placement.
//!
//! ## Order Placement
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Checkout Pipeline                                │
//! │                                                                         │
//! │  CheckoutRequest (JSON body)                                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  validate()            ← address fields, lines, quantities (no I/O)    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ValidCheckout                                                          │
//! │       │  storefront-db opens a transaction and loads each product      │
//! │       ▼                                                                 │
//! │  price_line(product, qty)   ← stock check + price snapshot             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  OrderTotals::from_lines()  ← subtotal, shipping, tax, discount        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  INSERT order + items, decrement stock, clear cart, COMMIT             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{Product, Role, StoreSettings};
use crate::validation::{optional_text, require_text, validate_card_last4, validate_quantity};
use crate::MAX_ORDER_LINES;

// =============================================================================
// Cart Rules
// =============================================================================

/// Rejects cart changes while sales are closed. Admins may still test the flow.
pub fn ensure_sales_open(settings: &StoreSettings, role: Role) -> CoreResult<()> {
    if !settings.sales_active && !role.is_admin() {
        return Err(CoreError::SalesClosed);
    }
    Ok(())
}

/// Checks that `requested` more units fit on top of what is already in the cart.
///
/// ## Example
/// ```rust
/// use storefront_core::checkout::check_cart_addition;
/// use storefront_core::CoreError;
///
/// assert!(check_cart_addition("Mug", 5, 2, 3).is_ok());
/// assert!(matches!(
///     check_cart_addition("Mug", 5, 2, 4),
///     Err(CoreError::CartLimitReached { can_add: 3, .. })
/// ));
/// assert!(matches!(
///     check_cart_addition("Mug", 5, 5, 1),
///     Err(CoreError::OutOfStock { .. })
/// ));
/// ```
pub fn check_cart_addition(
    product: &str,
    stock: i64,
    in_cart: i64,
    requested: i64,
) -> CoreResult<()> {
    if stock >= in_cart + requested {
        return Ok(());
    }

    let can_add = stock - in_cart;
    if can_add <= 0 {
        Err(CoreError::OutOfStock {
            product: product.to_string(),
        })
    } else {
        Err(CoreError::CartLimitReached {
            product: product.to_string(),
            can_add,
        })
    }
}

/// Checks that a cart line can be set to exactly `quantity` units.
pub fn check_cart_quantity(product: &str, stock: i64, quantity: i64) -> CoreResult<()> {
    if stock < quantity {
        return Err(CoreError::InsufficientStock {
            product: product.to_string(),
            available: stock,
            requested: quantity,
        });
    }
    Ok(())
}

// =============================================================================
// Checkout Request
// =============================================================================

/// Delivery address as typed into the checkout form.
#[derive(Debug, Clone, Default, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ShippingAddress {
    pub title: Option<String>,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub address_line: Option<String>,
    pub city: Option<String>,
    pub district: Option<String>,
    pub postal_code: Option<String>,
}

/// Card display data sent with the order. Only the holder and last four digits.
#[derive(Debug, Clone, Default, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CardInfo {
    pub card_holder_name: Option<String>,
    pub last4: Option<String>,
}

/// One requested order line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct OrderLineRequest {
    pub product_id: i64,
    pub quantity: i64,
}

/// Body of `POST /api/orders`.
#[derive(Debug, Clone, Default, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CheckoutRequest {
    pub address: Option<ShippingAddress>,
    pub payment_method: Option<String>,
    pub card_info: Option<CardInfo>,
    #[serde(default)]
    pub items: Vec<OrderLineRequest>,
    pub customer_note: Option<String>,
}

/// Address fields after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryAddress {
    pub title: Option<String>,
    pub full_name: String,
    pub phone: String,
    pub address_line: String,
    pub city: String,
    pub district: String,
    pub postal_code: Option<String>,
}

/// A checkout request that passed every check not needing the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidCheckout {
    pub address: DeliveryAddress,
    pub payment_method: String,
    pub card_holder_name: Option<String>,
    pub card_last4: Option<String>,
    /// One entry per product; repeated products are merged.
    pub lines: Vec<OrderLineRequest>,
    pub customer_note: Option<String>,
}

impl CheckoutRequest {
    /// Validates the request shape.
    ///
    /// ## Checks
    /// - address present with full name, phone, address line, city, district
    /// - payment method present
    /// - at least one line, at most [`MAX_ORDER_LINES`]
    /// - every quantity in 1..=999, after merging repeated products
    /// - card last four digits, when given, are four digits
    pub fn validate(self) -> CoreResult<ValidCheckout> {
        let address = self
            .address
            .ok_or_else(|| ValidationError::required("address"))?;

        let address = DeliveryAddress {
            title: optional_text(address.title.as_deref()),
            full_name: require_text("fullName", address.full_name.as_deref())?,
            phone: require_text("phone", address.phone.as_deref())?,
            address_line: require_text("addressLine", address.address_line.as_deref())?,
            city: require_text("city", address.city.as_deref())?,
            district: require_text("district", address.district.as_deref())?,
            postal_code: optional_text(address.postal_code.as_deref()),
        };

        let payment_method = require_text("paymentMethod", self.payment_method.as_deref())?;

        if self.items.is_empty() {
            return Err(CoreError::EmptyOrder);
        }

        let mut lines: Vec<OrderLineRequest> = Vec::with_capacity(self.items.len());
        for item in self.items {
            match lines.iter_mut().find(|l| l.product_id == item.product_id) {
                Some(existing) => existing.quantity = existing.quantity.saturating_add(item.quantity),
                None => lines.push(item),
            }
        }

        if lines.len() > MAX_ORDER_LINES {
            return Err(CoreError::TooManyLines {
                max: MAX_ORDER_LINES,
            });
        }

        for line in &lines {
            validate_quantity(line.quantity)?;
        }

        let card = self.card_info.unwrap_or_default();
        let card_last4 = optional_text(card.last4.as_deref());
        if let Some(digits) = &card_last4 {
            validate_card_last4(digits)?;
        }

        Ok(ValidCheckout {
            address,
            payment_method,
            card_holder_name: optional_text(card.card_holder_name.as_deref()),
            card_last4,
            lines,
            customer_note: optional_text(self.customer_note.as_deref()),
        })
    }
}

// =============================================================================
// Pricing
// =============================================================================

/// An order line priced against the current product row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedLine {
    pub product_id: i64,
    pub product_name: String,
    pub product_image_url: Option<String>,
    pub unit_price: Money,
    pub quantity: i64,
    pub subtotal: Money,
    /// Stock left once this line is fulfilled.
    pub remaining_stock: i64,
    /// Whether the remaining stock crosses the product's alert threshold.
    pub low_stock: bool,
}

/// Prices one line, snapshotting the product's name, image and price.
///
/// Inactive products cannot be ordered and report as not found.
pub fn price_line(product: &Product, quantity: i64) -> CoreResult<PricedLine> {
    if !product.is_active {
        return Err(CoreError::ProductNotFound(product.id));
    }

    if product.stock_quantity < quantity {
        return Err(CoreError::InsufficientStock {
            product: product.name.clone(),
            available: product.stock_quantity,
            requested: quantity,
        });
    }

    let remaining_stock = product.stock_quantity - quantity;
    let unit_price = product.price();
    let subtotal = unit_price
        .multiply_quantity(quantity)
        .ok_or_else(|| too_large("subtotal"))?;

    Ok(PricedLine {
        product_id: product.id,
        product_name: product.name.clone(),
        product_image_url: product.image_url.clone(),
        unit_price,
        quantity,
        subtotal,
        remaining_stock,
        low_stock: product.is_low_stock_at(remaining_stock),
    })
}

/// Order money breakdown.
///
/// Shipping, tax and discount are carried as columns but currently always zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, TS)]
#[ts(export)]
pub struct OrderTotals {
    pub subtotal: Money,
    pub shipping: Money,
    pub tax: Money,
    pub discount: Money,
    pub total: Money,
}

impl OrderTotals {
    /// Sums priced lines into order totals.
    ///
    /// ## Example
    /// ```rust
    /// use storefront_core::checkout::OrderTotals;
    ///
    /// let totals = OrderTotals::from_lines(&[]).unwrap();
    /// assert!(totals.total.is_zero());
    /// ```
    pub fn from_lines(lines: &[PricedLine]) -> CoreResult<Self> {
        let subtotal =
            Money::checked_sum(lines.iter().map(|l| l.subtotal)).ok_or_else(|| too_large("subtotal"))?;
        let shipping = Money::zero();
        let tax = Money::zero();
        let discount = Money::zero();

        let total = subtotal
            .checked_add(shipping)
            .and_then(|t| t.checked_add(tax))
            .and_then(|t| t.checked_sub(discount))
            .ok_or_else(|| too_large("total"))?;

        Ok(OrderTotals {
            subtotal,
            shipping,
            tax,
            discount,
            total,
        })
    }
}

fn too_large(field: &str) -> CoreError {
    ValidationError::TooLarge {
        field: field.to_string(),
    }
    .into()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OutOfStockRule;
    use chrono::Utc;

    fn product(id: i64, price_cents: i64, stock: i64) -> Product {
        let now = Utc::now();
        Product {
            id,
            name: format!("Product {id}"),
            description: None,
            price_cents,
            image_url: Some(format!("/uploads/p{id}.png")),
            stock_quantity: stock,
            is_active: true,
            out_of_stock_display_rule: OutOfStockRule::Default,
            critical_stock_threshold: Some(2),
            created_at: now,
            updated_at: now,
        }
    }

    fn address() -> ShippingAddress {
        ShippingAddress {
            title: Some("Home".to_string()),
            full_name: Some("Ada Lovelace".to_string()),
            phone: Some("5550001122".to_string()),
            address_line: Some("1 Analytical St".to_string()),
            city: Some("London".to_string()),
            district: Some("Marylebone".to_string()),
            postal_code: None,
        }
    }

    fn request(items: Vec<OrderLineRequest>) -> CheckoutRequest {
        CheckoutRequest {
            address: Some(address()),
            payment_method: Some("credit_card".to_string()),
            card_info: Some(CardInfo {
                card_holder_name: Some("ADA LOVELACE".to_string()),
                last4: Some("4242".to_string()),
            }),
            items,
            customer_note: Some("  ".to_string()),
        }
    }

    #[test]
    fn test_sales_gate() {
        let closed = StoreSettings::default();
        assert!(matches!(
            ensure_sales_open(&closed, Role::Customer),
            Err(CoreError::SalesClosed)
        ));
        assert!(ensure_sales_open(&closed, Role::Admin).is_ok());

        let open = StoreSettings {
            sales_active: true,
            ..StoreSettings::default()
        };
        assert!(ensure_sales_open(&open, Role::Customer).is_ok());
    }

    #[test]
    fn test_cart_quantity_check() {
        assert!(check_cart_quantity("Mug", 3, 3).is_ok());
        assert!(matches!(
            check_cart_quantity("Mug", 3, 4),
            Err(CoreError::InsufficientStock { available: 3, requested: 4, .. })
        ));
    }

    #[test]
    fn test_validate_merges_repeated_products() {
        let valid = request(vec![
            OrderLineRequest { product_id: 1, quantity: 2 },
            OrderLineRequest { product_id: 2, quantity: 1 },
            OrderLineRequest { product_id: 1, quantity: 3 },
        ])
        .validate()
        .unwrap();

        assert_eq!(
            valid.lines,
            vec![
                OrderLineRequest { product_id: 1, quantity: 5 },
                OrderLineRequest { product_id: 2, quantity: 1 },
            ]
        );
        assert_eq!(valid.card_last4.as_deref(), Some("4242"));
        assert_eq!(valid.customer_note, None);
    }

    #[test]
    fn test_validate_rejects_bad_requests() {
        assert!(matches!(request(vec![]).validate(), Err(CoreError::EmptyOrder)));

        let mut no_address = request(vec![OrderLineRequest { product_id: 1, quantity: 1 }]);
        no_address.address = None;
        assert!(matches!(no_address.validate(), Err(CoreError::Validation(_))));

        let mut blank_city = request(vec![OrderLineRequest { product_id: 1, quantity: 1 }]);
        if let Some(address) = blank_city.address.as_mut() {
            address.city = Some(" ".to_string());
        }
        assert!(matches!(blank_city.validate(), Err(CoreError::Validation(_))));

        let zero_qty = request(vec![OrderLineRequest { product_id: 1, quantity: 0 }]);
        assert!(matches!(zero_qty.validate(), Err(CoreError::Validation(_))));
    }

    #[test]
    fn test_price_line_and_totals() {
        let a = price_line(&product(1, 1990, 10), 3).unwrap();
        let b = price_line(&product(2, 500, 3), 1).unwrap();

        assert_eq!(a.subtotal.cents(), 5970);
        assert_eq!(a.remaining_stock, 7);
        assert!(!a.low_stock);
        assert!(b.low_stock);

        let totals = OrderTotals::from_lines(&[a, b]).unwrap();
        assert_eq!(totals.subtotal.cents(), 6470);
        assert_eq!(totals.total.cents(), 6470);
        assert!(totals.shipping.is_zero());
    }

    #[test]
    fn test_price_line_and_totals_reject_overflow() {
        let err = price_line(&product(1, 9_000_000_000_000_000_000, 10), 2).unwrap_err();
        assert!(matches!(err, CoreError::Validation(ValidationError::TooLarge { .. })));

        let a = price_line(&product(1, 5_000_000_000_000_000_000, 10), 1).unwrap();
        let b = price_line(&product(2, 5_000_000_000_000_000_000, 10), 1).unwrap();
        assert!(matches!(
            OrderTotals::from_lines(&[a, b]),
            Err(CoreError::Validation(ValidationError::TooLarge { .. }))
        ));
    }

    #[test]
    fn test_price_line_rejects_short_stock_and_inactive() {
        assert!(matches!(
            price_line(&product(1, 100, 2), 3),
            Err(CoreError::InsufficientStock { available: 2, requested: 3, .. })
        ));

        let mut inactive = product(4, 100, 10);
        inactive.is_active = false;
        assert!(matches!(
            price_line(&inactive, 1),
            Err(CoreError::ProductNotFound(4))
        ));
    }
}
