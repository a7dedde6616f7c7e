//! # Domain Types
//!
//! Core domain types used throughout the storefront.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │      User       │   │    Product      │   │     Order       │       │
//! │  │  id (UUID)      │   │  id (rowid)     │   │  id (rowid)     │       │
//! │  │  email          │   │  name (unique)  │   │  address snap.  │       │
//! │  │  role           │   │  price_cents    │   │  order_status   │       │
//! │  └─────────────────┘   │  stock_quantity │   │  payment_status │       │
//! │                        └─────────────────┘   └────────┬────────┘       │
//! │                                                       │                 │
//! │                               ┌───────────────────────┼────────┐        │
//! │                               ▼                       ▼        │        │
//! │                        ┌─────────────┐   ┌──────────────────┐  │        │
//! │                        │  OrderItem  │   │ OrderHistoryEntry│  │        │
//! │                        │  (snapshot) │   │  status + note   │  │        │
//! │                        └─────────────┘   └──────────────────┘  │        │
//! │                                                                         │
//! │  Address · Card · Category · CartLine · Notification · FaqEntry        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Identity
//! Users are keyed by a UUID v4 string. Every other entity uses the integer
//! row id SQLite assigns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;

fn not_allowed(field: &str, allowed: &[&str]) -> ValidationError {
    ValidationError::NotAllowed {
        field: field.to_string(),
        allowed: allowed.iter().map(|s| s.to_string()).collect(),
    }
}

// =============================================================================
// Users
// =============================================================================

/// Account role. Admins manage the catalog and orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Admin,
}

impl Role {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::Admin => "admin",
        }
    }

    #[inline]
    pub const fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::Customer
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(Role::Customer),
            "admin" => Ok(Role::Admin),
            _ => Err(not_allowed("role", &["customer", "admin"])),
        }
    }
}

/// A registered account, without credentials.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct User {
    pub id: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Role,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl User {
    /// "First Last", falling back to the email when no name is on file.
    pub fn display_name(&self) -> String {
        display_name(self.first_name.as_deref(), self.last_name.as_deref())
            .unwrap_or_else(|| self.email.clone())
    }
}

/// Joins optional first and last names, returning `None` when both are blank.
pub fn display_name(first: Option<&str>, last: Option<&str>) -> Option<String> {
    let joined = [first, last]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    (!joined.is_empty()).then_some(joined)
}

// =============================================================================
// Settings
// =============================================================================

/// Settings key switching the storefront's sales on and off.
pub const SALES_ACTIVE_KEY: &str = "sales_active";

/// Settings key choosing how sold-out products are shown.
pub const OUT_OF_STOCK_BEHAVIOR_KEY: &str = "out_of_stock_behavior";

/// Store-wide handling of products with no stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OutOfStockBehavior {
    /// Sold-out products disappear from the storefront.
    Hide,
    /// Sold-out products stay listed with an out-of-stock badge.
    ShowAsOutOfStock,
}

impl OutOfStockBehavior {
    pub const fn as_str(&self) -> &'static str {
        match self {
            OutOfStockBehavior::Hide => "hide",
            OutOfStockBehavior::ShowAsOutOfStock => "show_as_out_of_stock",
        }
    }
}

impl Default for OutOfStockBehavior {
    fn default() -> Self {
        OutOfStockBehavior::Hide
    }
}

/// Typed view of the settings table.
///
/// Missing keys fall back to the defaults: sales closed, sold-out products hidden.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, TS)]
#[ts(export)]
pub struct StoreSettings {
    pub sales_active: bool,
    pub out_of_stock_behavior: OutOfStockBehavior,
}

impl StoreSettings {
    /// Builds the typed view from raw `(key, value)` rows.
    ///
    /// ## Example
    /// ```rust
    /// use storefront_core::{OutOfStockBehavior, StoreSettings};
    ///
    /// let settings = StoreSettings::from_pairs([
    ///     ("sales_active", "true"),
    ///     ("out_of_stock_behavior", "show_as_out_of_stock"),
    /// ]);
    /// assert!(settings.sales_active);
    /// assert_eq!(settings.out_of_stock_behavior, OutOfStockBehavior::ShowAsOutOfStock);
    /// ```
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut settings = StoreSettings::default();
        for (key, value) in pairs {
            match key {
                SALES_ACTIVE_KEY => settings.sales_active = value.trim() == "true",
                OUT_OF_STOCK_BEHAVIOR_KEY => {
                    settings.out_of_stock_behavior = match value.trim() {
                        "show_as_out_of_stock" => OutOfStockBehavior::ShowAsOutOfStock,
                        _ => OutOfStockBehavior::Hide,
                    }
                }
                _ => {}
            }
        }
        settings
    }
}

/// Renders a JSON settings value the way the settings table stores it.
///
/// Strings are stored verbatim; anything else keeps its JSON text (`true`, `5`).
pub fn setting_value_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// =============================================================================
// Products
// =============================================================================

/// Per-product override of the store-wide out-of-stock behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum OutOfStockRule {
    /// Follow the store-wide setting.
    Default,
    /// Always list the product, even when sold out.
    Show,
    /// Always hide the product when sold out.
    Hide,
}

impl OutOfStockRule {
    pub const fn as_str(&self) -> &'static str {
        match self {
            OutOfStockRule::Default => "default",
            OutOfStockRule::Show => "show",
            OutOfStockRule::Hide => "hide",
        }
    }
}

impl Default for OutOfStockRule {
    fn default() -> Self {
        OutOfStockRule::Default
    }
}

impl FromStr for OutOfStockRule {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" => Ok(OutOfStockRule::Default),
            "show" => Ok(OutOfStockRule::Show),
            "hide" => Ok(OutOfStockRule::Hide),
            _ => Err(not_allowed(
                "out_of_stock_display_rule",
                &["default", "show", "hide"],
            )),
        }
    }
}

/// A product in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    pub id: i64,

    /// Display name, unique across the catalog.
    pub name: String,

    pub description: Option<String>,

    /// Price in minor units.
    pub price_cents: i64,

    /// Public URL of the uploaded image (`/uploads/...`).
    pub image_url: Option<String>,

    pub stock_quantity: i64,

    /// Inactive products are invisible to customers.
    pub is_active: bool,

    pub out_of_stock_display_rule: OutOfStockRule,

    /// Stock level at or below which admins get a low-stock alert.
    pub critical_stock_threshold: Option<i64>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Whether a non-admin visitor sees this product in listings.
    ///
    /// ```text
    /// inactive                                   → hidden
    /// stock > 0                                  → shown
    /// rule = show                                → shown
    /// rule = default AND store shows sold-out    → shown
    /// otherwise                                  → hidden
    /// ```
    pub fn is_listed_for(&self, settings: &StoreSettings) -> bool {
        if !self.is_active {
            return false;
        }
        if self.stock_quantity > 0 {
            return true;
        }
        match self.out_of_stock_display_rule {
            OutOfStockRule::Show => true,
            OutOfStockRule::Hide => false,
            OutOfStockRule::Default => {
                settings.out_of_stock_behavior == OutOfStockBehavior::ShowAsOutOfStock
            }
        }
    }

    /// Whether the given stock level is at or below the critical threshold.
    pub fn is_low_stock_at(&self, stock: i64) -> bool {
        self.critical_stock_threshold
            .is_some_and(|threshold| stock <= threshold)
    }
}

/// A product category.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Category {
    pub id: i64,
    pub name: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A product as shown in the caller's favorites list.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct FavoriteProduct {
    #[serde(flatten)]
    #[cfg_attr(feature = "sqlx", sqlx(flatten))]
    pub product: Product,
    #[ts(as = "String")]
    pub favorited_at: DateTime<Utc>,
}

// =============================================================================
// Cart
// =============================================================================

/// A stored cart line.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CartItem {
    pub id: i64,
    pub cart_id: i64,
    pub product_id: i64,
    pub quantity: i64,
    #[ts(as = "String")]
    pub added_at: DateTime<Utc>,
}

/// A cart line joined with its product, as returned to the shopper.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CartLine {
    /// Product id.
    pub id: i64,
    pub name: String,
    pub price_cents: i64,
    pub image_url: Option<String>,
    pub quantity: i64,
}

impl CartLine {
    /// Price times quantity, `None` if it does not fit.
    #[inline]
    pub fn line_total(&self) -> Option<Money> {
        Money::from_cents(self.price_cents).multiply_quantity(self.quantity)
    }
}

// =============================================================================
// Orders
// =============================================================================

/// Fulfilment status of an order.
///
/// ## Lifecycle
/// ```text
/// pending ──► payment_waiting ──► confirmed ──► preparing ──► shipped ──► delivered
///    │              │
///    │              └──► payment_failed
///    │
///    └──► cancelled  (customer may cancel until the order ships)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    PaymentWaiting,
    PaymentFailed,
    Confirmed,
    Preparing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 8] = [
        OrderStatus::Pending,
        OrderStatus::PaymentWaiting,
        OrderStatus::PaymentFailed,
        OrderStatus::Confirmed,
        OrderStatus::Preparing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::PaymentWaiting => "payment_waiting",
            OrderStatus::PaymentFailed => "payment_failed",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Whether the customer may still cancel an order in this status.
    #[inline]
    pub const fn is_cancellable(&self) -> bool {
        !matches!(
            self,
            OrderStatus::Shipped | OrderStatus::Delivered | OrderStatus::Cancelled
        )
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Pending
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| {
                not_allowed(
                    "orderStatus",
                    &OrderStatus::ALL.map(|status| status.as_str()),
                )
            })
    }
}

/// Payment state of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub const ALL: [PaymentStatus; 4] = [
        PaymentStatus::Pending,
        PaymentStatus::Paid,
        PaymentStatus::Failed,
        PaymentStatus::Refunded,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }
}

impl Default for PaymentStatus {
    fn default() -> Self {
        PaymentStatus::Pending
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PaymentStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| {
                not_allowed(
                    "paymentStatus",
                    &PaymentStatus::ALL.map(|status| status.as_str()),
                )
            })
    }
}

/// A placed order.
///
/// The delivery address and card display data are copied onto the order so
/// later edits to the address book never rewrite history.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Order {
    pub id: i64,
    /// `None` once the customer account is deleted.
    pub user_id: Option<String>,

    pub address_title: Option<String>,
    pub full_name: String,
    pub phone: String,
    pub address_line: String,
    pub city: String,
    pub district: String,
    pub postal_code: Option<String>,

    pub payment_method: String,
    pub card_holder_name: Option<String>,
    pub card_last4: Option<String>,

    pub subtotal_cents: i64,
    pub shipping_cost_cents: i64,
    pub tax_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,

    pub customer_note: Option<String>,
    pub admin_note: Option<String>,

    pub order_status: OrderStatus,
    pub payment_status: PaymentStatus,

    pub cargo_company: Option<String>,
    pub tracking_number: Option<String>,
    pub estimated_delivery_date: Option<String>,

    #[ts(as = "Option<String>")]
    pub shipped_date: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub delivered_date: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub payment_date: Option<DateTime<Utc>>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Order {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

/// An order joined with the customer's contact details (admin views).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct OrderWithCustomer {
    #[serde(flatten)]
    #[cfg_attr(feature = "sqlx", sqlx(flatten))]
    pub order: Order,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
}

/// A line of an order. Uses the snapshot pattern: name, image and price are
/// frozen at checkout time.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    /// `None` once the product is deleted from the catalog.
    pub product_id: Option<i64>,
    pub product_name: String,
    pub product_image_url: Option<String>,
    pub unit_price_cents: i64,
    pub quantity: i64,
    pub subtotal_cents: i64,
}

/// One entry of an order's audit trail.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct OrderHistoryEntry {
    pub id: i64,
    pub order_id: i64,
    /// Order status or payment status recorded by this entry.
    pub status: String,
    pub note: Option<String>,
    pub created_by: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Address Book & Cards
// =============================================================================

/// A saved delivery address.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Address {
    pub id: i64,
    pub user_id: String,
    pub address_title: String,
    pub full_name: String,
    pub phone: String,
    pub city: String,
    pub district: String,
    pub neighborhood: Option<String>,
    pub address_line: String,
    pub postal_code: Option<String>,
    pub is_default: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// Display metadata of a saved payment card. Full card numbers are never stored.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Card {
    pub id: i64,
    #[serde(skip)]
    pub user_id: String,
    pub card_holder_name: String,
    pub last_four_digits: String,
    pub card_type: Option<String>,
    pub expiry_month: i64,
    pub expiry_year: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Notifications
// =============================================================================

/// The event a notification reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    OrderStatus,
    NewOrder,
    Campaign,
    QuestionAnswer,
    NewQuestion,
    GeneralAnnouncement,
    LowStock,
    Welcome,
}

/// An in-app notification.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Notification {
    pub id: i64,
    pub user_id: String,
    #[serde(rename = "type")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "type"))]
    pub kind: NotificationType,
    pub title: String,
    pub message: String,
    pub link: Option<String>,
    pub order_id: Option<i64>,
    pub question_id: Option<i64>,
    pub campaign_code: Option<String>,
    pub is_global: bool,
    pub sender_id: Option<String>,
    pub is_read: bool,
    #[ts(as = "Option<String>")]
    pub read_at: Option<DateTime<Utc>>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Per-user opt-outs for notification types and email copies.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct NotificationPreferences {
    pub user_id: String,
    pub order_status_updates: bool,
    pub campaign_notifications: bool,
    pub question_answers: bool,
    pub general_announcements: bool,
    pub new_orders: bool,
    pub new_questions: bool,
    pub low_stock_alerts: bool,
    pub email_order_status: bool,
    pub email_campaigns: bool,
    pub email_announcements: bool,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Content
// =============================================================================

/// An editable static page (about, terms, ...).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct PageContent {
    pub page_name: String,
    pub content: String,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// Support contact details shown on the help page.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct HelpInfo {
    pub phone: String,
    pub email: String,
    #[ts(as = "Option<String>")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// A FAQ entry. User-submitted questions start unpublished with no answer.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct FaqEntry {
    pub id: i64,
    pub question: String,
    pub answer: Option<String>,
    pub is_published: bool,
    pub is_user_question: bool,
    pub user_id: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// A FAQ entry joined with the asking user's contact details (admin view).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct FaqEntryWithAuthor {
    #[serde(flatten)]
    #[cfg_attr(feature = "sqlx", sqlx(flatten))]
    pub entry: FaqEntry,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn product(stock: i64, rule: OutOfStockRule) -> Product {
        let now = Utc::now();
        Product {
            id: 1,
            name: "Ceramic Mug".to_string(),
            description: None,
            price_cents: 1990,
            image_url: None,
            stock_quantity: stock,
            is_active: true,
            out_of_stock_display_rule: rule,
            critical_stock_threshold: Some(3),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_listing_visibility() {
        let hide = StoreSettings::default();
        let show = StoreSettings {
            sales_active: true,
            out_of_stock_behavior: OutOfStockBehavior::ShowAsOutOfStock,
        };

        assert!(product(5, OutOfStockRule::Hide).is_listed_for(&hide));
        assert!(!product(0, OutOfStockRule::Default).is_listed_for(&hide));
        assert!(product(0, OutOfStockRule::Default).is_listed_for(&show));
        assert!(product(0, OutOfStockRule::Show).is_listed_for(&hide));
        assert!(!product(0, OutOfStockRule::Hide).is_listed_for(&show));

        let mut inactive = product(5, OutOfStockRule::Show);
        inactive.is_active = false;
        assert!(!inactive.is_listed_for(&show));
    }

    #[test]
    fn test_low_stock_threshold() {
        let p = product(10, OutOfStockRule::Default);
        assert!(p.is_low_stock_at(3));
        assert!(!p.is_low_stock_at(4));

        let mut untracked = p.clone();
        untracked.critical_stock_threshold = None;
        assert!(!untracked.is_low_stock_at(0));
    }

    #[test]
    fn test_settings_from_pairs_defaults() {
        let settings = StoreSettings::from_pairs([("unrelated", "x")]);
        assert!(!settings.sales_active);
        assert_eq!(settings.out_of_stock_behavior, OutOfStockBehavior::Hide);

        let settings = StoreSettings::from_pairs([("sales_active", "false")]);
        assert!(!settings.sales_active);
    }

    #[test]
    fn test_setting_value_to_string() {
        assert_eq!(setting_value_to_string(&serde_json::json!("hide")), "hide");
        assert_eq!(setting_value_to_string(&serde_json::json!(true)), "true");
        assert_eq!(setting_value_to_string(&serde_json::json!(5)), "5");
    }

    #[test]
    fn test_order_status_parsing() {
        assert_eq!("shipped".parse::<OrderStatus>().unwrap(), OrderStatus::Shipped);
        assert!("lost".parse::<OrderStatus>().is_err());
        assert_eq!("paid".parse::<PaymentStatus>().unwrap(), PaymentStatus::Paid);
        assert_eq!(OrderStatus::PaymentWaiting.to_string(), "payment_waiting");
    }

    #[test]
    fn test_order_cancellable() {
        assert!(OrderStatus::Pending.is_cancellable());
        assert!(OrderStatus::Preparing.is_cancellable());
        assert!(!OrderStatus::Shipped.is_cancellable());
        assert!(!OrderStatus::Delivered.is_cancellable());
        assert!(!OrderStatus::Cancelled.is_cancellable());
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name(Some("Ada"), Some("Lovelace")).as_deref(), Some("Ada Lovelace"));
        assert_eq!(display_name(Some(" Ada "), None).as_deref(), Some("Ada"));
        assert_eq!(display_name(Some(""), None), None);
    }

    #[test]
    fn test_role_serde() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
        assert_eq!("customer".parse::<Role>().unwrap(), Role::Customer);
        assert!(Role::Admin.is_admin());
    }
}
