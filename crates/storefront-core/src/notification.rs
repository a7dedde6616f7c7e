//! # Notification Templates
//!
//! Builds the in-app notifications the storefront sends and decides whether
//! a user's preferences let a given type through.
//!
//! ## Fan-out
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Event                    Draft                    Recipients           │
//! │                                                                         │
//! │  order placed      ──►  new_order          ──►  every admin            │
//! │  status changed    ──►  order_status       ──►  order owner            │
//! │  stock low         ──►  low_stock          ──►  every admin            │
//! │  question asked    ──►  new_question       ──►  every admin            │
//! │  question answered ──►  question_answer    ──►  asking user            │
//! │  registered        ──►  welcome            ──►  new user               │
//! │  broadcast         ──►  announcement       ──►  every customer         │
//! │  campaign          ──►  campaign           ──►  every customer         │
//! │                                                                         │
//! │  Each recipient's preferences are checked before insert, except for    │
//! │  global broadcasts which bypass the per-user switches.                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Drafts carry no recipient. The database layer stamps one per target.

use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::types::{NotificationPreferences, NotificationType, OrderStatus};
use crate::CURRENCY_LABEL;

// =============================================================================
// Draft
// =============================================================================

/// A notification ready to be delivered to one or more users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationDraft {
    pub kind: NotificationType,
    pub title: String,
    pub message: String,
    pub link: Option<String>,
    pub order_id: Option<i64>,
    pub question_id: Option<i64>,
    pub campaign_code: Option<String>,
    /// Broadcasts skip the per-user preference check.
    pub is_global: bool,
    pub sender_id: Option<String>,
}

impl NotificationDraft {
    /// Creates a plain draft with no references attached.
    pub fn new(kind: NotificationType, title: impl Into<String>, message: impl Into<String>) -> Self {
        NotificationDraft {
            kind,
            title: title.into(),
            message: message.into(),
            link: None,
            order_id: None,
            question_id: None,
            campaign_code: None,
            is_global: false,
            sender_id: None,
        }
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    pub fn with_order(mut self, order_id: i64) -> Self {
        self.order_id = Some(order_id);
        self
    }

    pub fn with_question(mut self, question_id: i64) -> Self {
        self.question_id = Some(question_id);
        self
    }

    /// Marks the draft as a broadcast sent by `sender_id`.
    pub fn global_from(mut self, sender_id: Option<String>) -> Self {
        self.is_global = true;
        self.sender_id = sender_id;
        self
    }
}

// =============================================================================
// Templates
// =============================================================================

/// Tells a customer their order moved to a new status.
///
/// ## Example
/// ```rust
/// use storefront_core::notification::order_status_changed;
/// use storefront_core::OrderStatus;
///
/// let draft = order_status_changed(42, OrderStatus::Shipped);
/// assert_eq!(draft.title, "Order #42 - Status Updated");
/// assert_eq!(draft.message, "Your order #42 has been shipped.");
/// assert_eq!(draft.link.as_deref(), Some("/order-detail.html?id=42"));
/// ```
pub fn order_status_changed(order_id: i64, status: OrderStatus) -> NotificationDraft {
    let message = match status {
        OrderStatus::Pending => format!("Your order #{order_id} has been received and is being processed."),
        OrderStatus::PaymentWaiting => format!("Your order #{order_id} is awaiting payment."),
        OrderStatus::PaymentFailed => {
            format!("Payment for your order #{order_id} failed. Please try again.")
        }
        OrderStatus::Confirmed => format!("Your order #{order_id} has been confirmed."),
        OrderStatus::Preparing => format!("Your order #{order_id} is being prepared."),
        OrderStatus::Shipped => format!("Your order #{order_id} has been shipped."),
        OrderStatus::Delivered => format!("Your order #{order_id} has been delivered."),
        OrderStatus::Cancelled => format!("Your order #{order_id} has been cancelled."),
    };

    NotificationDraft::new(
        NotificationType::OrderStatus,
        format!("Order #{order_id} - Status Updated"),
        message,
    )
    .with_link(format!("/order-detail.html?id={order_id}"))
    .with_order(order_id)
}

/// Tells admins a customer placed an order.
pub fn new_order(order_id: i64, customer_name: &str, total: Money) -> NotificationDraft {
    NotificationDraft::new(
        NotificationType::NewOrder,
        "New order received",
        format!("{customer_name} placed an order of {total} {CURRENCY_LABEL}"),
    )
    .with_link(format!("/orders.html?orderId={order_id}"))
    .with_order(order_id)
}

/// Tells admins a product dropped to or below its critical threshold.
pub fn low_stock(product_id: i64, product_name: &str, stock: i64) -> NotificationDraft {
    NotificationDraft::new(
        NotificationType::LowStock,
        "Low stock alert",
        format!("{product_name} is running low. Current stock: {stock}"),
    )
    .with_link(format!("/product.html?id={product_id}"))
}

/// Tells admins a user submitted a question.
pub fn new_question(question_id: i64, asker_name: &str, question: &str) -> NotificationDraft {
    NotificationDraft::new(
        NotificationType::NewQuestion,
        "New question asked",
        format!("{asker_name} asked: \"{}\"", truncate(question.trim(), 100)),
    )
    .with_link("/faq.html")
    .with_question(question_id)
}

/// Tells the asking user their question was answered.
pub fn question_answered(question_id: i64, question: &str, answer: &str) -> NotificationDraft {
    NotificationDraft::new(
        NotificationType::QuestionAnswer,
        "Your question was answered!",
        format!(
            "Your question: \"{}\"\n\nAnswer: {}",
            truncate(question, 80),
            truncate(answer, 150)
        ),
    )
    .with_link("/faq.html")
    .with_question(question_id)
}

/// Greets a newly registered user.
pub fn welcome(first_name: Option<&str>) -> NotificationDraft {
    let title = match first_name.map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) => format!("Welcome {name}!"),
        None => "Welcome!".to_string(),
    };

    NotificationDraft::new(
        NotificationType::Welcome,
        title,
        "Thanks for joining us. Start exploring the catalog and enjoy shopping.",
    )
    .with_link("/")
}

/// An admin broadcast to every customer.
pub fn announcement(
    title: &str,
    message: &str,
    link: Option<&str>,
    sender_id: Option<String>,
) -> NotificationDraft {
    let mut draft = NotificationDraft::new(NotificationType::GeneralAnnouncement, title, message)
        .global_from(sender_id);
    draft.link = link.map(str::to_string);
    draft
}

/// A campaign broadcast to every customer.
///
/// ```rust
/// use storefront_core::notification::campaign;
///
/// let draft = campaign("Spring sale", "20% off mugs", Some("SPRING20"), None, None);
/// assert_eq!(draft.title, "🎉 Spring sale");
/// assert!(draft.is_global);
/// ```
pub fn campaign(
    title: &str,
    message: &str,
    campaign_code: Option<&str>,
    link: Option<&str>,
    sender_id: Option<String>,
) -> NotificationDraft {
    let mut draft =
        NotificationDraft::new(NotificationType::Campaign, format!("🎉 {title}"), message)
            .global_from(sender_id);
    draft.link = link.map(str::to_string);
    draft.campaign_code = campaign_code.map(str::to_string);
    draft
}

// =============================================================================
// Preferences
// =============================================================================

/// Whether `prefs` lets a notification of `kind` through.
///
/// Types without a switch (welcome) are always delivered. Users with no
/// preferences row receive everything, so callers pass `None` for them.
pub fn preferences_allow(prefs: Option<&NotificationPreferences>, kind: NotificationType) -> bool {
    let Some(prefs) = prefs else {
        return true;
    };

    match kind {
        NotificationType::OrderStatus => prefs.order_status_updates,
        NotificationType::Campaign => prefs.campaign_notifications,
        NotificationType::QuestionAnswer => prefs.question_answers,
        NotificationType::GeneralAnnouncement => prefs.general_announcements,
        NotificationType::NewOrder => prefs.new_orders,
        NotificationType::NewQuestion => prefs.new_questions,
        NotificationType::LowStock => prefs.low_stock_alerts,
        NotificationType::Welcome => true,
    }
}

/// Cuts `text` to at most `max` characters, appending `...` when shortened.
pub fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
