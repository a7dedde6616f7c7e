//! # Notification Dispatcher
//!
//! Sends notifications after the triggering write has committed.
//!
//! ```text
//! handler ── commit ──► Notifier::order_placed(..) ──► tokio::spawn ──► return 201
//!                                                          │
//!                                                          ▼
//!                                              NotificationRepository
//!                                              (failures: warn! only)
//! ```
//! Every method returns immediately. Nothing here can fail or slow down the
//! request that triggered it.

use std::future::Future;

use tracing::{debug, warn};

use storefront_core::notification::{self, NotificationDraft};
use storefront_core::{Money, OrderStatus, Role};
use storefront_db::{Database, DbResult, PlacedOrder};

#[derive(Clone)]
pub struct Notifier {
    db: Database,
}

impl Notifier {
    pub fn new(db: Database) -> Self {
        Notifier { db }
    }

    /// `new_order` to admins, plus `low_stock` for every product that crossed
    /// its threshold.
    pub fn order_placed(&self, placed: &PlacedOrder, customer_id: &str) {
        let db = self.db.clone();
        let customer_id = customer_id.to_string();
        let order_id = placed.order.id;
        let total = Money::from_cents(placed.order.total_cents);
        let alerts = placed.low_stock.clone();

        tokio::spawn(async move {
            let name = match db.users().get_by_id(&customer_id).await {
                Ok(Some(customer)) => customer.display_name(),
                Ok(None) => "A customer".to_string(),
                Err(e) => {
                    warn!(user_id = %customer_id, error = %e, "Customer lookup failed");
                    "A customer".to_string()
                }
            };

            let mut drafts = vec![("new_order", notification::new_order(order_id, &name, total))];
            drafts.extend(alerts.iter().map(|alert| {
                let draft = notification::low_stock(alert.product_id, &alert.product_name, alert.stock);
                ("low_stock", draft)
            }));

            let notifications = db.notifications();
            deliver_each(drafts, |draft| {
                let notifications = notifications.clone();
                async move { notifications.notify_role(Role::Admin, &draft).await }
            })
            .await;
        });
    }

    /// `order_status` to the order's owner.
    pub fn order_status_changed(&self, owner_id: Option<String>, order_id: i64, status: OrderStatus) {
        let Some(owner_id) = owner_id else {
            debug!(order_id, "Order has no owner, skipping status notification");
            return;
        };
        let draft = notification::order_status_changed(order_id, status);
        self.send_to(owner_id, draft, "order_status");
    }

    pub fn welcome(&self, user_id: &str, first_name: Option<&str>) {
        self.send_to(user_id.to_string(), notification::welcome(first_name), "welcome");
    }

    /// `new_question` to admins.
    pub fn question_asked(&self, question_id: i64, asker_id: &str, question: &str) {
        let db = self.db.clone();
        let asker_id = asker_id.to_string();
        let question = question.to_string();

        spawn("question_asked", async move {
            let asker = db.users().get_by_id(&asker_id).await?;
            let name = asker
                .map(|u| u.display_name())
                .unwrap_or_else(|| "A customer".to_string());

            let draft = notification::new_question(question_id, &name, &question);
            db.notifications().notify_role(Role::Admin, &draft).await?;
            Ok(())
        });
    }

    /// `question_answer` to the asking user.
    pub fn question_answered(&self, user_id: String, question_id: i64, question: &str, answer: &str) {
        let draft = notification::question_answered(question_id, question, answer);
        self.send_to(user_id, draft, "question_answer");
    }

    fn send_to(&self, user_id: String, draft: NotificationDraft, what: &'static str) {
        let db = self.db.clone();
        spawn(what, async move {
            db.notifications().create_for(&user_id, &draft).await?;
            Ok(())
        });
    }
}

/// Sends every draft in order. A failure is logged and the rest still go out.
///
/// Returns how many drafts were delivered without error.
async fn deliver_each<F, Fut>(drafts: Vec<(&'static str, NotificationDraft)>, mut send: F) -> usize
where
    F: FnMut(NotificationDraft) -> Fut,
    Fut: Future<Output = DbResult<usize>>,
{
    let mut delivered = 0;
    for (what, draft) in drafts {
        match send(draft).await {
            Ok(recipients) => {
                debug!(notification = what, recipients, "Notification sent");
                delivered += 1;
            }
            Err(e) => warn!(notification = what, error = %e, "Notification dispatch failed"),
        }
    }
    delivered
}

fn spawn(what: &'static str, task: impl Future<Output = DbResult<()>> + Send + 'static) {
    tokio::spawn(async move {
        if let Err(e) = task.await {
            warn!(notification = what, error = %e, "Notification dispatch failed");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use storefront_core::NotificationType;
    use storefront_db::DbError;

    #[tokio::test]
    async fn test_failed_send_does_not_stop_later_drafts() {
        let drafts = vec![
            ("new_order", notification::new_order(7, "Ada", Money::from_cents(1990))),
            ("low_stock", notification::low_stock(1, "Mug", 1)),
            ("low_stock", notification::low_stock(2, "Bowl", 0)),
        ];

        let mut attempted = Vec::new();
        let delivered = deliver_each(drafts, |draft| {
            attempted.push(draft.kind);
            let fails = draft.kind == NotificationType::NewOrder;
            async move {
                if fails {
                    Err(DbError::Internal("disk full".to_string()))
                } else {
                    Ok(1)
                }
            }
        })
        .await;

        assert_eq!(delivered, 2);
        assert_eq!(
            attempted,
            vec![
                NotificationType::NewOrder,
                NotificationType::LowStock,
                NotificationType::LowStock
            ]
        );
    }
}
