//! # Order Repository
//!
//! Checkout, fulfilment updates and cancellation. Every write here runs in a
//! single transaction: either the whole step lands or none of it does.
//!
//! ## Order Placement
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  place_order(user, ValidCheckout)                     BEGIN             │
//! │                                                                         │
//! │  for each line:                                                         │
//! │     SELECT product                   → ProductNotFound                 │
//! │     price_line(product, qty)         → InsufficientStock               │
//! │                                                                         │
//! │  OrderTotals::from_lines()                                              │
//! │  INSERT orders        (address + card snapshot, pending/pending)       │
//! │  INSERT order_items   (name, image, unit price snapshot)               │
//! │  UPDATE products SET stock = stock - qty WHERE stock >= qty            │
//! │        0 rows → someone bought it first → InsufficientStock            │
//! │  INSERT order_status_history ('pending', 'Order created')              │
//! │  DELETE cart_items                                                      │
//! │                                                       COMMIT            │
//! │                                                                         │
//! │  PlacedOrder { order, items, low_stock }  → notifications after commit │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Stock Conservation
//! ```text
//! placed      stock - qty          (guarded, never below zero)
//! cancelled   stock + qty          (once: cancelled orders are closed)
//! ```

use chrono::Utc;
use serde::Serialize;
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::begin_write;
use crate::repository::cart::clear_in_tx;
use crate::repository::product::PRODUCT_COLUMNS;
use storefront_core::checkout::{price_line, OrderTotals, PricedLine, ValidCheckout};
use storefront_core::{
    CoreError, Order, OrderHistoryEntry, OrderItem, OrderStatus, OrderWithCustomer,
    PaymentStatus, Product, ValidationError,
};

const ORDER_ITEM_COLUMNS: &str = "id, order_id, product_id, product_name, product_image_url, \
     unit_price_cents, quantity, subtotal_cents";

// =============================================================================
// Inputs & Outputs
// =============================================================================

/// A product whose stock fell to or below its alert threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LowStockAlert {
    pub product_id: i64,
    pub product_name: String,
    pub stock: i64,
}

/// Result of a committed checkout.
#[derive(Debug, Clone)]
pub struct PlacedOrder {
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub low_stock: Vec<LowStockAlert>,
}

/// Admin listing filter. `page` is 1-based.
#[derive(Debug, Clone, Copy)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub page: i64,
    pub limit: i64,
}

impl Default for OrderFilter {
    fn default() -> Self {
        OrderFilter {
            status: None,
            page: 1,
            limit: 20,
        }
    }
}

impl OrderFilter {
    fn offset(&self) -> i64 {
        (self.page.max(1) - 1) * self.limit
    }
}

/// Admin status change. At least one of the statuses must be set.
#[derive(Debug, Clone, Default)]
pub struct StatusUpdate {
    pub order_status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub note: Option<String>,
}

/// Outcome of a status change.
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub order: Order,
    pub previous_status: OrderStatus,
}

impl StatusChange {
    /// The new order status, when it differs from the previous one.
    pub fn changed_to(&self) -> Option<OrderStatus> {
        (self.order.order_status != self.previous_status).then_some(self.order.order_status)
    }
}

/// Shipment details. `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct ShippingUpdate {
    pub cargo_company: Option<String>,
    pub tracking_number: Option<String>,
    pub estimated_delivery_date: Option<String>,
}

impl ShippingUpdate {
    pub fn is_empty(&self) -> bool {
        self.cargo_company.is_none()
            && self.tracking_number.is_none()
            && self.estimated_delivery_date.is_none()
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for orders, order items and status history.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Places an order: validates stock, snapshots prices, reserves stock,
    /// writes history and clears the cart, all in one transaction.
    pub async fn place_order(&self, user_id: &str, checkout: ValidCheckout) -> DbResult<PlacedOrder> {
        debug!(user_id, lines = checkout.lines.len(), "Placing order");

        let now = Utc::now();
        let mut tx = begin_write(&self.pool).await?;

        // 1. Price every line against the current product row
        let mut priced: Vec<PricedLine> = Vec::with_capacity(checkout.lines.len());
        for line in &checkout.lines {
            let product = sqlx::query_as::<_, Product>(&format!(
                "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"
            ))
            .bind(line.product_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(CoreError::ProductNotFound(line.product_id))?;

            priced.push(price_line(&product, line.quantity)?);
        }

        let totals = OrderTotals::from_lines(&priced)?;

        // 2. Order row with the address and card snapshot
        let order = sqlx::query_as::<_, Order>(
            "INSERT INTO orders (
                user_id, address_title, full_name, phone, address_line, city, district, postal_code,
                payment_method, card_holder_name, card_last4,
                subtotal_cents, shipping_cost_cents, tax_cents, discount_cents, total_cents,
                customer_note, order_status, payment_status, created_at, updated_at
             ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8,
                ?9, ?10, ?11,
                ?12, ?13, ?14, ?15, ?16,
                ?17, ?18, ?19, ?20, ?20
             )
             RETURNING *",
        )
        .bind(user_id)
        .bind(&checkout.address.title)
        .bind(&checkout.address.full_name)
        .bind(&checkout.address.phone)
        .bind(&checkout.address.address_line)
        .bind(&checkout.address.city)
        .bind(&checkout.address.district)
        .bind(&checkout.address.postal_code)
        .bind(&checkout.payment_method)
        .bind(&checkout.card_holder_name)
        .bind(&checkout.card_last4)
        .bind(totals.subtotal.cents())
        .bind(totals.shipping.cents())
        .bind(totals.tax.cents())
        .bind(totals.discount.cents())
        .bind(totals.total.cents())
        .bind(&checkout.customer_note)
        .bind(OrderStatus::Pending)
        .bind(PaymentStatus::Pending)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        // 3. Items and guarded stock decrement
        let mut items = Vec::with_capacity(priced.len());
        for line in &priced {
            let item = sqlx::query_as::<_, OrderItem>(&format!(
                "INSERT INTO order_items (
                    order_id, product_id, product_name, product_image_url,
                    unit_price_cents, quantity, subtotal_cents
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 RETURNING {ORDER_ITEM_COLUMNS}"
            ))
            .bind(order.id)
            .bind(line.product_id)
            .bind(&line.product_name)
            .bind(&line.product_image_url)
            .bind(line.unit_price.cents())
            .bind(line.quantity)
            .bind(line.subtotal.cents())
            .fetch_one(&mut *tx)
            .await?;
            items.push(item);

            let result = sqlx::query(
                "UPDATE products SET stock_quantity = stock_quantity - ?2, updated_at = ?3
                 WHERE id = ?1 AND stock_quantity >= ?2",
            )
            .bind(line.product_id)
            .bind(line.quantity)
            .bind(now)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                let available: i64 =
                    sqlx::query_scalar("SELECT stock_quantity FROM products WHERE id = ?1")
                        .bind(line.product_id)
                        .fetch_optional(&mut *tx)
                        .await?
                        .unwrap_or(0);
                return Err(CoreError::InsufficientStock {
                    product: line.product_name.clone(),
                    available,
                    requested: line.quantity,
                }
                .into());
            }
        }

        // 4. History and cart
        insert_history(&mut tx, order.id, OrderStatus::Pending.as_str(), Some("Order created"), Some(user_id), now)
            .await?;
        clear_in_tx(&mut tx, user_id).await?;

        tx.commit().await?;

        info!(order_id = order.id, total = %totals.total, "Order placed");

        let low_stock = priced
            .iter()
            .filter(|l| l.low_stock)
            .map(|l| LowStockAlert {
                product_id: l.product_id,
                product_name: l.product_name.clone(),
                stock: l.remaining_stock,
            })
            .collect();

        Ok(PlacedOrder {
            order,
            items,
            low_stock,
        })
    }

    /// Admin listing, newest first, with the customer's contact details.
    ///
    /// Returns the page and the total number of matching orders.
    pub async fn list(&self, filter: OrderFilter) -> DbResult<(Vec<OrderWithCustomer>, i64)> {
        let orders = sqlx::query_as::<_, OrderWithCustomer>(
            "SELECT o.*, u.first_name, u.last_name, u.email
             FROM orders o
             LEFT JOIN users u ON u.id = o.user_id
             WHERE ?1 IS NULL OR o.order_status = ?1
             ORDER BY o.created_at DESC, o.id DESC
             LIMIT ?2 OFFSET ?3",
        )
        .bind(filter.status)
        .bind(filter.limit)
        .bind(filter.offset())
        .fetch_all(&self.pool)
        .await?;

        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE ?1 IS NULL OR order_status = ?1")
                .bind(filter.status)
                .fetch_one(&self.pool)
                .await?;

        Ok((orders, total))
    }

    pub async fn get(&self, id: i64) -> DbResult<Option<Order>> {
        let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(order)
    }

    pub async fn items(&self, order_id: i64) -> DbResult<Vec<OrderItem>> {
        let items = sqlx::query_as::<_, OrderItem>(&format!(
            "SELECT {ORDER_ITEM_COLUMNS} FROM order_items WHERE order_id = ?1 ORDER BY id"
        ))
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Status history, newest first, with the author's name.
    pub async fn history(&self, order_id: i64) -> DbResult<Vec<OrderHistoryEntry>> {
        let entries = sqlx::query_as::<_, OrderHistoryEntry>(
            "SELECT h.id, h.order_id, h.status, h.note, h.created_by,
                    u.first_name, u.last_name, h.created_at
             FROM order_status_history h
             LEFT JOIN users u ON u.id = h.created_by
             WHERE h.order_id = ?1
             ORDER BY h.created_at DESC, h.id DESC",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// The caller's orders, newest first.
    pub async fn list_for_user(&self, user_id: &str) -> DbResult<Vec<Order>> {
        let orders = sqlx::query_as::<_, Order>(
            "SELECT * FROM orders WHERE user_id = ?1 ORDER BY created_at DESC, id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(orders)
    }

    /// Changes order and/or payment status on behalf of an admin.
    ///
    /// ## Side Effects
    /// - `shipped` stamps `shipped_date`, `delivered` stamps `delivered_date`
    /// - `paid` stamps `payment_date`
    /// - moving into `cancelled` restores stock; leaving `cancelled` is refused
    /// - one history row per call
    pub async fn update_status(
        &self,
        order_id: i64,
        update: StatusUpdate,
        admin_id: &str,
    ) -> DbResult<StatusChange> {
        let history_status = match (update.order_status, update.payment_status) {
            (Some(status), _) => status.as_str(),
            (None, Some(payment)) => payment.as_str(),
            (None, None) => return Err(CoreError::from(ValidationError::required("orderStatus")).into()),
        };

        debug!(order_id, status = history_status, "Updating order status");

        let now = Utc::now();
        let mut tx = begin_write(&self.pool).await?;

        let previous_status: OrderStatus =
            sqlx::query_scalar("SELECT order_status FROM orders WHERE id = ?1")
                .bind(order_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(CoreError::OrderNotFound(order_id))?;

        if let Some(next) = update.order_status {
            if previous_status == OrderStatus::Cancelled && next != OrderStatus::Cancelled {
                return Err(CoreError::OrderClosed {
                    order_id,
                    requested: next.as_str().to_string(),
                }
                .into());
            }
            if next == OrderStatus::Cancelled && previous_status != OrderStatus::Cancelled {
                restock_in_tx(&mut tx, order_id, now).await?;
            }
        }

        let order = sqlx::query_as::<_, Order>(
            "UPDATE orders SET
                order_status   = COALESCE(?2, order_status),
                payment_status = COALESCE(?3, payment_status),
                shipped_date   = CASE WHEN ?2 = 'shipped'   THEN ?4 ELSE shipped_date END,
                delivered_date = CASE WHEN ?2 = 'delivered' THEN ?4 ELSE delivered_date END,
                payment_date   = CASE WHEN ?3 = 'paid'      THEN ?4 ELSE payment_date END,
                updated_at     = ?4
             WHERE id = ?1
             RETURNING *",
        )
        .bind(order_id)
        .bind(update.order_status)
        .bind(update.payment_status)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        let note = update
            .note
            .unwrap_or_else(|| format!("Status updated: {history_status}"));
        insert_history(&mut tx, order_id, history_status, Some(&note), Some(admin_id), now).await?;

        tx.commit().await?;

        Ok(StatusChange {
            order,
            previous_status,
        })
    }

    /// Updates shipment tracking fields. Fields left `None` keep their value.
    pub async fn update_shipping(&self, order_id: i64, update: &ShippingUpdate) -> DbResult<Order> {
        if update.is_empty() {
            return Err(CoreError::from(ValidationError::required("cargoCompany")).into());
        }

        let order = sqlx::query_as::<_, Order>(
            "UPDATE orders SET
                cargo_company           = COALESCE(?2, cargo_company),
                tracking_number         = COALESCE(?3, tracking_number),
                estimated_delivery_date = COALESCE(?4, estimated_delivery_date),
                updated_at              = ?5
             WHERE id = ?1
             RETURNING *",
        )
        .bind(order_id)
        .bind(&update.cargo_company)
        .bind(&update.tracking_number)
        .bind(&update.estimated_delivery_date)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        order.ok_or_else(|| CoreError::OrderNotFound(order_id).into())
    }

    /// Replaces the internal admin note.
    pub async fn set_admin_note(&self, order_id: i64, note: Option<&str>) -> DbResult<Order> {
        let order = sqlx::query_as::<_, Order>(
            "UPDATE orders SET admin_note = ?2, updated_at = ?3 WHERE id = ?1 RETURNING *",
        )
        .bind(order_id)
        .bind(note)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        order.ok_or_else(|| CoreError::OrderNotFound(order_id).into())
    }

    /// Cancels one of the caller's own orders and puts the stock back.
    ///
    /// ## Returns
    /// * `Err(OrderNotFound)` - no such order for this user
    /// * `Err(OrderNotCancellable)` - already shipped, delivered or cancelled
    pub async fn cancel(&self, order_id: i64, user_id: &str) -> DbResult<Order> {
        debug!(order_id, user_id, "Customer cancelling order");

        let now = Utc::now();
        let mut tx = begin_write(&self.pool).await?;

        let status: OrderStatus =
            sqlx::query_scalar("SELECT order_status FROM orders WHERE id = ?1 AND user_id = ?2")
                .bind(order_id)
                .bind(user_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(CoreError::OrderNotFound(order_id))?;

        if !status.is_cancellable() {
            return Err(CoreError::OrderNotCancellable {
                order_id,
                status: status.as_str().to_string(),
            }
            .into());
        }

        restock_in_tx(&mut tx, order_id, now).await?;

        let order = sqlx::query_as::<_, Order>(
            "UPDATE orders SET order_status = ?2, updated_at = ?3 WHERE id = ?1 RETURNING *",
        )
        .bind(order_id)
        .bind(OrderStatus::Cancelled)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        insert_history(
            &mut tx,
            order_id,
            OrderStatus::Cancelled.as_str(),
            Some("Cancelled by customer"),
            Some(user_id),
            now,
        )
        .await?;

        tx.commit().await?;

        info!(order_id, "Order cancelled by customer");
        Ok(order)
    }
}

// =============================================================================
// Transaction Helpers
// =============================================================================

async fn insert_history(
    tx: &mut Transaction<'_, Sqlite>,
    order_id: i64,
    status: &str,
    note: Option<&str>,
    created_by: Option<&str>,
    at: chrono::DateTime<Utc>,
) -> DbResult<()> {
    sqlx::query(
        "INSERT INTO order_status_history (order_id, status, note, created_by, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )
    .bind(order_id)
    .bind(status)
    .bind(note)
    .bind(created_by)
    .bind(at)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Adds every item's quantity back to its product. Deleted products are skipped.
async fn restock_in_tx(
    tx: &mut Transaction<'_, Sqlite>,
    order_id: i64,
    at: chrono::DateTime<Utc>,
) -> DbResult<()> {
    let lines = sqlx::query_as::<_, (i64, i64)>(
        "SELECT product_id, quantity FROM order_items
         WHERE order_id = ?1 AND product_id IS NOT NULL",
    )
    .bind(order_id)
    .fetch_all(&mut **tx)
    .await?;

    for (product_id, quantity) in lines {
        sqlx::query(
            "UPDATE products SET stock_quantity = stock_quantity + ?2, updated_at = ?3 WHERE id = ?1",
        )
        .bind(product_id)
        .bind(quantity)
        .bind(at)
        .execute(&mut **tx)
        .await?;
    }

    debug!(order_id, "Stock restored");
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
