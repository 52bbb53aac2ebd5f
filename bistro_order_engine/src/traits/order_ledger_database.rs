use thiserror::Error;

use crate::{
    db_types::{NewOrder, Order, OrderStatus, OrderWithItems},
    pricing::Quote,
    traits::{MenuCatalog, OrderManagement},
};

/// This trait defines the highest level of behaviour for backends supporting the order engine:
/// the atomic persistence boundary for orders, and the two payment-completion paths (cash at the
/// door, asynchronous gateway notification).
///
/// Implementations are the *sole* writers of `orders` and `order_items` rows.
#[allow(async_fn_in_trait)]
pub trait OrderLedgerDatabase: MenuCatalog + OrderManagement {
    /// The URL of the database.
    fn url(&self) -> &str;

    /// Commits an order and its line items in a single atomic transaction.
    ///
    /// Inside the transaction, every cart item is re-verified as present, active and available;
    /// pricing ran outside the transaction and an item can be deactivated in between. On any
    /// failure at any step the whole transaction rolls back; a partially-written order is never
    /// observable.
    async fn create_order(&self, order: NewOrder, quote: &Quote) -> Result<OrderWithItems, OrderLedgerError>;

    /// Writes a new fulfillment status. This is the raw write; transition legality is enforced by
    /// the API layer before calling it.
    async fn update_order_status(&self, id: i64, status: OrderStatus) -> Result<Order, OrderLedgerError>;

    /// Records that a cash-on-delivery order has been paid.
    ///
    /// Only valid when the order pays cash and is still unpaid; sets `payment_status = paid` and
    /// promotes `status` from `pending` to `confirmed` if still pending. The check and the write
    /// happen in one transaction so that two couriers reporting the same payment cannot both
    /// succeed.
    async fn settle_cash_payment(&self, id: i64) -> Result<Order, OrderLedgerError>;

    /// Marks the order referencing the given payment intent as paid.
    ///
    /// This is the reconciliation entry point for gateway webhooks and must be idempotent: the
    /// webhook delivery path has no ordering guarantee relative to the client-driven confirm
    /// request, so the same "succeeded" observation can arrive more than once.
    async fn mark_paid_by_intent(&self, intent_id: &str) -> Result<IntentReconciliation, OrderLedgerError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), OrderLedgerError> {
        Ok(())
    }
}

/// The outcome of reconciling a successful payment intent against the ledger.
#[derive(Debug, Clone)]
pub enum IntentReconciliation {
    /// The order was unpaid and has now been marked paid.
    Updated(Order),
    /// The order was already paid; nothing was changed.
    AlreadyPaid(Order),
    /// No order references this intent (yet). The notification is acknowledged and the client
    /// confirm flow is expected to create the order.
    NoMatchingOrder,
}

#[derive(Debug, Clone, Error)]
pub enum OrderLedgerError {
    #[error("We have an internal database engine error: {0}")]
    DatabaseError(String),
    #[error("Menu items not found: {0}")]
    ItemNotFound(String),
    #[error("The following items are currently unavailable: {0}")]
    ItemUnavailable(String),
    #[error("An order must contain at least one item")]
    EmptyOrder,
    #[error("Item quantities must be greater than zero")]
    InvalidQuantity,
    #[error("The requested order {0} does not exist")]
    OrderNotFound(i64),
    #[error("The requested order change would result in a no-op.")]
    OrderModificationNoOp,
    #[error("Order status cannot change from {from} to {to}")]
    InvalidStatusTransition { from: OrderStatus, to: OrderStatus },
    #[error("Payment has already been completed")]
    PaymentAlreadyCompleted(i64),
    #[error("Order {0} is not a cash-on-delivery order")]
    NotACashOrder(i64),
}

impl From<sqlx::Error> for OrderLedgerError {
    fn from(e: sqlx::Error) -> Self {
        OrderLedgerError::DatabaseError(e.to_string())
    }
}
