use crate::db_types::{Order, OrderWithItems};

/// Fired after an order (and its items) have been committed to the ledger.
#[derive(Clone, Debug)]
pub struct OrderConfirmationEvent {
    pub order: OrderWithItems,
}

/// Fired when an order's payment completes, either a cash settlement or a reconciled gateway
/// notification. Fired at most once per order; the idempotent reconcile path suppresses repeats.
#[derive(Clone, Debug)]
pub struct OrderPaidEvent {
    pub order: Order,
}
