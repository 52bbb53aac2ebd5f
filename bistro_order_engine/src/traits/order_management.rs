use crate::{
    db_types::{MenuItem, Order, OrderWithItems},
    order_objects::OrderQueryFilter,
    traits::OrderLedgerError,
};

/// Read access to the menu catalog projection.
#[allow(async_fn_in_trait)]
pub trait MenuCatalog {
    /// Fetches the catalog rows for the given ids. Ids that do not exist are simply absent from
    /// the result; deciding what that means is the caller's job.
    async fn menu_items_by_id(&self, ids: &[i64]) -> Result<Vec<MenuItem>, OrderLedgerError>;
}

/// Read access to orders.
#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    async fn fetch_order(&self, id: i64) -> Result<Option<Order>, OrderLedgerError>;

    /// Fetches an order together with its line items, assembled in application code from
    /// normalized rows.
    async fn fetch_order_with_items(&self, id: i64) -> Result<Option<OrderWithItems>, OrderLedgerError>;

    /// All orders belonging to the given authenticated user, newest first.
    async fn orders_for_user(&self, user_id: i64) -> Result<Vec<Order>, OrderLedgerError>;

    /// Fetches orders according to the criteria in the filter, oldest first.
    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, OrderLedgerError>;
}
