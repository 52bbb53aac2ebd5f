use std::fmt::Debug;

use crate::{
    db_types::{Order, OrderWithItems},
    order_objects::OrderQueryFilter,
    traits::{OrderLedgerError, OrderManagement},
};

/// Read-only access to orders, for the account-facing and admin listing endpoints.
pub struct OrderQueryApi<B> {
    db: B,
}

impl<B> Debug for OrderQueryApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderQueryApi")
    }
}

impl<B> OrderQueryApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> OrderQueryApi<B>
where B: OrderManagement
{
    pub async fn fetch_order(&self, id: i64) -> Result<Option<Order>, OrderLedgerError> {
        self.db.fetch_order(id).await
    }

    pub async fn fetch_order_with_items(&self, id: i64) -> Result<Option<OrderWithItems>, OrderLedgerError> {
        self.db.fetch_order_with_items(id).await
    }

    pub async fn orders_for_user(&self, user_id: i64) -> Result<Vec<Order>, OrderLedgerError> {
        self.db.orders_for_user(user_id).await
    }

    pub async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, OrderLedgerError> {
        self.db.search_orders(query).await
    }
}
