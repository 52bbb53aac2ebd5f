//! `SqliteDatabase` is a concrete implementation of an order engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the
//! [`crate::traits`] module. Embedded migrations run on connection, so an in-memory database is a
//! fully working backend for tests.

use std::fmt::Debug;

use bpg_common::Money;
use log::*;
use sqlx::SqlitePool;

use super::db::{menu_items, new_pool, orders};
use crate::{
    db_types::{MenuItem, NewOrder, Order, OrderStatus, OrderWithItems, PaymentMethod, PaymentStatus},
    order_objects::OrderQueryFilter,
    pricing::{self, Quote},
    traits::{IntentReconciliation, MenuCatalog, OrderLedgerDatabase, OrderLedgerError, OrderManagement},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object from the `BPG_DATABASE_URL` environment variable.
    pub async fn new(max_connections: u32) -> Result<Self, OrderLedgerError> {
        let url = super::db::db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, OrderLedgerError> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        sqlx::migrate!().run(&pool).await.map_err(|e| OrderLedgerError::DatabaseError(e.to_string()))?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Seeds a catalog row. Catalog maintenance belongs to the menu collaborator; this path
    /// exists for deployments and tests.
    pub async fn seed_menu_item(
        &self,
        name: &str,
        price: Money,
        is_available: bool,
        is_active: bool,
    ) -> Result<MenuItem, OrderLedgerError> {
        let mut conn = self.pool.acquire().await?;
        let item = menu_items::insert_menu_item(name, price, is_available, is_active, &mut conn).await?;
        Ok(item)
    }

    pub async fn set_menu_item_availability(&self, id: i64, is_available: bool) -> Result<MenuItem, OrderLedgerError> {
        let mut conn = self.pool.acquire().await?;
        let item = menu_items::set_item_availability(id, is_available, &mut conn)
            .await?
            .ok_or_else(|| OrderLedgerError::ItemNotFound(id.to_string()))?;
        Ok(item)
    }
}

impl MenuCatalog for SqliteDatabase {
    async fn menu_items_by_id(&self, ids: &[i64]) -> Result<Vec<MenuItem>, OrderLedgerError> {
        let mut conn = self.pool.acquire().await?;
        let items = menu_items::items_by_ids(ids, &mut conn).await?;
        Ok(items)
    }
}

impl OrderManagement for SqliteDatabase {
    async fn fetch_order(&self, id: i64) -> Result<Option<Order>, OrderLedgerError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order(id, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_order_with_items(&self, id: i64) -> Result<Option<OrderWithItems>, OrderLedgerError> {
        let mut conn = self.pool.acquire().await?;
        let order = match orders::fetch_order(id, &mut conn).await? {
            Some(order) => order,
            None => return Ok(None),
        };
        let items = orders::fetch_order_items(id, &mut conn).await?;
        Ok(Some(OrderWithItems { order, items }))
    }

    async fn orders_for_user(&self, user_id: i64) -> Result<Vec<Order>, OrderLedgerError> {
        let mut conn = self.pool.acquire().await?;
        let result = orders::fetch_orders_for_user(user_id, &mut conn).await?;
        Ok(result)
    }

    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, OrderLedgerError> {
        let mut conn = self.pool.acquire().await?;
        let result = orders::search_orders(query, &mut conn).await?;
        Ok(result)
    }
}

impl OrderLedgerDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn create_order(&self, order: NewOrder, quote: &Quote) -> Result<OrderWithItems, OrderLedgerError> {
        let mut tx = self.pool.begin().await?;
        // Pricing ran outside this transaction; an item can be deactivated in between. Re-verify
        // every line before writing anything.
        let ids: Vec<i64> = quote.lines.iter().map(|l| l.menu_item_id).collect();
        let catalog = menu_items::items_by_ids(&ids, &mut tx).await?;
        pricing::verify_lines(&ids, &catalog)?;
        let order = orders::insert_order(order, quote, &mut tx).await?;
        let mut items = Vec::with_capacity(quote.lines.len());
        for line in &quote.lines {
            let item = orders::insert_order_item(order.id, line, &mut tx).await?;
            items.push(item);
        }
        tx.commit().await?;
        debug!("🗃️ Order #{} committed with {} line items", order.id, items.len());
        Ok(OrderWithItems { order, items })
    }

    async fn update_order_status(&self, id: i64, status: OrderStatus) -> Result<Order, OrderLedgerError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::update_order_status(id, status, &mut conn).await?;
        debug!("🗃️ Order #{id} status written as {status}");
        Ok(order)
    }

    async fn settle_cash_payment(&self, id: i64) -> Result<Order, OrderLedgerError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::fetch_order(id, &mut tx).await?.ok_or(OrderLedgerError::OrderNotFound(id))?;
        if order.payment_method != PaymentMethod::CashOnDelivery {
            return Err(OrderLedgerError::NotACashOrder(id));
        }
        if order.payment_status == PaymentStatus::Paid {
            return Err(OrderLedgerError::PaymentAlreadyCompleted(id));
        }
        let status =
            if order.status == OrderStatus::Pending { OrderStatus::Confirmed } else { order.status };
        let updated = orders::update_payment_state(id, PaymentStatus::Paid, status, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Cash payment for order #{id} settled");
        Ok(updated)
    }

    async fn mark_paid_by_intent(&self, intent_id: &str) -> Result<IntentReconciliation, OrderLedgerError> {
        let mut tx = self.pool.begin().await?;
        let order = match orders::fetch_order_by_intent_id(intent_id, &mut tx).await? {
            None => return Ok(IntentReconciliation::NoMatchingOrder),
            Some(order) => order,
        };
        if order.payment_status == PaymentStatus::Paid {
            return Ok(IntentReconciliation::AlreadyPaid(order));
        }
        let status =
            if order.status == OrderStatus::Pending { OrderStatus::Confirmed } else { order.status };
        let updated = orders::update_payment_state(order.id, PaymentStatus::Paid, status, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Intent {intent_id} reconciled against order #{}", updated.id);
        Ok(IntentReconciliation::Updated(updated))
    }

    async fn close(&mut self) -> Result<(), OrderLedgerError> {
        self.pool.close().await;
        Ok(())
    }
}
