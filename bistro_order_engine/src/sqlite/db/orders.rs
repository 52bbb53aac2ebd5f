use log::{debug, trace};
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    db_types::{NewOrder, Order, OrderItem, OrderStatus, PaymentStatus},
    order_objects::OrderQueryFilter,
    pricing::{Quote, QuoteLine},
    traits::OrderLedgerError,
};

/// Inserts a new order row using the given connection. This is not atomic on its own. Callers
/// that also insert line items must wrap both in a transaction and pass `&mut *tx` as the
/// connection argument.
pub async fn insert_order(
    order: NewOrder,
    quote: &Quote,
    conn: &mut SqliteConnection,
) -> Result<Order, OrderLedgerError> {
    let order: Order = sqlx::query_as(
        r#"
            INSERT INTO orders (
                user_id,
                customer_name,
                customer_email,
                customer_phone,
                order_type,
                delivery_address,
                pickup_time,
                payment_method,
                payment_status,
                payment_intent_id,
                status,
                total_amount,
                tax_amount,
                delivery_fee,
                final_total
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING *;
        "#,
    )
    .bind(order.user_id)
    .bind(order.customer.full_name)
    .bind(order.customer.email)
    .bind(order.customer.phone)
    .bind(order.order_type.to_string())
    .bind(order.delivery_address)
    .bind(order.pickup_time)
    .bind(order.payment_method.to_string())
    .bind(order.payment_status.to_string())
    .bind(order.payment_intent_id)
    .bind(order.status.to_string())
    .bind(quote.subtotal.value())
    .bind(quote.tax_amount.value())
    .bind(quote.delivery_fee.value())
    .bind(quote.final_total.value())
    .fetch_one(conn)
    .await?;
    debug!("📝️ Order inserted with id {}", order.id);
    Ok(order)
}

pub async fn insert_order_item(
    order_id: i64,
    line: &QuoteLine,
    conn: &mut SqliteConnection,
) -> Result<OrderItem, OrderLedgerError> {
    let item = sqlx::query_as(
        r#"
            INSERT INTO order_items (order_id, menu_item_id, name, quantity, unit_price, line_total)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *;
        "#,
    )
    .bind(order_id)
    .bind(line.menu_item_id)
    .bind(line.name.as_str())
    .bind(line.quantity)
    .bind(line.unit_price.value())
    .bind(line.line_total.value())
    .fetch_one(conn)
    .await?;
    Ok(item)
}

pub async fn fetch_order(id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(order)
}

pub async fn fetch_order_items(order_id: i64, conn: &mut SqliteConnection) -> Result<Vec<OrderItem>, sqlx::Error> {
    let items = sqlx::query_as("SELECT * FROM order_items WHERE order_id = $1 ORDER BY id")
        .bind(order_id)
        .fetch_all(conn)
        .await?;
    Ok(items)
}

pub async fn fetch_order_by_intent_id(
    intent_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE payment_intent_id = $1")
        .bind(intent_id)
        .fetch_optional(conn)
        .await?;
    Ok(order)
}

pub async fn fetch_orders_for_user(user_id: i64, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let orders = sqlx::query_as("SELECT * FROM orders WHERE user_id = $1 ORDER BY created_at DESC, id DESC")
        .bind(user_id)
        .fetch_all(conn)
        .await?;
    Ok(orders)
}

/// Fetches orders according to criteria specified in the `OrderQueryFilter`.
///
/// Resulting orders are ordered by `created_at` in ascending order.
pub async fn search_orders(query: OrderQueryFilter, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let mut builder = QueryBuilder::new("SELECT * FROM orders ");
    if !query.is_empty() {
        builder.push("WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(status) = query.status {
        where_clause.push("status = ");
        where_clause.push_bind_unseparated(status.to_string());
    }
    if let Some(payment_status) = query.payment_status {
        where_clause.push("payment_status = ");
        where_clause.push_bind_unseparated(payment_status.to_string());
    }
    if let Some(payment_method) = query.payment_method {
        where_clause.push("payment_method = ");
        where_clause.push_bind_unseparated(payment_method.to_string());
    }
    if let Some(email) = query.customer_email {
        where_clause.push("customer_email LIKE ");
        where_clause.push_bind_unseparated(format!("%{email}%"));
    }
    if let Some(since) = query.since {
        where_clause.push("created_at >= ");
        where_clause.push_bind_unseparated(since);
    }
    if let Some(until) = query.until {
        where_clause.push("created_at <= ");
        where_clause.push_bind_unseparated(until);
    }
    builder.push(" ORDER BY created_at ASC, id ASC");

    trace!("📝️ Executing query: {}", builder.sql());
    let orders = builder.build_query_as::<Order>().fetch_all(conn).await?;
    trace!("📝️ Result of search_orders: {} rows", orders.len());
    Ok(orders)
}

pub(crate) async fn update_order_status(
    id: i64,
    status: OrderStatus,
    conn: &mut SqliteConnection,
) -> Result<Order, OrderLedgerError> {
    let result: Option<Order> =
        sqlx::query_as("UPDATE orders SET status = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING *")
            .bind(status.to_string())
            .bind(id)
            .fetch_optional(conn)
            .await?;
    result.ok_or(OrderLedgerError::OrderNotFound(id))
}

pub(crate) async fn update_payment_state(
    id: i64,
    payment_status: PaymentStatus,
    status: OrderStatus,
    conn: &mut SqliteConnection,
) -> Result<Order, OrderLedgerError> {
    let result: Option<Order> = sqlx::query_as(
        "UPDATE orders SET payment_status = $1, status = $2, updated_at = CURRENT_TIMESTAMP WHERE id = $3 RETURNING *",
    )
    .bind(payment_status.to_string())
    .bind(status.to_string())
    .bind(id)
    .fetch_optional(conn)
    .await?;
    result.ok_or(OrderLedgerError::OrderNotFound(id))
}
