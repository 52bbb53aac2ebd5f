use std::{fmt::Display, str::FromStr};

use bpg_common::Money;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Invalid value: {0}")]
pub struct ConversionError(String);

//--------------------------------------    OrderStatus      ---------------------------------------------------------
/// The fulfillment status of an order.
///
/// Transitions are restricted to an explicit allow-list; `delivered` and `cancelled` are terminal.
/// An order is never deleted, only marked `cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Preparing,
    Ready,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// The allowed-transition table for admin status updates:
    ///
    /// | From \ To | confirmed | preparing | ready | delivered | cancelled |
    /// |-----------|-----------|-----------|-------|-----------|-----------|
    /// | pending   | ✓         |           |       |           | ✓         |
    /// | confirmed |           | ✓         |       |           | ✓         |
    /// | preparing |           |           | ✓     |           | ✓         |
    /// | ready     |           |           |       | ✓         |           |
    ///
    /// Once an order is `ready` the kitchen has committed the goods, so it can only move forward
    /// to `delivered`. `delivered` and `cancelled` have no successors.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed | Cancelled)
                | (Confirmed, Preparing | Cancelled)
                | (Preparing, Ready | Cancelled)
                | (Ready, Delivered)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Ready => "ready",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

impl FromStr for OrderStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "preparing" => Ok(Self::Preparing),
            "ready" => Ok(Self::Ready),
            "delivered" => Ok(Self::Delivered),
            "cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

//--------------------------------------   PaymentStatus     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "pending"),
            PaymentStatus::Paid => write!(f, "paid"),
        }
    }
}

//--------------------------------------   PaymentMethod     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    CashOnDelivery,
    Online,
}

impl Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentMethod::CashOnDelivery => write!(f, "cash_on_delivery"),
            PaymentMethod::Online => write!(f, "online"),
        }
    }
}

//--------------------------------------     OrderType       ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    Delivery,
    Pickup,
}

impl Display for OrderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderType::Delivery => write!(f, "delivery"),
            OrderType::Pickup => write!(f, "pickup"),
        }
    }
}

//--------------------------------------        Role         ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Customer,
    Admin,
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Customer => write!(f, "customer"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

impl FromStr for Role {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(Self::Customer),
            "admin" => Ok(Self::Admin),
            s => Err(ConversionError(format!("Invalid role: {s}"))),
        }
    }
}

//--------------------------------------      MenuItem       ---------------------------------------------------------
/// The local projection of the catalog collaborator. Pricing always reads from here; a
/// client-submitted price is never trusted.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MenuItem {
    pub id: i64,
    pub name: String,
    pub price: Money,
    pub is_available: bool,
    pub is_active: bool,
}

//--------------------------------------      CartLine       ---------------------------------------------------------
/// One client-submitted cart line. Anything else the client sends on a line (notably a `price`
/// field) is dropped during deserialization.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CartLine {
    pub menu_item_id: i64,
    pub quantity: i64,
}

//--------------------------------------    CustomerInfo     ---------------------------------------------------------
/// Contact details captured at submission time. The snapshot is stored on the order so that later
/// profile edits never rewrite history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerInfo {
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
}

//--------------------------------------      NewOrder       ---------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewOrder {
    /// The authenticated owner, or `None` for a guest checkout.
    pub user_id: Option<i64>,
    pub customer: CustomerInfo,
    pub order_type: OrderType,
    pub delivery_address: Option<String>,
    pub pickup_time: Option<DateTime<Utc>>,
    pub payment_method: PaymentMethod,
    /// Correlates the order with the payment authority's intent. Only set on online orders.
    pub payment_intent_id: Option<String>,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
}

impl NewOrder {
    /// A cash-on-delivery order: created `pending`, paid later at the door.
    pub fn cash(user_id: Option<i64>, customer: CustomerInfo, order_type: OrderType) -> Self {
        Self {
            user_id,
            customer,
            order_type,
            delivery_address: None,
            pickup_time: None,
            payment_method: PaymentMethod::CashOnDelivery,
            payment_intent_id: None,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
        }
    }

    /// An online order whose payment intent has already been confirmed: created `confirmed`/`paid`.
    pub fn paid_online(
        user_id: Option<i64>,
        customer: CustomerInfo,
        order_type: OrderType,
        payment_intent_id: String,
    ) -> Self {
        Self {
            user_id,
            customer,
            order_type,
            delivery_address: None,
            pickup_time: None,
            payment_method: PaymentMethod::Online,
            payment_intent_id: Some(payment_intent_id),
            status: OrderStatus::Confirmed,
            payment_status: PaymentStatus::Paid,
        }
    }

    pub fn with_delivery_address(mut self, address: Option<String>) -> Self {
        self.delivery_address = address;
        self
    }

    pub fn with_pickup_time(mut self, pickup_time: Option<DateTime<Utc>>) -> Self {
        self.pickup_time = pickup_time;
        self
    }
}

//--------------------------------------        Order        ---------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Order {
    pub id: i64,
    pub user_id: Option<i64>,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: Option<String>,
    pub order_type: OrderType,
    pub delivery_address: Option<String>,
    pub pickup_time: Option<DateTime<Utc>>,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub payment_intent_id: Option<String>,
    pub status: OrderStatus,
    /// Pre-tax subtotal: the sum of the line totals.
    pub total_amount: Money,
    pub tax_amount: Money,
    pub delivery_fee: Money,
    pub final_total: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------      OrderItem      ---------------------------------------------------------
/// A line entry snapshotting the catalog name and price at order time. `unit_price` is never
/// re-derived after the order is committed.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub menu_item_id: i64,
    pub name: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub line_total: Money,
}

//--------------------------------------   OrderWithItems    ---------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}
