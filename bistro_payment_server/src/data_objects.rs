use std::fmt::Display;

use bistro_order_engine::db_types::{CartLine, OrderStatus, OrderType, PaymentMethod};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::ServerError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

/// The customer contact block as submitted by the client. Field-level validation happens in the
/// guest resolver, which knows whether the caller is a guest.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomerInfoParams {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrderRequest {
    pub items: Vec<CartLine>,
    pub order_type: OrderType,
    #[serde(default)]
    pub delivery_address: Option<String>,
    #[serde(default)]
    pub pickup_time: Option<DateTime<Utc>>,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub customer_info: Option<CustomerInfoParams>,
}

impl CreateOrderRequest {
    pub fn validate(&self) -> Result<(), ServerError> {
        validate_cart_and_fulfillment(&self.items, self.order_type, &self.delivery_address, &self.pickup_time)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConfirmPaymentRequest {
    pub payment_intent_id: String,
    pub items: Vec<CartLine>,
    pub order_type: OrderType,
    #[serde(default)]
    pub delivery_address: Option<String>,
    #[serde(default)]
    pub pickup_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub customer_info: Option<CustomerInfoParams>,
}

impl ConfirmPaymentRequest {
    pub fn validate(&self) -> Result<(), ServerError> {
        if self.payment_intent_id.trim().is_empty() {
            return Err(ServerError::ValidationError("payment_intent_id is required".to_string()));
        }
        validate_cart_and_fulfillment(&self.items, self.order_type, &self.delivery_address, &self.pickup_time)
    }
}

fn validate_cart_and_fulfillment(
    items: &[CartLine],
    order_type: OrderType,
    delivery_address: &Option<String>,
    pickup_time: &Option<DateTime<Utc>>,
) -> Result<(), ServerError> {
    if items.is_empty() {
        return Err(ServerError::ValidationError("An order must contain at least one item".to_string()));
    }
    if items.iter().any(|l| l.quantity <= 0) {
        return Err(ServerError::ValidationError("Item quantities must be greater than zero".to_string()));
    }
    match order_type {
        OrderType::Delivery => {
            if delivery_address.as_deref().map(str::trim).filter(|s| !s.is_empty()).is_none() {
                return Err(ServerError::ValidationError(
                    "delivery_address is required for delivery orders".to_string(),
                ));
            }
        },
        OrderType::Pickup => {
            if pickup_time.is_none() {
                return Err(ServerError::ValidationError(
                    "pickup_time is required for pickup orders".to_string(),
                ));
            }
        },
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateIntentRequest {
    /// Minor currency units, matching the payment authority's convention.
    pub amount: i64,
    pub currency: String,
    #[serde(default)]
    pub payment_method_types: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateIntentResponse {
    pub client_secret: String,
    pub payment_intent_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookAck {
    pub received: bool,
}
