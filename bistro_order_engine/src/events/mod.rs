//! Checkout events.
//!
//! A simple hook system that lets collaborators react to order events without being able to fail
//! them. The confirmation-email notifier is the primary subscriber: its delivery is best-effort
//! and must never block or roll back the transaction that produced the event.

mod channel;
mod event_types;

pub use channel::{EventHandler, EventProducer, Handler};
pub use event_types::{OrderConfirmationEvent, OrderPaidEvent};

/// The producers the API layer publishes to. Empty vectors are valid (events are dropped), which
/// is what tests use.
#[derive(Clone, Default)]
pub struct EventProducers {
    pub order_confirmation_producer: Vec<EventProducer<OrderConfirmationEvent>>,
    pub order_paid_producer: Vec<EventProducer<OrderPaidEvent>>,
}
