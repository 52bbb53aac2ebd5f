use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{CartLine, NewOrder, Order, OrderStatus, OrderType, OrderWithItems},
    events::{EventProducers, OrderConfirmationEvent, OrderPaidEvent},
    pricing::{self, PricingConfig, Quote},
    traits::{IntentReconciliation, OrderLedgerDatabase, OrderLedgerError},
};

/// `OrderFlowApi` is the primary API for the checkout and payment flows: pricing carts,
/// committing orders, admin lifecycle transitions, and reconciling payment notifications.
pub struct OrderFlowApi<B> {
    db: B,
    pricing: PricingConfig,
    producers: EventProducers,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B, pricing: PricingConfig, producers: EventProducers) -> Self {
        Self { db, pricing, producers }
    }

    pub fn pricing(&self) -> &PricingConfig {
        &self.pricing
    }
}

impl<B> OrderFlowApi<B>
where B: OrderLedgerDatabase
{
    /// Prices a cart from current catalog data. Client-submitted prices never reach this point;
    /// the input is nothing but `(menu_item_id, quantity)` pairs.
    pub async fn quote_cart(&self, lines: &[CartLine], order_type: OrderType) -> Result<Quote, OrderLedgerError> {
        if lines.is_empty() {
            return Err(OrderLedgerError::EmptyOrder);
        }
        let ids: Vec<i64> = lines.iter().map(|l| l.menu_item_id).collect();
        let catalog = self.db.menu_items_by_id(&ids).await?;
        pricing::price_cart(&self.pricing, lines, order_type, &catalog)
    }

    /// Commits the order through the ledger and notifies subscribers. The hook runs after the
    /// commit; its failure is invisible to the caller.
    pub async fn place_order(&self, order: NewOrder, quote: &Quote) -> Result<OrderWithItems, OrderLedgerError> {
        let created = self.db.create_order(order, quote).await?;
        debug!("🛒️ Order #{} committed with {} items, total {}", created.order.id, created.items.len(), created.order.final_total);
        self.call_order_confirmation_hook(&created).await;
        Ok(created)
    }

    /// Changes the fulfillment status of an order.
    ///
    /// Transitions are restricted to the allow-list on [`OrderStatus`]; a same-status update is a
    /// no-op error, and anything outside the table is rejected without touching the database.
    pub async fn modify_status_for_order(
        &self,
        id: i64,
        new_status: OrderStatus,
    ) -> Result<Order, OrderLedgerError> {
        let order = self.db.fetch_order(id).await?.ok_or(OrderLedgerError::OrderNotFound(id))?;
        if order.status == new_status {
            return Err(OrderLedgerError::OrderModificationNoOp);
        }
        if !order.status.can_transition_to(new_status) {
            debug!("🛒️ Rejecting status change {} -> {new_status} for order #{id}", order.status);
            return Err(OrderLedgerError::InvalidStatusTransition { from: order.status, to: new_status });
        }
        let updated = self.db.update_order_status(id, new_status).await?;
        info!("🛒️ Order #{id} status changed {} -> {new_status}", order.status);
        Ok(updated)
    }

    /// Marks a cash-on-delivery order as paid. Fails with a conflict if the order is already paid
    /// or is not a cash order.
    pub async fn complete_cash_payment(&self, id: i64) -> Result<Order, OrderLedgerError> {
        let order = self.db.settle_cash_payment(id).await?;
        info!("🛒️ Cash payment completed for order #{id}");
        self.call_order_paid_hook(&order).await;
        Ok(order)
    }

    /// Reconciles a successful payment intent into the ledger.
    ///
    /// Idempotent, keyed on the intent id: the gateway's webhook and the client-driven confirm
    /// request can both observe "succeeded" concurrently, in either order.
    pub async fn reconcile_paid_intent(&self, intent_id: &str) -> Result<IntentReconciliation, OrderLedgerError> {
        let outcome = self.db.mark_paid_by_intent(intent_id).await?;
        match &outcome {
            IntentReconciliation::Updated(order) => {
                info!("🛒️ Payment intent {intent_id} reconciled; order #{} is now paid", order.id);
                self.call_order_paid_hook(order).await;
            },
            IntentReconciliation::AlreadyPaid(order) => {
                debug!("🛒️ Payment intent {intent_id} was already reconciled against order #{}", order.id);
            },
            IntentReconciliation::NoMatchingOrder => {
                warn!("🛒️ Payment intent {intent_id} succeeded but no order references it yet");
            },
        }
        Ok(outcome)
    }

    async fn call_order_confirmation_hook(&self, order: &OrderWithItems) {
        for emitter in &self.producers.order_confirmation_producer {
            trace!("🛒️ Notifying order confirmation subscribers");
            let event = OrderConfirmationEvent { order: order.clone() };
            emitter.publish_event(event).await;
        }
    }

    async fn call_order_paid_hook(&self, order: &Order) {
        for emitter in &self.producers.order_paid_producer {
            trace!("🛒️ Notifying order paid subscribers");
            let event = OrderPaidEvent { order: order.clone() };
            emitter.publish_event(event).await;
        }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn db_mut(&mut self) -> &mut B {
        &mut self.db
    }
}
