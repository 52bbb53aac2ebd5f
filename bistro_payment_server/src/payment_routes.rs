//----------------------------------------------   Payments  ----------------------------------------------------

use actix_web::{web, HttpResponse};
use bistro_order_engine::{
    db_types::NewOrder,
    traits::OrderLedgerDatabase,
    OrderFlowApi,
};
use bpg_common::Money;
use log::*;
use stripe_tools::{webhook::StripeEvent, IntentStatus};

use crate::{
    auth::OptionalClaims,
    data_objects::{ConfirmPaymentRequest, CreateIntentRequest, CreateIntentResponse, JsonResponse, WebhookAck},
    errors::ServerError,
    gateway::PaymentGateway,
    guest::resolve_checkout_principal,
    route,
};

route!(create_payment_intent => Post "/create-payment-intent" impl PaymentGateway);
/// Reserves an amount with the payment authority and returns the client secret the storefront
/// needs to collect the payment. Method types incompatible with the currency are filtered by the
/// gateway before the call. The amount submitted here buys nothing on its own: order creation
/// re-prices the cart and rejects any intent whose amount differs from the computed total.
pub async fn create_payment_intent<G: PaymentGateway>(
    body: web::Json<CreateIntentRequest>,
    gateway: web::Data<G>,
) -> Result<HttpResponse, ServerError> {
    let CreateIntentRequest { amount, currency, payment_method_types } = body.into_inner();
    if amount <= 0 {
        return Err(ServerError::ValidationError(
            "amount must be a positive number of minor currency units".to_string(),
        ));
    }
    if currency.trim().is_empty() {
        return Err(ServerError::ValidationError("currency is required".to_string()));
    }
    debug!("💻️ Creating payment intent for {amount} {currency}");
    let handle = gateway.create_intent(Money::new(amount), &currency, &payment_method_types).await?;
    Ok(HttpResponse::Ok().json(CreateIntentResponse {
        client_secret: handle.client_secret,
        payment_intent_id: handle.payment_intent_id,
    }))
}

route!(confirm_payment => Post "/confirm-payment" impl OrderLedgerDatabase, PaymentGateway);
/// The online checkout: recomputes the cart total, confirms the payment intent with the
/// authority, and only then commits the order (`confirmed` and `paid`) in one transaction.
///
/// Two checks gate the ledger write:
/// * the intent status must be `succeeded`, else a 400 (`Payment has not been completed`);
/// * the intent amount must equal the computed total exactly, else a 400 (`Payment amount does
///   not match order total`). A paid-for amount can never diverge from the ledger's total.
///
/// Guests cannot pay online; a missing or invalid token is a 401.
pub async fn confirm_payment<BLedger, GPay>(
    claims: OptionalClaims,
    body: web::Json<ConfirmPaymentRequest>,
    api: web::Data<OrderFlowApi<BLedger>>,
    gateway: web::Data<GPay>,
) -> Result<HttpResponse, ServerError>
where
    BLedger: OrderLedgerDatabase,
    GPay: PaymentGateway,
{
    trace!("💻️ Received confirm-payment request");
    let request = body.into_inner();
    request.validate()?;
    let principal = resolve_checkout_principal(
        bistro_order_engine::db_types::PaymentMethod::Online,
        claims.0,
        request.customer_info.clone(),
    )?;
    let quote = api.quote_cart(&request.items, request.order_type).await?;
    let intent = gateway.confirm(&request.payment_intent_id).await?;
    if intent.status != IntentStatus::Succeeded {
        debug!("💻️ Intent {} is {}, not succeeded. Rejecting.", intent.id, intent.status);
        return Err(ServerError::PaymentNotCompleted(intent.status.to_string()));
    }
    if intent.amount != quote.final_total {
        warn!(
            "💻️ Amount mismatch on intent {}: authority holds {}, computed total is {}. Rejecting before any \
             ledger write.",
            intent.id, intent.amount, quote.final_total
        );
        return Err(ServerError::AmountMismatch);
    }
    let order = NewOrder::paid_online(
        principal.user_id,
        principal.customer,
        request.order_type,
        request.payment_intent_id.clone(),
    )
    .with_delivery_address(request.delivery_address.clone())
    .with_pickup_time(request.pickup_time);
    let created = api.place_order(order, &quote).await?;
    info!("💻️ Order #{} created (online, intent {})", created.order.id, request.payment_intent_id);
    Ok(HttpResponse::Created().json(created))
}

//----------------------------------------------   Webhook  ----------------------------------------------------
/// Handles payment authority notifications. The signature middleware has already authenticated
/// the payload; a request that reaches this handler is genuine.
///
/// `payment_intent.succeeded` is reconciled into the ledger, idempotently and keyed on the intent
/// id. The delivery path has no ordering guarantee relative to the client-driven confirm
/// request, so repeats and races are expected. Everything else is observed and logged.
pub async fn payment_webhook<B: OrderLedgerDatabase>(
    body: web::Bytes,
    api: web::Data<OrderFlowApi<B>>,
) -> HttpResponse {
    let event: StripeEvent = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(e) => {
            warn!("🔔️ Could not parse webhook event. {e}");
            return HttpResponse::BadRequest().json(JsonResponse::failure("Could not parse event."));
        },
    };
    trace!("🔔️ Received webhook event {} ({})", event.id, event.event_type);
    match event.event_type.as_str() {
        "payment_intent.succeeded" => {
            let intent_id = event.data.object.id;
            if let Err(e) = api.reconcile_paid_intent(&intent_id).await {
                // A non-2xx response makes the authority redeliver the event later
                error!("🔔️ Could not reconcile intent {intent_id}. {e}");
                return HttpResponse::InternalServerError()
                    .json(JsonResponse::failure("Could not reconcile payment."));
            }
        },
        "payment_intent.payment_failed" => {
            warn!("🔔️ Payment intent {} failed", event.data.object.id);
        },
        other => {
            debug!("🔔️ Ignoring webhook event type {other}");
        },
    }
    HttpResponse::Ok().json(WebhookAck { received: true })
}
