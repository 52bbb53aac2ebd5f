use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use bistro_order_engine::{
    db_types::{OrderStatus, PaymentMethod, PaymentStatus},
    events::EventProducers,
    pricing::PricingConfig,
    traits::IntentReconciliation,
    OrderFlowApi,
};
use bpg_common::{Money, Secret};
use chrono::Utc;
use stripe_tools::{
    webhook::{sign, SIGNATURE_HEADER},
    IntentStatus,
};

use super::{
    helpers::{catalog, created_from, customer_token, guest_customer_info, order_fixture, send_request},
    mocks::MockBackend,
};
use crate::{
    gateway::{GatewayError, IntentHandle, PaymentGateway, PaymentIntentView, TestGateway},
    middleware::SignatureMiddlewareFactory,
    payment_routes::{payment_webhook, ConfirmPaymentRoute, CreatePaymentIntentRoute},
};

const WEBHOOK_SECRET: &str = "whsec_endpoint_test_secret";

fn flow_api(backend: MockBackend) -> OrderFlowApi<MockBackend> {
    OrderFlowApi::new(backend, PricingConfig::default(), EventProducers::default())
}

/// A gateway whose intents never complete; for exercising the `PaymentNotCompleted` path.
#[derive(Clone, Copy)]
struct ProcessingGateway;

impl PaymentGateway for ProcessingGateway {
    async fn create_intent(
        &self,
        _amount: Money,
        _currency: &str,
        _method_types: &[String],
    ) -> Result<IntentHandle, GatewayError> {
        unimplemented!("not used in these tests")
    }

    async fn confirm(&self, intent_id: &str) -> Result<PaymentIntentView, GatewayError> {
        Ok(PaymentIntentView {
            id: intent_id.to_string(),
            amount: Money::new(2559),
            status: IntentStatus::Processing,
        })
    }
}

fn confirm_body(intent_id: &str) -> serde_json::Value {
    serde_json::json!({
        "payment_intent_id": intent_id,
        "items": [{"menu_item_id": 5, "quantity": 2}],
        "order_type": "delivery",
        "delivery_address": "12 Canal Street",
        "customer_info": guest_customer_info()
    })
}

//----------------------------------------------  Intents  ----------------------------------------------------

#[actix_web::test]
async fn creates_a_deterministic_intent_in_test_mode() {
    let _ = env_logger::try_init().ok();
    fn configure(cfg: &mut ServiceConfig) {
        cfg.service(web::scope("/payments").service(CreatePaymentIntentRoute::<TestGateway>::new()))
            .app_data(web::Data::new(TestGateway::new()));
    }
    let req = TestRequest::post()
        .uri("/payments/create-payment-intent")
        .set_json(serde_json::json!({"amount": 2559, "currency": "eur", "payment_method_types": ["card"]}));
    let (status, body) = send_request(req, configure).await;
    assert_eq!(status, StatusCode::OK, "unexpected response: {body}");
    assert!(body.contains(r#""payment_intent_id":"pi_test_eur_2559""#), "{body}");
    assert!(body.contains(r#""client_secret":"pi_test_eur_2559_secret""#), "{body}");
}

#[actix_web::test]
async fn rejects_non_positive_intent_amounts() {
    let _ = env_logger::try_init().ok();
    fn configure(cfg: &mut ServiceConfig) {
        cfg.service(web::scope("/payments").service(CreatePaymentIntentRoute::<TestGateway>::new()))
            .app_data(web::Data::new(TestGateway::new()));
    }
    let req = TestRequest::post()
        .uri("/payments/create-payment-intent")
        .set_json(serde_json::json!({"amount": 0, "currency": "eur"}));
    let (status, _) = send_request(req, configure).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

//----------------------------------------------  Confirm  ----------------------------------------------------

fn configure_confirm_happy(cfg: &mut ServiceConfig) {
    let mut backend = MockBackend::new();
    backend.expect_menu_items_by_id().returning(|_| Ok(catalog()));
    backend
        .expect_create_order()
        .withf(|order, quote| {
            order.user_id == Some(42)
                && order.payment_method == PaymentMethod::Online
                && order.status == OrderStatus::Confirmed
                && order.payment_status == PaymentStatus::Paid
                && order.payment_intent_id.as_deref() == Some("pi_test_eur_2559")
                && quote.final_total == Money::new(2559)
        })
        .returning(|order, quote| Ok(created_from(order, quote)));
    let api = flow_api(backend);
    cfg.service(
        web::scope("/payments").service(ConfirmPaymentRoute::<MockBackend, TestGateway>::new()),
    )
    .app_data(web::Data::new(api))
    .app_data(web::Data::new(TestGateway::new()));
}

fn configure_confirm_untouched(cfg: &mut ServiceConfig) {
    // No create_order expectation: nothing may reach the ledger
    let mut backend = MockBackend::new();
    backend.expect_menu_items_by_id().returning(|_| Ok(catalog()));
    let api = flow_api(backend);
    cfg.service(
        web::scope("/payments").service(ConfirmPaymentRoute::<MockBackend, TestGateway>::new()),
    )
    .app_data(web::Data::new(api))
    .app_data(web::Data::new(TestGateway::new()));
}

#[actix_web::test]
async fn confirm_payment_creates_a_paid_order() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::post()
        .uri("/payments/confirm-payment")
        .insert_header(("Authorization", format!("Bearer {}", customer_token(42))))
        .set_json(confirm_body("pi_test_eur_2559"));
    let (status, body) = send_request(req, configure_confirm_happy).await;
    assert_eq!(status, StatusCode::CREATED, "unexpected response: {body}");
    assert!(body.contains(r#""status":"confirmed""#), "{body}");
    assert!(body.contains(r#""payment_status":"paid""#), "{body}");
}

#[actix_web::test]
async fn confirm_payment_requires_authentication() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::post()
        .uri("/payments/confirm-payment")
        .set_json(confirm_body("pi_test_eur_2559"));
    let (status, _) = send_request(req, configure_confirm_untouched).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn confirm_payment_rejects_amount_mismatches() {
    let _ = env_logger::try_init().ok();
    // The intent holds 10.00 but the computed total is 25.59; no order may be created
    let req = TestRequest::post()
        .uri("/payments/confirm-payment")
        .insert_header(("Authorization", format!("Bearer {}", customer_token(42))))
        .set_json(confirm_body("pi_test_eur_1000"));
    let (status, body) = send_request(req, configure_confirm_untouched).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("Payment amount does not match order total"), "{body}");
}

#[actix_web::test]
async fn confirm_payment_rejects_incomplete_intents() {
    let _ = env_logger::try_init().ok();
    fn configure(cfg: &mut ServiceConfig) {
        let mut backend = MockBackend::new();
        backend.expect_menu_items_by_id().returning(|_| Ok(catalog()));
        let api = flow_api(backend);
        cfg.service(
            web::scope("/payments").service(ConfirmPaymentRoute::<MockBackend, ProcessingGateway>::new()),
        )
        .app_data(web::Data::new(api))
        .app_data(web::Data::new(ProcessingGateway));
    }
    let req = TestRequest::post()
        .uri("/payments/confirm-payment")
        .insert_header(("Authorization", format!("Bearer {}", customer_token(42))))
        .set_json(confirm_body("pi_anything"));
    let (status, body) = send_request(req, configure).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("Payment has not been completed"), "{body}");
}

//----------------------------------------------  Webhook  ----------------------------------------------------

fn webhook_event(intent_id: &str, event_type: &str) -> String {
    serde_json::json!({
        "id": "evt_1OaQbcDeFgHiJk",
        "type": event_type,
        "data": {"object": {"id": intent_id, "amount": 2559, "currency": "eur", "status": "succeeded"}}
    })
    .to_string()
}

fn signed_webhook_request(payload: &str) -> TestRequest {
    let timestamp = Utc::now().timestamp();
    let signature = sign(WEBHOOK_SECRET, timestamp, payload.as_bytes());
    TestRequest::post()
        .uri("/payments/webhook")
        .insert_header((SIGNATURE_HEADER, format!("t={timestamp},v1={signature}")))
        .insert_header(("Content-Type", "application/json"))
        .set_payload(payload.to_string())
}

fn configure_webhook_reconciles(cfg: &mut ServiceConfig) {
    let mut backend = MockBackend::new();
    backend
        .expect_mark_paid_by_intent()
        .withf(|intent_id| intent_id == "pi_3OaQ9x")
        .times(1)
        .returning(|_| {
            let mut order = order_fixture(10, Some(42));
            order.payment_status = PaymentStatus::Paid;
            order.status = OrderStatus::Confirmed;
            Ok(IntentReconciliation::Updated(order))
        });
    let api = flow_api(backend);
    configure_webhook_service(cfg, api);
}

fn configure_webhook_untouched(cfg: &mut ServiceConfig) {
    let api = flow_api(MockBackend::new());
    configure_webhook_service(cfg, api);
}

fn configure_webhook_service(cfg: &mut ServiceConfig, api: OrderFlowApi<MockBackend>) {
    let verifier = SignatureMiddlewareFactory::new(
        SIGNATURE_HEADER,
        Secret::new(WEBHOOK_SECRET.to_string()),
        300,
        true,
    );
    cfg.service(
        web::scope("/payments").service(
            web::resource("/webhook").wrap(verifier).route(web::post().to(payment_webhook::<MockBackend>)),
        ),
    )
    .app_data(web::Data::new(api));
}

#[actix_web::test]
async fn webhook_reconciles_a_succeeded_intent() {
    let _ = env_logger::try_init().ok();
    let payload = webhook_event("pi_3OaQ9x", "payment_intent.succeeded");
    let (status, body) = send_request(signed_webhook_request(&payload), configure_webhook_reconciles).await;
    assert_eq!(status, StatusCode::OK, "unexpected response: {body}");
    assert_eq!(body, r#"{"received":true}"#);
}

#[actix_web::test]
async fn webhook_rejects_a_bad_signature() {
    let _ = env_logger::try_init().ok();
    let payload = webhook_event("pi_3OaQ9x", "payment_intent.succeeded");
    let timestamp = Utc::now().timestamp();
    let forged = sign("whsec_not_the_secret", timestamp, payload.as_bytes());
    let req = TestRequest::post()
        .uri("/payments/webhook")
        .insert_header((SIGNATURE_HEADER, format!("t={timestamp},v1={forged}")))
        .insert_header(("Content-Type", "application/json"))
        .set_payload(payload);
    let (status, _) = send_request(req, configure_webhook_untouched).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn webhook_rejects_a_missing_signature() {
    let _ = env_logger::try_init().ok();
    let payload = webhook_event("pi_3OaQ9x", "payment_intent.succeeded");
    let req = TestRequest::post()
        .uri("/payments/webhook")
        .insert_header(("Content-Type", "application/json"))
        .set_payload(payload);
    let (status, _) = send_request(req, configure_webhook_untouched).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn webhook_observes_failures_without_touching_the_ledger() {
    let _ = env_logger::try_init().ok();
    let payload = webhook_event("pi_3OaQ9x", "payment_intent.payment_failed");
    let (status, body) = send_request(signed_webhook_request(&payload), configure_webhook_untouched).await;
    assert_eq!(status, StatusCode::OK, "unexpected response: {body}");
    assert_eq!(body, r#"{"received":true}"#);
}

#[actix_web::test]
async fn webhook_ignores_unrelated_event_types() {
    let _ = env_logger::try_init().ok();
    let payload = webhook_event("pi_3OaQ9x", "charge.refunded");
    let (status, body) = send_request(signed_webhook_request(&payload), configure_webhook_untouched).await;
    assert_eq!(status, StatusCode::OK, "unexpected response: {body}");
}
