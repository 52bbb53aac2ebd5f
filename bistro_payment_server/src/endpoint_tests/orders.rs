use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use bistro_order_engine::{
    db_types::{OrderStatus, PaymentMethod, PaymentStatus},
    events::EventProducers,
    pricing::PricingConfig,
    traits::OrderLedgerError,
    OrderFlowApi,
    OrderQueryApi,
};
use bpg_common::Money;

use super::{
    helpers::{
        admin_token,
        catalog,
        created_from,
        customer_token,
        expired_token,
        guest_cash_order_body,
        order_fixture,
        send_request,
    },
    mocks::MockBackend,
};
use crate::{
    guest::GUEST_INFO_REQUIRED,
    routes::{
        CompleteCashPaymentRoute,
        CreateOrderRoute,
        MyOrdersRoute,
        OrderByIdRoute,
        OrdersSearchRoute,
        UpdateOrderStatusRoute,
    },
};

fn flow_api(backend: MockBackend) -> OrderFlowApi<MockBackend> {
    OrderFlowApi::new(backend, PricingConfig::default(), EventProducers::default())
}

//----------------------------------------------  Checkout  ----------------------------------------------------

fn configure_checkout(cfg: &mut ServiceConfig) {
    let mut backend = MockBackend::new();
    backend.expect_menu_items_by_id().returning(|_| Ok(catalog()));
    backend
        .expect_create_order()
        .withf(|order, quote| {
            // Catalog price wins: 2 × 10.00 + 8% tax + 3.99 delivery fee
            order.user_id.is_none()
                && order.payment_method == PaymentMethod::CashOnDelivery
                && order.status == OrderStatus::Pending
                && order.payment_status == PaymentStatus::Pending
                && quote.subtotal == Money::new(2000)
                && quote.final_total == Money::new(2559)
                && quote.lines[0].unit_price == Money::new(1000)
        })
        .returning(|order, quote| Ok(created_from(order, quote)));
    let api = flow_api(backend);
    cfg.service(CreateOrderRoute::<MockBackend>::new()).app_data(web::Data::new(api));
}

fn configure_checkout_untouched(cfg: &mut ServiceConfig) {
    // No expectations: the request must be rejected before the backend is consulted
    let api = flow_api(MockBackend::new());
    cfg.service(CreateOrderRoute::<MockBackend>::new()).app_data(web::Data::new(api));
}

#[actix_web::test]
async fn guest_cash_order_is_created_without_auth() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::post().uri("/orders").set_json(guest_cash_order_body());
    let (status, body) = send_request(req, configure_checkout).await;
    assert_eq!(status, StatusCode::CREATED, "unexpected response: {body}");
    assert!(body.contains(r#""final_total":2559"#), "{body}");
    assert!(body.contains(r#""payment_status":"pending""#), "{body}");
    assert!(body.contains(r#""customer_email":"ada@example.com""#), "{body}");
}

#[actix_web::test]
async fn expired_token_degrades_to_guest_on_the_cash_path() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::post()
        .uri("/orders")
        .insert_header(("Authorization", format!("Bearer {}", expired_token(42))))
        .set_json(guest_cash_order_body());
    let (status, body) = send_request(req, configure_checkout).await;
    // The order goes through as a guest order (user_id None is asserted by the mock)
    assert_eq!(status, StatusCode::CREATED, "unexpected response: {body}");
}

#[actix_web::test]
async fn guest_without_email_is_rejected() {
    let _ = env_logger::try_init().ok();
    let mut body = guest_cash_order_body();
    body["customer_info"]["email"] = serde_json::Value::Null;
    let req = TestRequest::post().uri("/orders").set_json(body);
    let (status, body) = send_request(req, configure_checkout_untouched).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains(GUEST_INFO_REQUIRED), "{body}");
}

#[actix_web::test]
async fn online_orders_are_redirected_to_the_payment_flow() {
    let _ = env_logger::try_init().ok();
    let mut body = guest_cash_order_body();
    body["payment_method"] = serde_json::json!("online");
    let req = TestRequest::post()
        .uri("/orders")
        .insert_header(("Authorization", format!("Bearer {}", customer_token(42))))
        .set_json(body);
    let (status, body) = send_request(req, configure_checkout_untouched).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("confirm-payment"), "{body}");
}

#[actix_web::test]
async fn delivery_orders_require_an_address() {
    let _ = env_logger::try_init().ok();
    let mut body = guest_cash_order_body();
    body.as_object_mut().unwrap().remove("delivery_address");
    let req = TestRequest::post().uri("/orders").set_json(body);
    let (status, body) = send_request(req, configure_checkout_untouched).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("delivery_address"), "{body}");
}

#[actix_web::test]
async fn unknown_cart_items_fail_the_request() {
    let _ = env_logger::try_init().ok();
    fn configure(cfg: &mut ServiceConfig) {
        let mut backend = MockBackend::new();
        // The catalog knows nothing about id 99
        backend.expect_menu_items_by_id().returning(|_| Ok(catalog()));
        let api = flow_api(backend);
        cfg.service(CreateOrderRoute::<MockBackend>::new()).app_data(web::Data::new(api));
    }
    let mut body = guest_cash_order_body();
    body["items"] = serde_json::json!([{"menu_item_id": 99, "quantity": 1}]);
    let req = TestRequest::post().uri("/orders").set_json(body);
    let (status, body) = send_request(req, configure).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("not found"), "{body}");
}

//----------------------------------------------   Orders   ----------------------------------------------------

fn configure_queries(cfg: &mut ServiceConfig) {
    let mut backend = MockBackend::new();
    backend.expect_orders_for_user().returning(|user_id| Ok(vec![order_fixture(10, Some(user_id))]));
    backend.expect_fetch_order_with_items().returning(|id| {
        Ok(Some(bistro_order_engine::db_types::OrderWithItems {
            order: order_fixture(id, Some(42)),
            items: vec![],
        }))
    });
    let api = OrderQueryApi::new(backend);
    cfg.service(MyOrdersRoute::<MockBackend>::new())
        .service(OrderByIdRoute::<MockBackend>::new())
        .app_data(web::Data::new(api));
}

#[actix_web::test]
async fn fetch_my_orders_requires_a_token() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::get().uri("/orders");
    let (status, _) = send_request(req, configure_queries).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn fetch_my_orders() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::get()
        .uri("/orders")
        .insert_header(("Authorization", format!("Bearer {}", customer_token(42))));
    let (status, body) = send_request(req, configure_queries).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#""user_id":42"#), "{body}");
}

#[actix_web::test]
async fn owners_and_admins_see_an_order_but_others_get_a_404() {
    let _ = env_logger::try_init().ok();
    let owner = TestRequest::get()
        .uri("/orders/10")
        .insert_header(("Authorization", format!("Bearer {}", customer_token(42))));
    let (status, _) = send_request(owner, configure_queries).await;
    assert_eq!(status, StatusCode::OK);

    let admin = TestRequest::get()
        .uri("/orders/10")
        .insert_header(("Authorization", format!("Bearer {}", admin_token())));
    let (status, _) = send_request(admin, configure_queries).await;
    assert_eq!(status, StatusCode::OK);

    let stranger = TestRequest::get()
        .uri("/orders/10")
        .insert_header(("Authorization", format!("Bearer {}", customer_token(7))));
    let (status, _) = send_request(stranger, configure_queries).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn admins_can_filter_orders_by_payment_status() {
    let _ = env_logger::try_init().ok();
    fn configure(cfg: &mut ServiceConfig) {
        let mut backend = MockBackend::new();
        backend
            .expect_search_orders()
            .withf(|query| query.payment_status == Some(PaymentStatus::Paid) && query.status.is_none())
            .returning(|_| Ok(vec![order_fixture(10, Some(42))]));
        let api = OrderQueryApi::new(backend);
        cfg.service(OrdersSearchRoute::<MockBackend>::new()).app_data(web::Data::new(api));
    }
    let req = TestRequest::get()
        .uri("/admin/orders?payment_status=paid")
        .insert_header(("Authorization", format!("Bearer {}", admin_token())));
    let (status, body) = send_request(req, configure).await;
    assert_eq!(status, StatusCode::OK, "unexpected response: {body}");
    assert!(body.contains(r#""id":10"#), "{body}");

    let req = TestRequest::get()
        .uri("/admin/orders")
        .insert_header(("Authorization", format!("Bearer {}", customer_token(42))));
    let (status, _) = send_request(req, configure).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

//----------------------------------------------  Lifecycle  ----------------------------------------------------

fn configure_status_updates(cfg: &mut ServiceConfig) {
    let mut backend = MockBackend::new();
    backend.expect_fetch_order().returning(|id| Ok(Some(order_fixture(id, None))));
    backend.expect_update_order_status().returning(|id, status| {
        let mut order = order_fixture(id, None);
        order.status = status;
        Ok(order)
    });
    let api = flow_api(backend);
    cfg.service(UpdateOrderStatusRoute::<MockBackend>::new()).app_data(web::Data::new(api));
}

fn configure_delivered_order(cfg: &mut ServiceConfig) {
    let mut backend = MockBackend::new();
    backend.expect_fetch_order().returning(|id| {
        let mut order = order_fixture(id, None);
        order.status = OrderStatus::Delivered;
        Ok(Some(order))
    });
    let api = flow_api(backend);
    cfg.service(UpdateOrderStatusRoute::<MockBackend>::new()).app_data(web::Data::new(api));
}

#[actix_web::test]
async fn admins_can_confirm_a_pending_order() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::patch()
        .uri("/orders/10/status")
        .insert_header(("Authorization", format!("Bearer {}", admin_token())))
        .set_json(serde_json::json!({"status": "confirmed"}));
    let (status, body) = send_request(req, configure_status_updates).await;
    assert_eq!(status, StatusCode::OK, "unexpected response: {body}");
    assert!(body.contains(r#""status":"confirmed""#), "{body}");
}

#[actix_web::test]
async fn status_updates_are_admin_only() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::patch()
        .uri("/orders/10/status")
        .insert_header(("Authorization", format!("Bearer {}", customer_token(42))))
        .set_json(serde_json::json!({"status": "confirmed"}));
    let (status, _) = send_request(req, configure_status_updates).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let req = TestRequest::patch()
        .uri("/orders/10/status")
        .set_json(serde_json::json!({"status": "confirmed"}));
    let (status, _) = send_request(req, configure_status_updates).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn values_outside_the_status_enum_are_rejected() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::patch()
        .uri("/orders/10/status")
        .insert_header(("Authorization", format!("Bearer {}", admin_token())))
        .set_json(serde_json::json!({"status": "launched"}));
    let (status, _) = send_request(req, configure_status_updates).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn transitions_out_of_terminal_states_are_rejected() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::patch()
        .uri("/orders/10/status")
        .insert_header(("Authorization", format!("Bearer {}", admin_token())))
        .set_json(serde_json::json!({"status": "pending"}));
    let (status, body) = send_request(req, configure_delivered_order).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("cannot change"), "{body}");
}

//----------------------------------------------  Cash payment  ------------------------------------------------

#[actix_web::test]
async fn completing_a_cash_payment_promotes_the_order() {
    let _ = env_logger::try_init().ok();
    fn configure(cfg: &mut ServiceConfig) {
        let mut backend = MockBackend::new();
        backend.expect_settle_cash_payment().returning(|id| {
            let mut order = order_fixture(id, None);
            order.payment_status = PaymentStatus::Paid;
            order.status = OrderStatus::Confirmed;
            Ok(order)
        });
        let api = flow_api(backend);
        cfg.service(CompleteCashPaymentRoute::<MockBackend>::new()).app_data(web::Data::new(api));
    }
    let req = TestRequest::patch()
        .uri("/orders/10/complete-cash-payment")
        .insert_header(("Authorization", format!("Bearer {}", admin_token())));
    let (status, body) = send_request(req, configure).await;
    assert_eq!(status, StatusCode::OK, "unexpected response: {body}");
    assert!(body.contains(r#""payment_status":"paid""#), "{body}");
}

#[actix_web::test]
async fn completing_a_cash_payment_twice_conflicts() {
    let _ = env_logger::try_init().ok();
    fn configure(cfg: &mut ServiceConfig) {
        let mut backend = MockBackend::new();
        backend
            .expect_settle_cash_payment()
            .returning(|id| Err(OrderLedgerError::PaymentAlreadyCompleted(id)));
        let api = flow_api(backend);
        cfg.service(CompleteCashPaymentRoute::<MockBackend>::new()).app_data(web::Data::new(api));
    }
    let req = TestRequest::patch()
        .uri("/orders/10/complete-cash-payment")
        .insert_header(("Authorization", format!("Bearer {}", admin_token())));
    let (status, body) = send_request(req, configure).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body.contains("Payment has already been completed"), "{body}");
}
