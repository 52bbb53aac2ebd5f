use actix_web::{
    body::MessageBody,
    http::StatusCode,
    test,
    test::TestRequest,
    web::ServiceConfig,
    App,
    ResponseError,
};
use bistro_order_engine::{
    db_types::{MenuItem, NewOrder, Order, OrderItem, OrderWithItems, Role},
    pricing::Quote,
};
use bpg_common::{Money, Secret};
use chrono::{TimeZone, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use log::debug;

use crate::{
    auth::{JwtClaims, TokenIssuer},
    config::AuthConfig,
};

// Creates a test `AuthConfig` for issuing tokens. DO NOT re-use this secret anywhere.
pub fn get_auth_config() -> AuthConfig {
    AuthConfig {
        jwt_secret: Secret::new("endpoint-test-signing-secret-keep-out-of-prod".to_string()),
        token_lifetime: chrono::Duration::hours(1),
    }
}

pub fn issue_token(claims: JwtClaims) -> String {
    let config = get_auth_config();
    let key = EncodingKey::from_secret(config.jwt_secret.reveal().as_bytes());
    encode(&Header::new(Algorithm::HS256), &claims, &key).expect("Failed to sign token")
}

pub fn customer_token(user_id: i64) -> String {
    TokenIssuer::new(&get_auth_config())
        .issue_token(user_id, "grace@example.com", Some("Grace Hopper"), Role::Customer)
        .expect("Failed to sign token")
}

pub fn admin_token() -> String {
    TokenIssuer::new(&get_auth_config())
        .issue_token(1, "admin@example.com", Some("Maria Rossi"), Role::Admin)
        .expect("Failed to sign token")
}

pub fn expired_token(user_id: i64) -> String {
    issue_token(JwtClaims {
        sub: user_id,
        email: "grace@example.com".to_string(),
        name: Some("Grace Hopper".to_string()),
        role: Role::Customer,
        exp: (Utc::now() - chrono::Duration::days(1)).timestamp(),
    })
}

/// Sends the request against an app configured by `configure` and flattens the outcome into
/// `(status, body)`, converting service-level errors through their canonical error responses.
pub async fn send_request(req: TestRequest, configure: fn(&mut ServiceConfig)) -> (StatusCode, String) {
    let app = App::new().app_data(actix_web::web::Data::new(get_auth_config())).configure(configure);
    let service = test::init_service(app).await;
    debug!("Making request");
    match test::try_call_service(&service, req.to_request()).await {
        Ok(res) => {
            let status = res.status();
            let body = res.into_body().try_into_bytes().expect("response body should be in memory");
            (status, String::from_utf8_lossy(&body).into_owned())
        },
        Err(e) => {
            let res = e.as_response_error().error_response();
            let status = res.status();
            let body = res.into_body().try_into_bytes().expect("error body should be in memory");
            (status, String::from_utf8_lossy(&body).into_owned())
        },
    }
}

//--------------------------------------      Fixtures       ---------------------------------------------------------

pub fn catalog() -> Vec<MenuItem> {
    vec![
        MenuItem { id: 5, name: "Margherita".into(), price: Money::new(1000), is_available: true, is_active: true },
        MenuItem { id: 6, name: "Tiramisu".into(), price: Money::new(450), is_available: true, is_active: true },
    ]
}

/// Materializes the order a backend would have committed for the given request, with fixed ids
/// and timestamps so response assertions are stable.
pub fn created_from(order: NewOrder, quote: &Quote) -> OrderWithItems {
    let ts = Utc.with_ymd_and_hms(2026, 8, 7, 12, 0, 0).unwrap();
    let items = quote
        .lines
        .iter()
        .enumerate()
        .map(|(i, line)| OrderItem {
            id: i as i64 + 1,
            order_id: 1,
            menu_item_id: line.menu_item_id,
            name: line.name.clone(),
            quantity: line.quantity,
            unit_price: line.unit_price,
            line_total: line.line_total,
        })
        .collect();
    let order = Order {
        id: 1,
        user_id: order.user_id,
        customer_name: order.customer.full_name,
        customer_email: order.customer.email,
        customer_phone: order.customer.phone,
        order_type: order.order_type,
        delivery_address: order.delivery_address,
        pickup_time: order.pickup_time,
        payment_method: order.payment_method,
        payment_status: order.payment_status,
        payment_intent_id: order.payment_intent_id,
        status: order.status,
        total_amount: quote.subtotal,
        tax_amount: quote.tax_amount,
        delivery_fee: quote.delivery_fee,
        final_total: quote.final_total,
        created_at: ts,
        updated_at: ts,
    };
    OrderWithItems { order, items }
}

pub fn order_fixture(id: i64, user_id: Option<i64>) -> Order {
    use bistro_order_engine::db_types::{OrderStatus, OrderType, PaymentMethod, PaymentStatus};
    let ts = Utc.with_ymd_and_hms(2026, 8, 7, 12, 0, 0).unwrap();
    Order {
        id,
        user_id,
        customer_name: "Ada Lovelace".to_string(),
        customer_email: "ada@example.com".to_string(),
        customer_phone: Some("+31612345678".to_string()),
        order_type: OrderType::Pickup,
        delivery_address: None,
        pickup_time: Some(ts),
        payment_method: PaymentMethod::CashOnDelivery,
        payment_status: PaymentStatus::Pending,
        payment_intent_id: None,
        status: OrderStatus::Pending,
        total_amount: Money::new(2000),
        tax_amount: Money::new(160),
        delivery_fee: Money::default(),
        final_total: Money::new(2160),
        created_at: ts,
        updated_at: ts,
    }
}

pub fn guest_customer_info() -> serde_json::Value {
    serde_json::json!({
        "full_name": "Ada Lovelace",
        "email": "ada@example.com",
        "phone": "+31612345678"
    })
}

pub fn guest_cash_order_body() -> serde_json::Value {
    serde_json::json!({
        // The client-supplied price must never affect the total; the catalog says 10.00
        "items": [{"menu_item_id": 5, "quantity": 2, "price": 0.01}],
        "order_type": "delivery",
        "delivery_address": "12 Canal Street",
        "payment_method": "cash_on_delivery",
        "customer_info": guest_customer_info()
    })
}
