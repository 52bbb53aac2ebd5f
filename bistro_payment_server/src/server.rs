use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use bistro_order_engine::{events::EventProducers, OrderFlowApi, OrderQueryApi, SqliteDatabase};
use log::warn;
use stripe_tools::{webhook::SIGNATURE_HEADER, StripeApi};

use crate::{
    config::ServerConfig,
    errors::ServerError,
    gateway::{PaymentGateway, StripeGateway, TestGateway},
    middleware::SignatureMiddlewareFactory,
    notifier::start_notifier,
    payment_routes::{payment_webhook, ConfirmPaymentRoute, CreatePaymentIntentRoute},
    routes::{
        health,
        CompleteCashPaymentRoute,
        CreateOrderRoute,
        MyOrdersRoute,
        OrderByIdRoute,
        OrdersSearchRoute,
        UpdateOrderStatusRoute,
    },
};

const DB_POOL_SIZE: u32 = 25;

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, DB_POOL_SIZE)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let producers = start_notifier();
    // The gateway is chosen exactly once, here. Handlers only ever see the trait.
    if config.payment_test_mode {
        warn!(
            "🚨️ Payment test mode is enabled. The deterministic test gateway serves the payment routes; no real \
             charges will be made."
        );
        let srv = create_server_instance(config, db, TestGateway::new(), producers)?;
        srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
    } else {
        let api = StripeApi::new(config.stripe.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
        let srv = create_server_instance(config, db, StripeGateway::new(api), producers)?;
        srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
    }
}

pub fn create_server_instance<G>(
    config: ServerConfig,
    db: SqliteDatabase,
    gateway: G,
    producers: EventProducers,
) -> Result<Server, ServerError>
where
    G: PaymentGateway + Send + Sync + 'static,
{
    let host = config.host.clone();
    let port = config.port;
    let srv = HttpServer::new(move || {
        let orders_api = OrderFlowApi::new(db.clone(), config.pricing.clone(), producers.clone());
        let query_api = OrderQueryApi::new(db.clone());
        let webhook_signature = SignatureMiddlewareFactory::new(
            SIGNATURE_HEADER,
            config.stripe.webhook_secret.clone(),
            config.webhook_tolerance_secs,
            config.webhook_signature_checks,
        );
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("bps::access_log"))
            .app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(query_api))
            .app_data(web::Data::new(gateway.clone()))
            .app_data(web::Data::new(config.auth.clone()))
            .service(health)
            .service(CreateOrderRoute::<SqliteDatabase>::new())
            .service(MyOrdersRoute::<SqliteDatabase>::new())
            .service(OrderByIdRoute::<SqliteDatabase>::new())
            .service(OrdersSearchRoute::<SqliteDatabase>::new())
            .service(UpdateOrderStatusRoute::<SqliteDatabase>::new())
            .service(CompleteCashPaymentRoute::<SqliteDatabase>::new())
            .service(
                web::scope("/payments")
                    .service(CreatePaymentIntentRoute::<G>::new())
                    .service(ConfirmPaymentRoute::<SqliteDatabase, G>::new())
                    .service(
                        web::resource("/webhook")
                            .wrap(webhook_signature)
                            .route(web::post().to(payment_webhook::<SqliteDatabase>)),
                    ),
            )
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((host.as_str(), port))?
    .run();
    Ok(srv)
}
