//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current
//! thread will stop that worker from processing new requests. Any long, non-cpu-bound operation
//! (I/O, database queries, gateway calls) must be expressed as futures or asynchronous functions,
//! which get executed concurrently by the worker threads.

use actix_web::{get, web, HttpResponse, Responder};
use bistro_order_engine::{
    db_types::{NewOrder, PaymentMethod, Role},
    order_objects::OrderQueryFilter,
    traits::{OrderLedgerDatabase, OrderManagement},
    OrderFlowApi,
    OrderQueryApi,
};
use log::*;

use crate::{
    auth::{JwtClaims, OptionalClaims},
    data_objects::{CreateOrderRequest, UpdateStatusRequest},
    errors::ServerError,
    guest::resolve_checkout_principal,
};

// Actix cannot handle generics in handlers, so registration is implemented manually using the
// `route!` macro.
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal requires [$($roles:expr),*]) => {
        paste::paste! { pub struct [<$name:camel Route>];}
        paste::paste! {
                impl [<$name:camel Route>] {
                #[allow(clippy::new_without_default)]
                pub fn new() -> Self { Self }
            }
        }
        paste::paste! {
            impl actix_web::dev::HttpServiceFactory for [<$name:camel Route>] {
                fn register(self, config: &mut actix_web::dev::AppService) {
                    let res = actix_web::Resource::new($path)
                        .name(stringify!($name))
                        .guard(actix_web::guard::$method())
                        .to($name)
                        .wrap($crate::middleware::AclMiddlewareFactory::new(&[$($roles),+]));
                    actix_web::dev::HttpServiceFactory::register(res, config);
                }
            }
        }
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+ where requires [$($roles:expr),*])  => {
        paste::paste! { pub struct [<$name:camel Route>]<A>(core::marker::PhantomData<fn() -> A>);}
        paste::paste! { impl<A> [<$name:camel Route>]<A> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> A>)
            }
        }}
        paste::paste! { impl<A> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<A>
        where
            A: $($bounds)++ 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<A>)
                    .wrap($crate::middleware::AclMiddlewareFactory::new(&[$($roles),+]));
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Checkout  ----------------------------------------------------
route!(create_order => Post "/orders" impl OrderLedgerDatabase);
/// Route handler for the cash-on-delivery checkout.
///
/// This route is guest-eligible: a request without a valid token proceeds as a guest, in which
/// case the full customer contact block is mandatory. Online payments are not accepted here;
/// they go through `/payments/confirm-payment`, which creates the order only after the payment
/// authority has confirmed the amount.
///
/// Totals are recomputed from the catalog; any price field the client sends is ignored.
pub async fn create_order<B: OrderLedgerDatabase>(
    claims: OptionalClaims,
    body: web::Json<CreateOrderRequest>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ Received new order request");
    let request = body.into_inner();
    request.validate()?;
    if request.payment_method == PaymentMethod::Online {
        return Err(ServerError::ValidationError(
            "Online payments must be confirmed via /payments/confirm-payment".to_string(),
        ));
    }
    let principal = resolve_checkout_principal(request.payment_method, claims.0, request.customer_info.clone())?;
    let quote = api.quote_cart(&request.items, request.order_type).await?;
    let order = NewOrder::cash(principal.user_id, principal.customer, request.order_type)
        .with_delivery_address(request.delivery_address.clone())
        .with_pickup_time(request.pickup_time);
    let created = api.place_order(order, &quote).await?;
    info!("💻️ Order #{} created (cash on delivery, total {})", created.order.id, created.order.final_total);
    Ok(HttpResponse::Created().json(created))
}

//----------------------------------------------   Orders  ----------------------------------------------------
route!(my_orders => Get "/orders" impl OrderManagement);
/// Route handler for the orders endpoint
///
/// Authenticated users can fetch their own orders using this endpoint. The user id is extracted
/// from the bearer token in the `Authorization` header.
///
/// Admin users can use the `/admin/orders` endpoint to search across all orders.
pub async fn my_orders<B: OrderManagement>(
    claims: JwtClaims,
    api: web::Data<OrderQueryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET my_orders for user {}", claims.sub);
    let orders = api.orders_for_user(claims.sub).await.map_err(|e| {
        debug!("💻️ Could not fetch orders. {e}");
        ServerError::BackendError(e.to_string())
    })?;
    Ok(HttpResponse::Ok().json(orders))
}

route!(order_by_id => Get "/orders/{id}" impl OrderManagement);
/// Use `/orders/{id}` to fetch a specific order, including its line items.
///
/// Authenticated users can fetch their own orders; any other order id yields a 404, whether it
/// exists or not. Admin users can retrieve any order.
pub async fn order_by_id<B: OrderManagement>(
    claims: JwtClaims,
    path: web::Path<i64>,
    api: web::Data<OrderQueryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    debug!("💻️ GET order_by_id({id})");
    let order = api.fetch_order_with_items(id).await.map_err(|e| {
        debug!("💻️ Could not fetch order. {e}");
        ServerError::BackendError(e.to_string())
    })?;
    let is_admin = claims.role == Role::Admin;
    match order {
        Some(order) if is_admin || order.order.user_id == Some(claims.sub) => {
            Ok(HttpResponse::Ok().json(order))
        },
        _ => Err(ServerError::NoRecordFound(format!("Order {id}"))),
    }
}

route!(orders_search => Get "/admin/orders" impl OrderManagement where requires [Role::Admin]);
pub async fn orders_search<B: OrderManagement>(
    query: web::Query<OrderQueryFilter>,
    api: web::Data<OrderQueryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET orders search for [{}]", query.0);
    let query = query.into_inner();
    let orders = api.search_orders(query).await.map_err(|e| {
        debug!("💻️ Could not fetch orders. {e}");
        ServerError::BackendError(e.to_string())
    })?;
    Ok(HttpResponse::Ok().json(orders))
}

//----------------------------------------------   Lifecycle  ----------------------------------------------------
route!(update_order_status => Patch "/orders/{id}/status" impl OrderLedgerDatabase where requires [Role::Admin]);
/// Admin-driven fulfillment status changes.
///
/// Transitions are restricted to the allow-list on the status enum:
/// pending → confirmed|cancelled, confirmed → preparing|cancelled, preparing → ready|cancelled,
/// ready → delivered. Anything else, including moves out of the terminal states, is rejected
/// with a 400 and the order is left untouched.
pub async fn update_order_status<B: OrderLedgerDatabase>(
    path: web::Path<i64>,
    body: web::Json<UpdateStatusRequest>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    let UpdateStatusRequest { status } = body.into_inner();
    info!("💻️ Status change request for order {id}: -> {status}");
    let order = api.modify_status_for_order(id, status).await.map_err(|e| {
        debug!("💻️ Could not update order status. {e}");
        ServerError::from(e)
    })?;
    Ok(HttpResponse::Ok().json(order))
}

route!(complete_cash_payment => Patch "/orders/{id}/complete-cash-payment" impl OrderLedgerDatabase where requires [Role::Admin]);
/// Marks a cash-on-delivery order as paid, promoting it from `pending` to `confirmed` if it has
/// not been confirmed yet. Repeating the call, or applying it to an online order, is answered
/// with a 409 conflict.
pub async fn complete_cash_payment<B: OrderLedgerDatabase>(
    path: web::Path<i64>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    info!("💻️ Cash payment completion request for order {id}");
    let order = api.complete_cash_payment(id).await.map_err(|e| {
        debug!("💻️ Could not complete cash payment. {e}");
        ServerError::from(e)
    })?;
    Ok(HttpResponse::Ok().json(order))
}
