//! Bistro Order Engine
//!
//! The order engine holds the core logic of the order intake and payment pipeline: pricing carts
//! from catalog data, committing orders and their line items atomically, governing the order and
//! payment status machines, and reconciling asynchronous payment notifications. It is
//! provider-agnostic: the HTTP server and the payment authority client live in their own crates.
//!
//! The crate is divided into three main sections:
//! 1. Database management (the `sqlite` module). SQLite is the supported backend. Callers should
//!    never need to touch the database directly; the public API goes through the engine. The
//!    exception is the data types, which are defined in [`mod@db_types`] and are public.
//! 2. The engine public API ([`OrderFlowApi`] and [`OrderQueryApi`]). Backends implement the
//!    traits in [`mod@traits`] to drive these APIs.
//! 3. A small event system ([`mod@events`]) so that collaborators (e.g. the confirmation-email
//!    notifier) can react to checkout events without ever being able to fail the checkout.

mod boe_api;
pub mod db_types;
pub mod events;
pub mod pricing;
pub mod traits;

#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;

pub use boe_api::{order_flow_api::OrderFlowApi, order_objects, order_query_api::OrderQueryApi};
