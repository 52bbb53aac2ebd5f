//! # Bistro Payment Server
//!
//! The HTTP face of the order intake and payment pipeline. It is responsible for:
//! * accepting cart submissions (cash-on-delivery, guest-eligible) and online checkout
//!   confirmations,
//! * brokering payment intents against the payment authority,
//! * receiving and verifying the authority's webhook notifications,
//! * exposing the admin lifecycle operations (status changes, cash settlement).
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more
//! information.

pub mod auth;
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod gateway;
pub mod guest;
pub mod middleware;
pub mod notifier;
pub mod payment_routes;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
