//! The behaviour a storage backend must provide to power the order engine.
//!
//! The traits are split by concern: [`MenuCatalog`] is the read-side of the catalog projection,
//! [`OrderManagement`] covers order reads, and [`OrderLedgerDatabase`] is the transactional
//! write-side, the only component allowed to mutate `orders` and `order_items`.

mod order_ledger_database;
mod order_management;

pub use order_ledger_database::{IntentReconciliation, OrderLedgerDatabase, OrderLedgerError};
pub use order_management::{MenuCatalog, OrderManagement};
