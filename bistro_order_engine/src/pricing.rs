//! Cart pricing.
//!
//! Totals are recomputed strictly from catalog data; the only client inputs are item ids and
//! quantities. The tax rate and delivery fee are deployment configuration, not request inputs,
//! and there is exactly one tax rate for the whole system.

use std::collections::HashMap;

use bpg_common::Money;
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{CartLine, MenuItem, OrderType},
    traits::OrderLedgerError,
};

pub const DEFAULT_TAX_RATE_BPS: i64 = 800;
pub const DEFAULT_DELIVERY_FEE: Money = Money::new(399);

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PricingConfig {
    /// Tax rate in basis points (800 = 8.00%).
    pub tax_rate_bps: i64,
    /// Flat fee applied to delivery orders. Pickup orders carry no fee.
    pub delivery_fee: Money,
    /// ISO currency code, lower case. Used when creating payment intents.
    pub currency: String,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            tax_rate_bps: DEFAULT_TAX_RATE_BPS,
            delivery_fee: DEFAULT_DELIVERY_FEE,
            currency: bpg_common::DEFAULT_CURRENCY.to_string(),
        }
    }
}

/// One priced cart line, carrying the catalog snapshot that will be written to the ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteLine {
    pub menu_item_id: i64,
    pub name: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub line_total: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub lines: Vec<QuoteLine>,
    pub subtotal: Money,
    pub tax_amount: Money,
    pub delivery_fee: Money,
    pub final_total: Money,
}

/// Checks every cart line against the catalog rows that were fetched for it.
///
/// An id that is missing from the catalog, or whose item has been deactivated, fails the whole
/// request; so does an item that is currently unavailable (named in the error). This runs once
/// when pricing the cart and once more inside the ledger transaction, to defend against the race
/// between pricing and commit.
pub fn verify_lines(line_ids: &[i64], catalog: &[MenuItem]) -> Result<(), OrderLedgerError> {
    let by_id: HashMap<i64, &MenuItem> = catalog.iter().filter(|m| m.is_active).map(|m| (m.id, m)).collect();
    let missing: Vec<String> =
        line_ids.iter().filter(|id| !by_id.contains_key(id)).map(|id| id.to_string()).collect();
    if !missing.is_empty() {
        return Err(OrderLedgerError::ItemNotFound(missing.join(", ")));
    }
    let mut unavailable: Vec<&str> = line_ids
        .iter()
        .filter_map(|id| by_id.get(id))
        .filter(|m| !m.is_available)
        .map(|m| m.name.as_str())
        .collect();
    unavailable.dedup();
    if !unavailable.is_empty() {
        return Err(OrderLedgerError::ItemUnavailable(unavailable.join(", ")));
    }
    Ok(())
}

/// Prices a cart against the given catalog rows.
pub fn price_cart(
    config: &PricingConfig,
    lines: &[CartLine],
    order_type: OrderType,
    catalog: &[MenuItem],
) -> Result<Quote, OrderLedgerError> {
    if lines.is_empty() {
        return Err(OrderLedgerError::EmptyOrder);
    }
    if lines.iter().any(|l| l.quantity <= 0) {
        return Err(OrderLedgerError::InvalidQuantity);
    }
    let ids: Vec<i64> = lines.iter().map(|l| l.menu_item_id).collect();
    verify_lines(&ids, catalog)?;

    let by_id: HashMap<i64, &MenuItem> = catalog.iter().map(|m| (m.id, m)).collect();
    let quote_lines: Vec<QuoteLine> = lines
        .iter()
        .map(|line| {
            let item = by_id[&line.menu_item_id];
            QuoteLine {
                menu_item_id: item.id,
                name: item.name.clone(),
                quantity: line.quantity,
                unit_price: item.price,
                line_total: item.price * line.quantity,
            }
        })
        .collect();
    let subtotal: Money = quote_lines.iter().map(|l| l.line_total).sum();
    let tax_amount = tax_on(subtotal, config.tax_rate_bps);
    let delivery_fee = match order_type {
        OrderType::Delivery => config.delivery_fee,
        OrderType::Pickup => Money::default(),
    };
    let final_total = subtotal + tax_amount + delivery_fee;
    Ok(Quote { lines: quote_lines, subtotal, tax_amount, delivery_fee, final_total })
}

/// Tax in minor units, rounded half-up. With amounts carried in cents this is the integer form of
/// `round(subtotal * rate, 2)`.
fn tax_on(subtotal: Money, tax_rate_bps: i64) -> Money {
    Money::new((subtotal.value() * tax_rate_bps + 5_000) / 10_000)
}
