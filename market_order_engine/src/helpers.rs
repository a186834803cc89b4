//! Pricing policy and order-number generation.

use chrono::Utc;
use mos_common::Money;
use rand::Rng;

use crate::db_types::OrderNumber;

/// Store-wide pricing constants applied to every order at creation time.
///
/// Tax is expressed in basis points so that totals stay in exact integer cents.
#[derive(Debug, Clone)]
pub struct PricingPolicy {
    pub tax_basis_points: u32,
    pub shipping_fee: Money,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        // 10% tax, flat $10 shipping
        Self { tax_basis_points: 1000, shipping_fee: Money::from_dollars(10) }
    }
}

/// The computed monetary breakdown of an order. `total` is always `subtotal + tax + shipping`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderTotals {
    pub subtotal: Money,
    pub tax: Money,
    pub shipping: Money,
    pub total: Money,
}

impl PricingPolicy {
    pub fn tax_on(&self, subtotal: Money) -> Money {
        Money::from_cents(subtotal.value() * i64::from(self.tax_basis_points) / 10_000)
    }

    pub fn quote(&self, subtotal: Money) -> OrderTotals {
        let tax = self.tax_on(subtotal);
        let shipping = self.shipping_fee;
        OrderTotals { subtotal, tax, shipping, total: subtotal + tax + shipping }
    }
}

/// Generates a globally unique order number: a millisecond timestamp plus a random 4-digit suffix.
pub fn new_order_number() -> OrderNumber {
    let millis = Utc::now().timestamp_millis();
    let suffix: u32 = rand::thread_rng().gen_range(0..10_000);
    OrderNumber(format!("MO-{millis}-{suffix:04}"))
}
