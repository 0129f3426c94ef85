//! Stock arithmetic
//!
//! Pure checks and calculations used around stock movements: average cost on
//! receipt, request limits against a sales order, and fulfillment pre-checks.

use std::collections::HashMap;

use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;

use crate::models::{OrderItem, RequestLine};

/// Domain errors raised by stock checks
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StockError {
    #[error("Quantity must be greater than zero")]
    NonPositiveQuantity,

    #[error("Quantity {requested} exceeds the {remaining} still outstanding")]
    ExceedsRemaining { requested: i32, remaining: i32 },

    #[error("Insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: String,
        requested: i32,
        available: i32,
    },

    #[error("Product {product_id} is not part of the order")]
    ProductNotInOrder { product_id: String },

    #[error("Requested {requested} of product {product_id} but only {remaining} remain on the order")]
    ExceedsOrderRemaining {
        product_id: String,
        requested: i32,
        remaining: i32,
    },
}

/// Round a money amount to 2 decimal places, half away from zero
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// New average unit cost after receiving `received_qty` units at `new_cost`
///
/// When nothing valued is on hand the received cost becomes the average.
pub fn weighted_average_cost(
    old_qty: i32,
    old_cost: Decimal,
    received_qty: i32,
    new_cost: Decimal,
) -> Decimal {
    let new_cost = round_money(new_cost);
    if old_qty <= 0 || old_cost <= Decimal::ZERO {
        return new_cost;
    }
    let total_qty = old_qty + received_qty;
    if total_qty <= 0 {
        return new_cost;
    }

    let old_value = old_cost * Decimal::from(old_qty);
    let new_value = new_cost * Decimal::from(received_qty);
    round_money((old_value + new_value) / Decimal::from(total_qty))
}

/// Check requested lines against the remaining quantities of an order
///
/// Quantities for the same product accumulate across lines. If an order
/// lists a product twice the first line's remaining quantity applies.
pub fn check_request_against_order(
    order_items: &[OrderItem],
    requested: &[RequestLine],
) -> Result<(), StockError> {
    let mut available: HashMap<&str, i32> = HashMap::new();
    for item in order_items {
        available
            .entry(item.product_id.as_str())
            .or_insert(item.remaining_qty);
    }

    let mut requested_so_far: HashMap<&str, i32> = HashMap::new();
    for line in requested {
        let product_id = line.product_id.as_str();
        let remaining = *available
            .get(product_id)
            .ok_or_else(|| StockError::ProductNotInOrder {
                product_id: line.product_id.clone(),
            })?;

        let total = requested_so_far.entry(product_id).or_insert(0);
        *total += line.quantity;
        if *total > remaining {
            return Err(StockError::ExceedsOrderRemaining {
                product_id: line.product_id.clone(),
                requested: *total,
                remaining,
            });
        }
    }
    Ok(())
}

/// Pre-checks before drawing `fulfill_qty` units for a request item
pub fn check_fulfillment(
    product_id: &str,
    fulfill_qty: i32,
    item_remaining: i32,
    product_stock: i32,
) -> Result<(), StockError> {
    if fulfill_qty <= 0 {
        return Err(StockError::NonPositiveQuantity);
    }
    if fulfill_qty > item_remaining {
        return Err(StockError::ExceedsRemaining {
            requested: fulfill_qty,
            remaining: item_remaining,
        });
    }
    if product_stock < fulfill_qty {
        return Err(StockError::InsufficientStock {
            product_id: product_id.to_string(),
            requested: fulfill_qty,
            available: product_stock,
        });
    }
    Ok(())
}

pub fn line_total(quantity: i32, unit_price: Decimal) -> Decimal {
    round_money(unit_price * Decimal::from(quantity))
}

/// Sum of `(quantity, unit_price)` line totals
pub fn order_total<I>(lines: I) -> Decimal
where
    I: IntoIterator<Item = (i32, Decimal)>,
{
    lines
        .into_iter()
        .map(|(qty, price)| line_total(qty, price))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn order_item(product_id: &str, remaining: i32) -> OrderItem {
        OrderItem {
            order_item_id: format!("ITM-{}", product_id),
            order_id: "ORD-1".to_string(),
            product_id: product_id.to_string(),
            quantity: remaining,
            unit_price: d("10"),
            line_total: d("10") * Decimal::from(remaining),
            fulfilled_qty: 0,
            remaining_qty: remaining,
        }
    }

    fn line(product_id: &str, quantity: i32) -> RequestLine {
        RequestLine {
            product_id: product_id.to_string(),
            quantity,
        }
    }

    #[test]
    fn test_average_cost_blends_stock() {
        assert_eq!(weighted_average_cost(10, d("5.00"), 10, d("8.00")), d("6.50"));
    }

    #[test]
    fn test_average_cost_from_empty_stock() {
        assert_eq!(weighted_average_cost(0, d("5.00"), 4, d("7.125")), d("7.13"));
        assert_eq!(weighted_average_cost(3, Decimal::ZERO, 4, d("7.10")), d("7.10"));
    }

    #[test]
    fn test_average_cost_rounds_half_up() {
        // (1*1.00 + 2*1.01) / 3 = 1.00666..
        assert_eq!(weighted_average_cost(1, d("1.00"), 2, d("1.01")), d("1.01"));
        // (1*1.00 + 1*1.01) / 2 = 1.005
        assert_eq!(weighted_average_cost(1, d("1.00"), 1, d("1.01")), d("1.01"));
    }

    #[test]
    fn test_request_within_order() {
        let items = vec![order_item("PROD-A", 5), order_item("PROD-B", 2)];
        let lines = vec![line("PROD-A", 3), line("PROD-A", 2), line("PROD-B", 1)];
        assert!(check_request_against_order(&items, &lines).is_ok());
    }

    #[test]
    fn test_request_accumulates_per_product() {
        let items = vec![order_item("PROD-A", 5)];
        let lines = vec![line("PROD-A", 3), line("PROD-A", 3)];
        assert_eq!(
            check_request_against_order(&items, &lines),
            Err(StockError::ExceedsOrderRemaining {
                product_id: "PROD-A".to_string(),
                requested: 6,
                remaining: 5,
            })
        );
    }

    #[test]
    fn test_request_unknown_product() {
        let items = vec![order_item("PROD-A", 5)];
        let lines = vec![line("PROD-Z", 1)];
        assert!(matches!(
            check_request_against_order(&items, &lines),
            Err(StockError::ProductNotInOrder { .. })
        ));
    }

    #[test]
    fn test_check_fulfillment() {
        assert_eq!(
            check_fulfillment("PROD-A", 0, 5, 10),
            Err(StockError::NonPositiveQuantity)
        );
        assert!(matches!(
            check_fulfillment("PROD-A", 6, 5, 10),
            Err(StockError::ExceedsRemaining { .. })
        ));
        assert!(matches!(
            check_fulfillment("PROD-A", 5, 5, 4),
            Err(StockError::InsufficientStock { available: 4, .. })
        ));
        assert!(check_fulfillment("PROD-A", 5, 5, 5).is_ok());
    }

    #[test]
    fn test_order_total() {
        let total = order_total(vec![(2, d("10.50")), (3, d("1.333"))]);
        assert_eq!(total, d("25.00"));
    }
}
