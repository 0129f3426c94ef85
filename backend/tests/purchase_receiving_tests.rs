//! Purchase receiving cost tests
//!
//! Tests for weighted average cost and order totals:
//! - Received cost becomes the average when nothing valued is on hand
//! - The average always lies between the old and new cost
//! - Totals are sums of rounded line totals

use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::{line_total, order_total, round_money, weighted_average_cost};
use std::str::FromStr;

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_average_of_equal_quantities() {
        assert_eq!(weighted_average_cost(10, dec("5.00"), 10, dec("8.00")), dec("6.50"));
    }

    #[test]
    fn test_empty_stock_takes_new_cost() {
        assert_eq!(weighted_average_cost(0, dec("5.00"), 4, dec("7.255")), dec("7.26"));
        assert_eq!(weighted_average_cost(12, Decimal::ZERO, 4, dec("3.10")), dec("3.10"));
    }

    #[test]
    fn test_negative_stock_takes_new_cost() {
        assert_eq!(weighted_average_cost(-3, dec("5.00"), 4, dec("9.00")), dec("9.00"));
    }

    #[test]
    fn test_average_rounds_half_up() {
        // (1*1.00 + 2*1.01) / 3 = 1.00666..
        assert_eq!(weighted_average_cost(1, dec("1.00"), 2, dec("1.01")), dec("1.01"));
    }

    #[test]
    fn test_purchase_order_total() {
        let lines = vec![(3, dec("12.50")), (2, dec("0.99")), (1, dec("100"))];
        assert_eq!(order_total(lines), dec("139.48"));
        assert_eq!(line_total(3, dec("0.335")), dec("1.01"));
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn cost_strategy() -> impl Strategy<Value = Decimal> {
        (1i64..1_000_000).prop_map(|cents| Decimal::new(cents, 2))
    }

    proptest! {
        #[test]
        fn prop_average_between_costs(
            old_qty in 1i32..10_000,
            old_cost in cost_strategy(),
            received in 1i32..10_000,
            new_cost in cost_strategy(),
        ) {
            let avg = weighted_average_cost(old_qty, old_cost, received, new_cost);
            let low = old_cost.min(new_cost);
            let high = old_cost.max(new_cost);
            prop_assert!(avg >= round_money(low) && avg <= round_money(high));
            prop_assert!(avg.scale() <= 2);
        }

        #[test]
        fn prop_same_cost_is_stable(
            old_qty in 1i32..10_000,
            received in 1i32..10_000,
            cost in cost_strategy(),
        ) {
            prop_assert_eq!(weighted_average_cost(old_qty, cost, received, cost), cost);
        }

        #[test]
        fn prop_total_is_sum_of_lines(
            lines in prop::collection::vec((1i32..500, cost_strategy()), 0..10),
        ) {
            let expected: Decimal = lines.iter().map(|(q, p)| line_total(*q, *p)).sum();
            prop_assert_eq!(order_total(lines.clone()), expected);
        }
    }
}
