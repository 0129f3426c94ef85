//! Request workflow tests
//!
//! Tests for stock requests against sales orders:
//! - Requested quantities accumulate per product
//! - Products outside the order are refused
//! - Fulfillment pre-checks
//! - Request status transitions

use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::{
    check_fulfillment, check_request_against_order, OrderItem, RequestLine, RequestStatus,
    StockError,
};

fn order_item(product_id: &str, quantity: i32, fulfilled: i32) -> OrderItem {
    OrderItem {
        order_item_id: format!("ITM-{}", product_id),
        order_id: "ORD-TEST0001".to_string(),
        product_id: product_id.to_string(),
        quantity,
        unit_price: Decimal::ONE,
        line_total: Decimal::from(quantity),
        fulfilled_qty: fulfilled,
        remaining_qty: quantity - fulfilled,
    }
}

fn line(product_id: &str, quantity: i32) -> RequestLine {
    RequestLine {
        product_id: product_id.to_string(),
        quantity,
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_request_within_order() {
        let order = vec![order_item("P1", 10, 4), order_item("P2", 3, 0)];
        assert!(check_request_against_order(&order, &[line("P1", 6), line("P2", 3)]).is_ok());
    }

    #[test]
    fn test_split_lines_accumulate() {
        let order = vec![order_item("P1", 10, 4)];
        let result = check_request_against_order(&order, &[line("P1", 4), line("P1", 3)]);
        assert_eq!(
            result,
            Err(StockError::ExceedsOrderRemaining {
                product_id: "P1".to_string(),
                requested: 7,
                remaining: 6,
            })
        );
    }

    #[test]
    fn test_product_outside_order() {
        let order = vec![order_item("P1", 10, 0)];
        assert!(matches!(
            check_request_against_order(&order, &[line("P9", 1)]),
            Err(StockError::ProductNotInOrder { .. })
        ));
    }

    #[test]
    fn test_fulfillment_checks_in_order() {
        assert_eq!(
            check_fulfillment("P1", 0, 5, 100),
            Err(StockError::NonPositiveQuantity)
        );
        assert!(matches!(
            check_fulfillment("P1", 6, 5, 100),
            Err(StockError::ExceedsRemaining { .. })
        ));
        assert!(matches!(
            check_fulfillment("P1", 5, 5, 4),
            Err(StockError::InsufficientStock { available: 4, .. })
        ));
        assert!(check_fulfillment("P1", 5, 5, 5).is_ok());
    }

    #[test]
    fn test_request_lifecycle() {
        use RequestStatus::*;
        let path = [AwaitingApproval, Approved, Pending, Pending, Closed];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{:?} -> {:?}", pair[0], pair[1]);
        }
        assert!(Closed.is_terminal());
        assert!(Rejected.is_terminal());
        assert!(!Rejected.accepts_fulfillment());
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    proptest! {
        /// A request passes exactly when its per-product sum fits the order
        #[test]
        fn prop_request_limit(
            ordered in 1i32..100,
            fulfilled in 0i32..100,
            parts in prop::collection::vec(1i32..30, 1..6),
        ) {
            let fulfilled = fulfilled.min(ordered);
            let order = vec![order_item("P1", ordered, fulfilled)];
            let lines: Vec<RequestLine> = parts.iter().map(|q| line("P1", *q)).collect();
            let total: i32 = parts.iter().sum();

            let result = check_request_against_order(&order, &lines);
            prop_assert_eq!(result.is_ok(), total <= ordered - fulfilled);
        }

        /// Fulfillment is allowed only for positive quantities within both limits
        #[test]
        fn prop_fulfillment_bounds(
            qty in -10i32..50,
            remaining in 0i32..50,
            stock in 0i32..50,
        ) {
            let ok = check_fulfillment("P1", qty, remaining, stock).is_ok();
            prop_assert_eq!(ok, qty > 0 && qty <= remaining && qty <= stock);
        }
    }
}
