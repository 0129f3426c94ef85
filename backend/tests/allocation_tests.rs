//! FIFO batch allocation tests
//!
//! Tests for the batch allocation planner including:
//! - Conservation of the requested quantity
//! - No batch is over-drawn
//! - Earlier batches are exhausted before later ones
//! - Non-positive requests and empty batches

use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use shared::{fifo_order, plan_batch_allocation, ProductBatch};

fn batch(id: &str, remaining: i32) -> ProductBatch {
    ProductBatch {
        batch_id: id.to_string(),
        product_id: "PROD-TEST0001".to_string(),
        po_id: None,
        received_date: None,
        quantity_in: remaining.max(0),
        quantity_remaining: remaining,
        unit_cost: None,
        expiry_date: None,
    }
}

fn takes(batches: &[ProductBatch], quantity: i32) -> (Vec<(String, i32, i32)>, i32) {
    let plan = plan_batch_allocation(batches, quantity);
    let rows = plan
        .allocations
        .iter()
        .map(|a| (a.batch.batch_id.clone(), a.take, a.remaining_after))
        .collect();
    (rows, plan.shortfall)
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_spans_two_batches() {
        let (rows, shortfall) = takes(&[batch("B1", 5), batch("B2", 3)], 6);
        assert_eq!(
            rows,
            vec![("B1".to_string(), 5, 0), ("B2".to_string(), 1, 2)]
        );
        assert_eq!(shortfall, 0);
    }

    #[test]
    fn test_short_stock_reports_shortfall() {
        let (rows, shortfall) = takes(&[batch("B1", 2)], 5);
        assert_eq!(rows, vec![("B1".to_string(), 2, 0)]);
        assert_eq!(shortfall, 3);
    }

    #[test]
    fn test_no_batches() {
        let (rows, shortfall) = takes(&[], 4);
        assert!(rows.is_empty());
        assert_eq!(shortfall, 4);
    }

    #[test]
    fn test_empty_batch_is_skipped() {
        let (rows, shortfall) = takes(&[batch("B1", 0), batch("B2", 4)], 3);
        assert_eq!(rows, vec![("B2".to_string(), 3, 1)]);
        assert_eq!(shortfall, 0);
    }

    #[test]
    fn test_zero_quantity() {
        let (rows, shortfall) = takes(&[batch("B1", 5)], 0);
        assert!(rows.is_empty());
        assert_eq!(shortfall, 0);
    }

    #[test]
    fn test_fifo_order_then_plan() {
        let day = |d| Some(Utc.with_ymd_and_hms(2024, 1, d, 8, 0, 0).unwrap());
        let mut batches = vec![batch("B-NEW", 10), batch("B-OLD", 2), batch("B-MID", 3)];
        batches[0].received_date = day(20);
        batches[1].received_date = day(1);
        batches[2].received_date = day(10);

        fifo_order(&mut batches);
        let (rows, shortfall) = takes(&batches, 6);
        assert_eq!(
            rows,
            vec![
                ("B-OLD".to_string(), 2, 0),
                ("B-MID".to_string(), 3, 0),
                ("B-NEW".to_string(), 1, 9),
            ]
        );
        assert_eq!(shortfall, 0);
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn batches_strategy() -> impl Strategy<Value = Vec<ProductBatch>> {
        prop::collection::vec(-5i32..50, 0..12).prop_map(|remaining| {
            remaining
                .into_iter()
                .enumerate()
                .map(|(i, r)| batch(&format!("B{}", i), r))
                .collect()
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// Taken units plus shortfall always equal the clamped request
        #[test]
        fn prop_conservation(batches in batches_strategy(), quantity in -20i32..300) {
            let plan = plan_batch_allocation(&batches, quantity);
            let taken: i32 = plan.allocations.iter().map(|a| a.take).sum();
            prop_assert_eq!(taken + plan.shortfall, quantity.max(0));
        }

        /// No allocation exceeds what the batch holds
        #[test]
        fn prop_no_over_allocation(batches in batches_strategy(), quantity in 0i32..300) {
            let plan = plan_batch_allocation(&batches, quantity);
            for a in &plan.allocations {
                prop_assert!(a.take > 0);
                prop_assert!(a.take <= a.batch.quantity_remaining);
                prop_assert_eq!(a.remaining_after, a.batch.quantity_remaining - a.take);
            }
        }

        /// Only the last allocation may leave stock behind
        #[test]
        fn prop_order_respecting(batches in batches_strategy(), quantity in 0i32..300) {
            let plan = plan_batch_allocation(&batches, quantity);
            if let Some((_, earlier)) = plan.allocations.split_last() {
                for a in earlier {
                    prop_assert_eq!(a.remaining_after, 0);
                }
            }
            // Allocations follow input order
            let positions: Vec<usize> = plan
                .allocations
                .iter()
                .map(|a| batches.iter().position(|b| b.batch_id == a.batch.batch_id).unwrap())
                .collect();
            prop_assert!(positions.windows(2).all(|w| w[0] < w[1]));
        }

        /// Non-positive requests never allocate
        #[test]
        fn prop_non_positive_request(batches in batches_strategy(), quantity in -100i32..=0) {
            let plan = plan_batch_allocation(&batches, quantity);
            prop_assert!(plan.allocations.is_empty());
            prop_assert_eq!(plan.shortfall, 0);
        }

        /// Empty or negative batches never appear in a plan
        #[test]
        fn prop_empty_batches_skipped(batches in batches_strategy(), quantity in 1i32..300) {
            let plan = plan_batch_allocation(&batches, quantity);
            prop_assert!(plan.allocations.iter().all(|a| a.batch.quantity_remaining > 0));
        }

        /// Planning twice gives the same plan
        #[test]
        fn prop_idempotent(batches in batches_strategy(), quantity in -10i32..300) {
            let first = takes(&batches, quantity);
            let second = takes(&batches, quantity);
            prop_assert_eq!(first, second);
        }
    }
}
