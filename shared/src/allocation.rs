//! Batch allocation planning
//!
//! Greedily spreads a requested quantity over stock batches to preview which
//! batches a fulfillment will draw from. The planner is a pure function: it
//! never mutates the batches it is given and never re-orders them. The order
//! of the input slice *is* the allocation priority, so the caller decides the
//! policy (oldest-received first via [`fifo_order`], expiry first, ...).
//!
//! The backend runs the same planner inside a database transaction when it
//! actually deducts stock, and the dashboard runs it through WASM to render a
//! live preview while a quantity is being edited.

use std::cmp::Ordering;

use serde::Serialize;

use crate::models::ProductBatch;

/// Anything that carries an unallocated quantity
pub trait AllocatableBatch {
    fn quantity_remaining(&self) -> i32;
}

impl AllocatableBatch for ProductBatch {
    fn quantity_remaining(&self) -> i32 {
        self.quantity_remaining
    }
}

impl<T: AllocatableBatch + ?Sized> AllocatableBatch for &T {
    fn quantity_remaining(&self) -> i32 {
        (**self).quantity_remaining()
    }
}

/// A planned draw from a single batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchAllocation<'a, B> {
    pub batch: &'a B,
    /// Units drawn from the batch, always > 0
    pub take: i32,
    /// Units left in the batch after the draw
    pub remaining_after: i32,
}

/// Result of a planning call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationPlan<'a, B> {
    pub allocations: Vec<BatchAllocation<'a, B>>,
    /// Portion of the request no batch could cover
    pub shortfall: i32,
}

impl<'a, B> AllocationPlan<'a, B> {
    pub fn empty() -> Self {
        Self {
            allocations: Vec::new(),
            shortfall: 0,
        }
    }

    /// Total units covered by the plan
    pub fn allocated(&self) -> i32 {
        self.allocations.iter().map(|a| a.take).sum()
    }

    pub fn is_satisfied(&self) -> bool {
        self.shortfall == 0
    }
}

/// Plan how `quantity` units would be drawn from `batches`, in slice order.
///
/// Non-positive quantities yield an empty plan with no shortfall. Batches
/// with no remaining stock (including negative values) are skipped. Once the
/// request is covered the remaining batches are not inspected.
pub fn plan_batch_allocation<B: AllocatableBatch>(
    batches: &[B],
    quantity: i32,
) -> AllocationPlan<'_, B> {
    let mut remaining = quantity;
    if remaining <= 0 {
        return AllocationPlan::empty();
    }

    let mut allocations = Vec::new();
    for batch in batches {
        if remaining <= 0 {
            break;
        }
        let available = batch.quantity_remaining().max(0);
        if available <= 0 {
            continue;
        }
        let take = available.min(remaining);
        if take <= 0 {
            continue;
        }
        allocations.push(BatchAllocation {
            batch,
            take,
            remaining_after: (available - take).max(0),
        });
        remaining -= take;
    }

    AllocationPlan {
        allocations,
        shortfall: remaining.max(0),
    }
}

/// Sort batches oldest-received first, ties broken by batch id.
///
/// Batches without a received date go last.
pub fn fifo_order(batches: &mut [ProductBatch]) {
    batches.sort_by(compare_fifo);
}

fn compare_fifo(a: &ProductBatch, b: &ProductBatch) -> Ordering {
    let by_date = match (a.received_date, b.received_date) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_date.then_with(|| a.batch_id.cmp(&b.batch_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn batch(id: &str, remaining: i32) -> ProductBatch {
        ProductBatch {
            batch_id: id.to_string(),
            product_id: "PROD-1".to_string(),
            po_id: None,
            received_date: None,
            quantity_in: remaining.max(0),
            quantity_remaining: remaining,
            unit_cost: None,
            expiry_date: None,
        }
    }

    fn summary(plan: &AllocationPlan<'_, ProductBatch>) -> Vec<(String, i32, i32)> {
        plan.allocations
            .iter()
            .map(|a| (a.batch.batch_id.clone(), a.take, a.remaining_after))
            .collect()
    }

    #[test]
    fn test_spills_into_second_batch() {
        let batches = vec![batch("B1", 5), batch("B2", 3)];
        let plan = plan_batch_allocation(&batches, 6);

        assert_eq!(
            summary(&plan),
            vec![("B1".to_string(), 5, 0), ("B2".to_string(), 1, 2)]
        );
        assert_eq!(plan.shortfall, 0);
        assert!(plan.is_satisfied());
    }

    #[test]
    fn test_shortfall_when_stock_runs_out() {
        let batches = vec![batch("B1", 2)];
        let plan = plan_batch_allocation(&batches, 5);

        assert_eq!(summary(&plan), vec![("B1".to_string(), 2, 0)]);
        assert_eq!(plan.shortfall, 3);
        assert_eq!(plan.allocated(), 2);
    }

    #[test]
    fn test_no_batches() {
        let batches: Vec<ProductBatch> = Vec::new();
        let plan = plan_batch_allocation(&batches, 4);

        assert!(plan.allocations.is_empty());
        assert_eq!(plan.shortfall, 4);
    }

    #[test]
    fn test_skips_empty_batches() {
        let batches = vec![batch("B1", 0), batch("B2", 4)];
        let plan = plan_batch_allocation(&batches, 3);

        assert_eq!(summary(&plan), vec![("B2".to_string(), 3, 1)]);
        assert_eq!(plan.shortfall, 0);
    }

    #[test]
    fn test_negative_remaining_is_treated_as_empty() {
        let batches = vec![batch("B1", -7), batch("B2", 2)];
        let plan = plan_batch_allocation(&batches, 2);

        assert_eq!(summary(&plan), vec![("B2".to_string(), 2, 0)]);
    }

    #[test]
    fn test_non_positive_quantity() {
        let batches = vec![batch("B1", 5)];
        assert_eq!(plan_batch_allocation(&batches, 0), AllocationPlan::empty());
        assert_eq!(plan_batch_allocation(&batches, -3), AllocationPlan::empty());
    }

    #[test]
    fn test_stops_once_covered() {
        let batches = vec![batch("B1", 10), batch("B2", 10)];
        let plan = plan_batch_allocation(&batches, 10);

        assert_eq!(plan.allocations.len(), 1);
        assert_eq!(plan.allocations[0].remaining_after, 0);
    }

    #[test]
    fn test_input_is_untouched() {
        let batches = vec![batch("B1", 5), batch("B2", 3)];
        let before = batches.clone();
        let first = plan_batch_allocation(&batches, 7);
        let second = plan_batch_allocation(&batches, 7);

        assert_eq!(batches, before);
        assert_eq!(first, second);
    }

    #[test]
    fn test_works_over_references() {
        let owned = vec![batch("B1", 1), batch("B2", 1)];
        let refs: Vec<&ProductBatch> = owned.iter().rev().collect();
        let plan = plan_batch_allocation(&refs, 1);

        assert_eq!(plan.allocations[0].batch.batch_id, "B2");
    }

    #[test]
    fn test_fifo_order() {
        let mut older = batch("B9", 1);
        older.received_date = Some(Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap());
        let mut newer = batch("B1", 1);
        newer.received_date = Some(Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap());
        let mut same_day = batch("B2", 1);
        same_day.received_date = newer.received_date;
        let undated = batch("B0", 1);

        let mut batches = vec![undated, same_day, newer, older];
        fifo_order(&mut batches);

        let ids: Vec<&str> = batches.iter().map(|b| b.batch_id.as_str()).collect();
        assert_eq!(ids, vec!["B9", "B1", "B2", "B0"]);
    }

    #[test]
    fn test_plan_serializes_camel_case() {
        let batches = vec![batch("B1", 5)];
        let plan = plan_batch_allocation(&batches, 2);
        let json = serde_json::to_value(&plan).unwrap();

        assert_eq!(json["shortfall"], 0);
        assert_eq!(json["allocations"][0]["take"], 2);
        assert_eq!(json["allocations"][0]["remainingAfter"], 3);
        assert_eq!(json["allocations"][0]["batch"]["batchId"], "B1");
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use proptest::prelude::*;

    fn batch_strategy() -> impl Strategy<Value = ProductBatch> {
        (0u32..50, proptest::option::of(0i64..30), 0i32..40).prop_map(|(id, day, remaining)| {
            ProductBatch {
                batch_id: format!("BATCH-{:08}", id),
                product_id: "PROD-1".to_string(),
                po_id: None,
                received_date: day.map(|d| {
                    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::days(d)
                }),
                quantity_in: remaining,
                quantity_remaining: remaining,
                unit_cost: None,
                expiry_date: None,
            }
        })
    }

    proptest! {
        #[test]
        fn prop_fifo_order_is_a_permutation(batches in prop::collection::vec(batch_strategy(), 0..12)) {
            let mut sorted = batches.clone();
            fifo_order(&mut sorted);

            let mut before: Vec<_> = batches.iter().map(|b| b.batch_id.clone()).collect();
            let mut after: Vec<_> = sorted.iter().map(|b| b.batch_id.clone()).collect();
            before.sort();
            after.sort();
            prop_assert_eq!(before, after);
        }

        #[test]
        fn prop_fifo_order_dated_before_undated(batches in prop::collection::vec(batch_strategy(), 0..12)) {
            let mut sorted = batches;
            fifo_order(&mut sorted);

            for pair in sorted.windows(2) {
                match (pair[0].received_date, pair[1].received_date) {
                    (Some(a), Some(b)) => prop_assert!(a <= b),
                    (None, Some(_)) => prop_assert!(false, "undated batch before a dated one"),
                    _ => {}
                }
            }
        }

        #[test]
        fn prop_fifo_order_is_stable_under_reversal(batches in prop::collection::vec(batch_strategy(), 0..12)) {
            let mut forward = batches.clone();
            let mut reversed: Vec<_> = batches.into_iter().rev().collect();
            fifo_order(&mut forward);
            fifo_order(&mut reversed);

            let forward: Vec<_> = forward.iter().map(|b| (b.received_date, b.batch_id.clone())).collect();
            let reversed: Vec<_> = reversed.iter().map(|b| (b.received_date, b.batch_id.clone())).collect();
            prop_assert_eq!(forward, reversed);
        }
    }
}
