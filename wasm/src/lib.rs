//! WebAssembly module for the Smart Inventory dashboard
//!
//! Provides client-side computation for:
//! - Live FIFO allocation previews while a fulfillment quantity is edited
//! - Role navigation and capability checks
//! - Average cost previews when receiving a purchase order

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use wasm_bindgen::prelude::*;

use shared::allocation::{fifo_order, plan_batch_allocation as plan_batches};
use shared::{visible_nav_items, weighted_average_cost, Capability, ProductBatch, StaffRole};

fn js_error(message: String) -> JsValue {
    #[cfg(target_arch = "wasm32")]
    web_sys::console::warn_1(&JsValue::from_str(&message));
    JsValue::from_str(&message)
}

fn parse_batches(batches_json: &str) -> Result<Vec<ProductBatch>, String> {
    serde_json::from_str(batches_json).map_err(|e| format!("Invalid batches JSON: {}", e))
}

fn plan_json(batches: &[ProductBatch], quantity: i32) -> Result<String, String> {
    let plan = plan_batches(batches, quantity);
    serde_json::to_string(&plan).map_err(|e| format!("Failed to serialize plan: {}", e))
}

/// Plan an allocation over batches in the order given
///
/// `batches_json` is an array of batches (`batchId`, `quantityRemaining`,
/// optional `receivedDate`, ...). Returns `{allocations, shortfall}` as JSON.
#[wasm_bindgen]
pub fn plan_batch_allocation(batches_json: &str, quantity: i32) -> Result<String, JsValue> {
    let batches = parse_batches(batches_json).map_err(js_error)?;
    plan_json(&batches, quantity).map_err(js_error)
}

/// Same as [`plan_batch_allocation`] after sorting oldest-received first
#[wasm_bindgen]
pub fn plan_fifo_allocation(batches_json: &str, quantity: i32) -> Result<String, JsValue> {
    let mut batches = parse_batches(batches_json).map_err(js_error)?;
    fifo_order(&mut batches);
    plan_json(&batches, quantity).map_err(js_error)
}

/// Navigation entries for a role as a JSON array of `{href, label}`
#[wasm_bindgen]
pub fn visible_navigation(role: &str) -> Result<String, JsValue> {
    let role: StaffRole = role.parse().map_err(js_error)?;
    serde_json::to_string(&visible_nav_items(role))
        .map_err(|e| js_error(format!("Failed to serialize navigation: {}", e)))
}

/// Whether a role holds a capability; unknown names are denied
#[wasm_bindgen]
pub fn role_can(role: &str, capability: &str) -> bool {
    match (role.parse::<StaffRole>(), capability.parse::<Capability>()) {
        (Ok(role), Ok(capability)) => role.can(capability),
        _ => false,
    }
}

/// Preview the average cost after receiving `received_qty` at `new_cost`
#[wasm_bindgen]
pub fn calculate_average_cost(old_qty: i32, old_cost: f64, received_qty: i32, new_cost: f64) -> f64 {
    let old_cost = Decimal::try_from(old_cost).unwrap_or(Decimal::ZERO);
    let new_cost = Decimal::try_from(new_cost).unwrap_or(Decimal::ZERO);
    weighted_average_cost(old_qty, old_cost, received_qty, new_cost)
        .to_f64()
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    const BATCHES: &str = r#"[
        {"batchId":"B-NEW","productId":"P1","receivedDate":"2024-02-01T00:00:00Z","quantityRemaining":10},
        {"batchId":"B-OLD","productId":"P1","receivedDate":"2024-01-01T00:00:00Z","quantityRemaining":5}
    ]"#;

    #[test]
    fn test_plan_keeps_input_order() {
        let plan: Value = serde_json::from_str(&plan_batch_allocation(BATCHES, 6).unwrap()).unwrap();
        assert_eq!(plan["allocations"][0]["batch"]["batchId"], "B-NEW");
        assert_eq!(plan["allocations"][0]["take"], 6);
        assert_eq!(plan["allocations"][0]["remainingAfter"], 4);
        assert_eq!(plan["shortfall"], 0);
    }

    #[test]
    fn test_fifo_plan_starts_with_oldest() {
        let plan: Value = serde_json::from_str(&plan_fifo_allocation(BATCHES, 7).unwrap()).unwrap();
        assert_eq!(plan["allocations"][0]["batch"]["batchId"], "B-OLD");
        assert_eq!(plan["allocations"][0]["take"], 5);
        assert_eq!(plan["allocations"][1]["batch"]["batchId"], "B-NEW");
        assert_eq!(plan["allocations"][1]["take"], 2);
    }

    #[test]
    fn test_plan_reports_shortfall() {
        let plan: Value = serde_json::from_str(&plan_fifo_allocation(BATCHES, 20).unwrap()).unwrap();
        assert_eq!(plan["shortfall"], 5);
    }

    #[test]
    fn test_sales_navigation_label() {
        let nav: Value = serde_json::from_str(&visible_navigation("SALES").unwrap()).unwrap();
        let inventory = nav
            .as_array()
            .unwrap()
            .iter()
            .find(|item| item["href"] == "/inventory")
            .unwrap();
        assert_eq!(inventory["label"], "Products");
    }

    #[test]
    fn test_role_can() {
        assert!(role_can("FOREMAN", "APPROVE_REQUESTS"));
        assert!(!role_can("FOREMAN", "STOCK_IN"));
        assert!(role_can("ADMIN", "STOCK_IN"));
        assert!(!role_can("JANITOR", "STOCK_IN"));
    }

    #[test]
    fn test_calculate_average_cost() {
        assert!((calculate_average_cost(10, 5.0, 10, 8.0) - 6.5).abs() < 1e-9);
        assert!((calculate_average_cost(0, 5.0, 3, 9.99) - 9.99).abs() < 1e-9);
    }
}

#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::*;
    use wasm_bindgen_test::*;

    #[wasm_bindgen_test]
    fn malformed_batches_become_js_errors() {
        let err = plan_batch_allocation("not json", 3).unwrap_err();
        let message = err.as_string().unwrap();
        assert!(message.starts_with("Invalid batches JSON"));
    }

    #[wasm_bindgen_test]
    fn unknown_role_is_a_js_error() {
        let err = visible_navigation("JANITOR").unwrap_err();
        assert!(err.as_string().is_some());
    }

    #[wasm_bindgen_test]
    fn fifo_plan_in_the_browser() {
        let batches = r#"[
            {"batchId":"B-NEW","productId":"P1","receivedDate":"2024-02-01T00:00:00Z","quantityRemaining":10},
            {"batchId":"B-OLD","productId":"P1","receivedDate":"2024-01-01T00:00:00Z","quantityRemaining":5}
        ]"#;
        let plan: serde_json::Value =
            serde_json::from_str(&plan_fifo_allocation(batches, 7).unwrap()).unwrap();
        assert_eq!(plan["allocations"][0]["batch"]["batchId"], "B-OLD");
        assert_eq!(plan["shortfall"], 0);
    }
}
