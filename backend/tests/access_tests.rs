//! Role access tests
//!
//! Tests for the role capability table:
//! - Navigation per role
//! - Capability grants
//! - Dashboard route guarding

use proptest::prelude::*;
use shared::{route_allowed, visible_nav_items, Capability, StaffRole, NAV_ITEMS};

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_admin_sees_every_section() {
        assert_eq!(visible_nav_items(StaffRole::Admin).len(), NAV_ITEMS.len());
    }

    #[test]
    fn test_sales_sees_products_label() {
        let items = visible_nav_items(StaffRole::Sales);
        let inventory = items.iter().find(|i| i.href == "/inventory").unwrap();
        assert_eq!(inventory.label, "Products");
        assert!(items.iter().all(|i| i.href != "/stock"));
    }

    #[test]
    fn test_foreman_approves_but_cannot_stock_in() {
        assert!(StaffRole::Foreman.can(Capability::ApproveRequests));
        assert!(!StaffRole::Foreman.can(Capability::StockIn));
    }

    #[test]
    fn test_warehouse_routes() {
        assert!(route_allowed(StaffRole::Warehouse, "/stock"));
        assert!(route_allowed(StaffRole::Warehouse, "/procurement/purchase-orders?status=Pending"));
        assert!(!route_allowed(StaffRole::Warehouse, "/admin/staff"));
        assert!(!route_allowed(StaffRole::Warehouse, "/nowhere"));
    }

    #[test]
    fn test_capability_names_round_trip() {
        for capability in Capability::ALL {
            let parsed: Capability = capability.as_str().parse().unwrap();
            assert_eq!(parsed, capability);
        }
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn role_strategy() -> impl Strategy<Value = StaffRole> {
        prop::sample::select(StaffRole::ALL.to_vec())
    }

    fn capability_strategy() -> impl Strategy<Value = Capability> {
        prop::sample::select(Capability::ALL.to_vec())
    }

    proptest! {
        /// ADMIN holds every capability any other role holds
        #[test]
        fn prop_admin_superset(role in role_strategy(), capability in capability_strategy()) {
            if role.can(capability) {
                prop_assert!(StaffRole::Admin.can(capability));
            }
        }

        /// Every visible nav entry is a reachable route
        #[test]
        fn prop_visible_items_are_reachable(role in role_strategy()) {
            for item in visible_nav_items(role) {
                prop_assert!(route_allowed(role, &item.href));
            }
        }
    }
}
