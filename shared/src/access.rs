//! Role capability table
//!
//! Which dashboard sections and API actions each staff role may reach. The
//! table is declarative: roles do not inherit from each other, and ADMIN is
//! simply listed as holding everything.

use serde::{Deserialize, Serialize};

use crate::models::StaffRole;

/// API actions guarded by role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Capability {
    ViewProducts,
    ManageProducts,
    StockIn,
    ViewStockTransactions,
    FulfillRequests,
    ViewRequests,
    CreateRequests,
    ApproveRequests,
    CloseRequests,
    ViewOrders,
    CreateOrders,
    CloseOrders,
    ViewCustomers,
    ManageCustomers,
    ViewSuppliers,
    ManageSuppliers,
    ViewPurchaseOrders,
    CreatePurchaseOrders,
    PricePurchaseOrders,
    ReceivePurchaseOrders,
    ManageStaff,
    ViewReports,
    ExportReports,
}

impl Capability {
    pub const ALL: [Capability; 23] = [
        Capability::ViewProducts,
        Capability::ManageProducts,
        Capability::StockIn,
        Capability::ViewStockTransactions,
        Capability::FulfillRequests,
        Capability::ViewRequests,
        Capability::CreateRequests,
        Capability::ApproveRequests,
        Capability::CloseRequests,
        Capability::ViewOrders,
        Capability::CreateOrders,
        Capability::CloseOrders,
        Capability::ViewCustomers,
        Capability::ManageCustomers,
        Capability::ViewSuppliers,
        Capability::ManageSuppliers,
        Capability::ViewPurchaseOrders,
        Capability::CreatePurchaseOrders,
        Capability::PricePurchaseOrders,
        Capability::ReceivePurchaseOrders,
        Capability::ManageStaff,
        Capability::ViewReports,
        Capability::ExportReports,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::ViewProducts => "VIEW_PRODUCTS",
            Capability::ManageProducts => "MANAGE_PRODUCTS",
            Capability::StockIn => "STOCK_IN",
            Capability::ViewStockTransactions => "VIEW_STOCK_TRANSACTIONS",
            Capability::FulfillRequests => "FULFILL_REQUESTS",
            Capability::ViewRequests => "VIEW_REQUESTS",
            Capability::CreateRequests => "CREATE_REQUESTS",
            Capability::ApproveRequests => "APPROVE_REQUESTS",
            Capability::CloseRequests => "CLOSE_REQUESTS",
            Capability::ViewOrders => "VIEW_ORDERS",
            Capability::CreateOrders => "CREATE_ORDERS",
            Capability::CloseOrders => "CLOSE_ORDERS",
            Capability::ViewCustomers => "VIEW_CUSTOMERS",
            Capability::ManageCustomers => "MANAGE_CUSTOMERS",
            Capability::ViewSuppliers => "VIEW_SUPPLIERS",
            Capability::ManageSuppliers => "MANAGE_SUPPLIERS",
            Capability::ViewPurchaseOrders => "VIEW_PURCHASE_ORDERS",
            Capability::CreatePurchaseOrders => "CREATE_PURCHASE_ORDERS",
            Capability::PricePurchaseOrders => "PRICE_PURCHASE_ORDERS",
            Capability::ReceivePurchaseOrders => "RECEIVE_PURCHASE_ORDERS",
            Capability::ManageStaff => "MANAGE_STAFF",
            Capability::ViewReports => "VIEW_REPORTS",
            Capability::ExportReports => "EXPORT_REPORTS",
        }
    }

    /// Non-admin roles granted this capability
    fn granted_to(&self) -> &'static [StaffRole] {
        use StaffRole::*;
        match self {
            Capability::ViewProducts
            | Capability::ViewCustomers
            | Capability::ViewSuppliers
            | Capability::ViewReports => &StaffRole::ALL,
            Capability::ManageProducts
            | Capability::StockIn
            | Capability::ViewStockTransactions
            | Capability::FulfillRequests => &[Warehouse],
            Capability::ViewRequests => &[Sales, Technician, Foreman, Warehouse],
            Capability::CreateRequests | Capability::CloseRequests => &[Technician],
            Capability::ApproveRequests => &[Foreman],
            Capability::ViewOrders => &[Sales, Technician, Foreman],
            Capability::CreateOrders | Capability::CloseOrders | Capability::ManageCustomers => {
                &[Sales]
            }
            Capability::ManageSuppliers => &[Warehouse, Sales, Procurement],
            Capability::ViewPurchaseOrders
            | Capability::CreatePurchaseOrders
            | Capability::ReceivePurchaseOrders => &[Warehouse, Procurement],
            Capability::PricePurchaseOrders => &[Procurement],
            Capability::ManageStaff | Capability::ExportReports => &[],
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Capability {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace(['-', ' '], "_");
        Capability::ALL
            .into_iter()
            .find(|c| c.as_str() == normalized)
            .ok_or_else(|| format!("Unknown capability: {}", s))
    }
}

impl StaffRole {
    /// Whether the role may perform `capability`
    pub fn can(&self, capability: Capability) -> bool {
        *self == StaffRole::Admin || capability.granted_to().contains(self)
    }

    /// All capabilities held by the role
    pub fn capabilities(&self) -> Vec<Capability> {
        Capability::ALL
            .into_iter()
            .filter(|c| self.can(*c))
            .collect()
    }
}

/// A dashboard navigation entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavItem {
    pub href: &'static str,
    pub label: &'static str,
    /// Empty means every role
    pub roles: &'static [StaffRole],
    /// Per-role label replacements
    #[serde(skip)]
    pub label_overrides: &'static [(StaffRole, &'static str)],
}

impl NavItem {
    pub fn visible_to(&self, role: StaffRole) -> bool {
        role == StaffRole::Admin || self.roles.is_empty() || self.roles.contains(&role)
    }

    pub fn label_for(&self, role: StaffRole) -> &'static str {
        self.label_overrides
            .iter()
            .find(|(r, _)| *r == role)
            .map(|(_, label)| *label)
            .unwrap_or(self.label)
    }
}

/// A navigation entry resolved for one role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibleNavItem {
    pub href: String,
    pub label: String,
}

pub const NAV_ITEMS: &[NavItem] = &[
    NavItem {
        href: "/dashboard",
        label: "Overview",
        roles: &[],
        label_overrides: &[],
    },
    NavItem {
        href: "/inventory",
        label: "Inventory",
        roles: &[StaffRole::Warehouse, StaffRole::Admin, StaffRole::Sales],
        label_overrides: &[(StaffRole::Sales, "Products")],
    },
    NavItem {
        href: "/orders",
        label: "Orders",
        roles: &[StaffRole::Sales, StaffRole::Technician, StaffRole::Admin],
        label_overrides: &[],
    },
    NavItem {
        href: "/requests",
        label: "Requests",
        roles: &[StaffRole::Technician, StaffRole::Foreman, StaffRole::Warehouse, StaffRole::Admin],
        label_overrides: &[],
    },
    NavItem {
        href: "/stock",
        label: "Stock Ops",
        roles: &[StaffRole::Warehouse, StaffRole::Admin],
        label_overrides: &[],
    },
    NavItem {
        href: "/customers",
        label: "Customers",
        roles: &[StaffRole::Sales, StaffRole::Technician, StaffRole::Admin],
        label_overrides: &[],
    },
    NavItem {
        href: "/suppliers",
        label: "Suppliers",
        roles: &[StaffRole::Warehouse, StaffRole::Sales, StaffRole::Admin],
        label_overrides: &[],
    },
    NavItem {
        href: "/procurement/purchase-orders",
        label: "Purchase Orders",
        roles: &[StaffRole::Warehouse, StaffRole::Procurement, StaffRole::Admin],
        label_overrides: &[],
    },
    NavItem {
        href: "/admin/staff",
        label: "Staff",
        roles: &[StaffRole::Admin],
        label_overrides: &[],
    },
];

/// Navigation entries a role sees, in display order
pub fn visible_nav_items(role: StaffRole) -> Vec<VisibleNavItem> {
    NAV_ITEMS
        .iter()
        .filter(|item| item.visible_to(role))
        .map(|item| VisibleNavItem {
            href: item.href.to_string(),
            label: item.label_for(role).to_string(),
        })
        .collect()
}

/// Whether a dashboard path falls under a section the role may open
pub fn route_allowed(role: StaffRole, path: &str) -> bool {
    let path = path.split(['?', '#']).next().unwrap_or(path);
    NAV_ITEMS
        .iter()
        .filter(|item| path_under(path, item.href))
        .max_by_key(|item| item.href.len())
        .map(|item| item.visible_to(role))
        .unwrap_or(false)
}

fn path_under(path: &str, href: &str) -> bool {
    match path.strip_prefix(href) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_sees_everything() {
        let items = visible_nav_items(StaffRole::Admin);
        assert_eq!(items.len(), NAV_ITEMS.len());
        assert!(Capability::ALL.iter().all(|c| StaffRole::Admin.can(*c)));
    }

    #[test]
    fn test_sales_sees_products_label() {
        let items = visible_nav_items(StaffRole::Sales);
        let inventory = items.iter().find(|i| i.href == "/inventory").unwrap();
        assert_eq!(inventory.label, "Products");

        let warehouse = visible_nav_items(StaffRole::Warehouse);
        let inventory = warehouse.iter().find(|i| i.href == "/inventory").unwrap();
        assert_eq!(inventory.label, "Inventory");
    }

    #[test]
    fn test_foreman_navigation() {
        let hrefs: Vec<String> = visible_nav_items(StaffRole::Foreman)
            .into_iter()
            .map(|i| i.href)
            .collect();
        assert_eq!(hrefs, vec!["/dashboard", "/requests"]);
    }

    #[test]
    fn test_foreman_approves_but_cannot_stock_in() {
        assert!(StaffRole::Foreman.can(Capability::ApproveRequests));
        assert!(!StaffRole::Foreman.can(Capability::StockIn));
        assert!(!StaffRole::Warehouse.can(Capability::ApproveRequests));
    }

    #[test]
    fn test_procurement_capabilities() {
        let role = StaffRole::Procurement;
        assert!(role.can(Capability::PricePurchaseOrders));
        assert!(role.can(Capability::ReceivePurchaseOrders));
        assert!(!role.can(Capability::FulfillRequests));
        assert!(!StaffRole::Warehouse.can(Capability::PricePurchaseOrders));
    }

    #[test]
    fn test_staff_management_is_admin_only() {
        for role in StaffRole::ALL {
            assert_eq!(role.can(Capability::ManageStaff), role == StaffRole::Admin);
        }
    }

    #[test]
    fn test_route_allowed() {
        assert!(route_allowed(StaffRole::Procurement, "/procurement/purchase-orders/PO-1"));
        assert!(!route_allowed(StaffRole::Procurement, "/stock"));
        assert!(route_allowed(StaffRole::Technician, "/dashboard?tab=1"));
        assert!(!route_allowed(StaffRole::Sales, "/admin/staff"));
        assert!(!route_allowed(StaffRole::Warehouse, "/stockroom"));
        assert!(!route_allowed(StaffRole::Admin, "/unknown"));
    }

    #[test]
    fn test_parse_capability() {
        assert_eq!(
            "stock-in".parse::<Capability>().unwrap(),
            Capability::StockIn
        );
        assert_eq!(
            "APPROVE_REQUESTS".parse::<Capability>().unwrap(),
            Capability::ApproveRequests
        );
        assert!("fly".parse::<Capability>().is_err());
    }
}
