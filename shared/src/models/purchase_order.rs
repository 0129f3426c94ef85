//! Purchase order (procurement) models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A purchase order placed with a supplier
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct PurchaseOrder {
    pub po_id: String,
    pub po_date: DateTime<Utc>,
    pub supplier_id: String,
    pub staff_id: Option<String>,
    pub total_amount: Decimal,
    pub status: PurchaseOrderStatus,
    #[cfg_attr(feature = "sqlx", sqlx(skip))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<PurchaseItem>>,
}

/// A product line of a purchase order
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct PurchaseItem {
    pub po_item_id: String,
    pub po_id: String,
    pub product_id: String,
    pub quantity: i32,
    pub unit_price: Option<Decimal>,
}

/// Purchase order lifecycle
///
/// `New order` -> `Pending` once priced (or `Rejected`), then `Received`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "purchase_order_status"))]
pub enum PurchaseOrderStatus {
    #[serde(rename = "New order")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "New order"))]
    NewOrder,
    Pending,
    Rejected,
    Received,
}

impl PurchaseOrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PurchaseOrderStatus::NewOrder => "New order",
            PurchaseOrderStatus::Pending => "Pending",
            PurchaseOrderStatus::Rejected => "Rejected",
            PurchaseOrderStatus::Received => "Received",
        }
    }

    pub fn can_be_priced(&self) -> bool {
        matches!(self, PurchaseOrderStatus::NewOrder | PurchaseOrderStatus::Pending)
    }

    pub fn can_be_received(&self) -> bool {
        matches!(self, PurchaseOrderStatus::NewOrder | PurchaseOrderStatus::Pending)
    }
}

impl std::fmt::Display for PurchaseOrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PurchaseOrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "New order" => Ok(PurchaseOrderStatus::NewOrder),
            "Pending" => Ok(PurchaseOrderStatus::Pending),
            "Rejected" => Ok(PurchaseOrderStatus::Rejected),
            "Received" => Ok(PurchaseOrderStatus::Received),
            other => Err(format!("Unknown purchase order status: {}", other)),
        }
    }
}
