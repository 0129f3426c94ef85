//! Product and stock batch models

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A product kept in stock
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub product_id: String,
    pub product_name: String,
    pub description: Option<String>,
    pub unit: Option<String>,
    /// Weighted average cost of the units on hand
    pub cost_price: Decimal,
    pub sell_price: Decimal,
    pub supplier_id: Option<String>,
    /// Total units on hand across all batches
    pub quantity: i32,
    pub image_url: Option<String>,
    pub active: bool,
}

/// A discrete lot of a product received at a point in time
///
/// Batches are the unit of stock tracking finer than the product total:
/// each carries its own remaining quantity, cost and optional expiry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct ProductBatch {
    pub batch_id: String,
    pub product_id: String,
    #[serde(default)]
    pub po_id: Option<String>,
    #[serde(default)]
    pub received_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub quantity_in: i32,
    pub quantity_remaining: i32,
    #[serde(default)]
    pub unit_cost: Option<Decimal>,
    #[serde(default)]
    pub expiry_date: Option<NaiveDate>,
}
