//! Common types used across the platform

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Prefixes of the human-readable identifiers (`PREFIX-XXXXXXXX`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdPrefix {
    Staff,
    Supplier,
    Customer,
    Product,
    Batch,
    StockTransaction,
    Order,
    OrderItem,
    Request,
    RequestItem,
    PurchaseOrder,
    PurchaseItem,
}

impl IdPrefix {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdPrefix::Staff => "STF",
            IdPrefix::Supplier => "SUP",
            IdPrefix::Customer => "CUS",
            IdPrefix::Product => "PROD",
            IdPrefix::Batch => "BATCH",
            IdPrefix::StockTransaction => "ST",
            IdPrefix::Order => "ORD",
            IdPrefix::OrderItem => "ITM",
            IdPrefix::Request => "REQ",
            IdPrefix::RequestItem => "RIT",
            IdPrefix::PurchaseOrder => "PO",
            IdPrefix::PurchaseItem => "POI",
        }
    }

    /// Build an identifier from a random suffix.
    ///
    /// Only the first 8 characters of the suffix are used, upper-cased.
    pub fn with_suffix(&self, suffix: &str) -> String {
        let short: String = suffix
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .take(8)
            .collect();
        format!("{}-{}", self.as_str(), short.to_ascii_uppercase())
    }
}

/// Date range for queries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Output format of report exports
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Json,
    #[default]
    Csv,
    Html,
}

impl ExportFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Json => "application/json",
            ExportFormat::Csv => "text/csv; charset=utf-8",
            ExportFormat::Html => "text/html; charset=utf-8",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
            ExportFormat::Html => "html",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_with_suffix() {
        assert_eq!(
            IdPrefix::Batch.with_suffix("3f2a9c1e-77aa-4b1c-9d1e-000000000000"),
            "BATCH-3F2A9C1E"
        );
        assert_eq!(IdPrefix::Request.with_suffix("ab-cd"), "REQ-ABCD");
    }
}
