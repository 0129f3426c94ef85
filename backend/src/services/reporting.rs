//! Reporting service for dashboard metrics and data export
//! Exports stock movements, withdrawals, orders and purchase orders over a date range

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{round_money, DateRange, ExportFormat, StockTransaction, TransactionType};
use sqlx::PgPool;

use crate::error::{AppError, AppResult};
use crate::services::stock::TRANSACTION_COLUMNS;

/// Products at or below this quantity count as low stock
pub const DEFAULT_LOW_STOCK_THRESHOLD: i32 = 10;

/// Reporting service
#[derive(Clone)]
pub struct ReportingService {
    db: PgPool,
}

/// Dashboard metrics
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardMetrics {
    pub product_count: i64,
    pub low_stock_count: i64,
    pub stock_value: Decimal,
    pub pending_requests: i64,
    pub requests_to_fulfill: i64,
    pub open_orders: i64,
    pub open_purchase_orders: i64,
    pub transactions_today: i64,
}

/// What an export contains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExportKind {
    Transactions,
    Withdrawals,
    Orders,
    PurchaseOrders,
}

impl ExportKind {
    pub fn file_stem(&self) -> &'static str {
        match self {
            ExportKind::Transactions => "stock_transactions",
            ExportKind::Withdrawals => "withdrawals",
            ExportKind::Orders => "orders",
            ExportKind::PurchaseOrders => "purchase_orders",
        }
    }

    fn title(&self) -> &'static str {
        match self {
            ExportKind::Transactions => "Stock transactions",
            ExportKind::Withdrawals => "Stock withdrawals by product",
            ExportKind::Orders => "Sales orders",
            ExportKind::PurchaseOrders => "Purchase orders",
        }
    }
}

/// OUT movements of one product summed over the range
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalRow {
    pub product_id: String,
    pub product_name: String,
    pub unit: Option<String>,
    pub total_quantity: i64,
    pub total_amount: Decimal,
}

/// Product data needed to price withdrawals
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductCostRow {
    pub product_id: String,
    pub product_name: String,
    pub unit: Option<String>,
    pub cost_price: Decimal,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OrderExportRow {
    pub order_id: String,
    pub order_date: DateTime<Utc>,
    pub customer_name: Option<String>,
    pub status: String,
    pub item_count: i64,
    pub total_amount: Decimal,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseOrderExportRow {
    pub po_id: String,
    pub po_date: DateTime<Utc>,
    pub supplier_name: Option<String>,
    pub status: String,
    pub item_count: i64,
    pub total_amount: Decimal,
}

/// A rendered export: headers plus stringified rows
#[derive(Debug, Clone, Serialize)]
pub struct ReportTable {
    pub title: String,
    pub headers: Vec<&'static str>,
    pub rows: Vec<Vec<String>>,
}

/// A finished export ready to send
#[derive(Debug)]
pub struct ExportFile {
    pub filename: String,
    pub content_type: &'static str,
    pub body: String,
}

/// Sum OUT movements per product, priced at the product's current cost
///
/// Rows are sorted by product name. Movements of unknown products are
/// reported under their id at zero cost.
pub fn aggregate_withdrawals(
    transactions: &[StockTransaction],
    products: &[ProductCostRow],
) -> Vec<WithdrawalRow> {
    let lookup: BTreeMap<&str, &ProductCostRow> = products
        .iter()
        .map(|p| (p.product_id.as_str(), p))
        .collect();

    let mut rows: BTreeMap<&str, WithdrawalRow> = BTreeMap::new();
    for txn in transactions
        .iter()
        .filter(|t| t.transaction_type == TransactionType::Out)
    {
        let product = lookup.get(txn.product_id.as_str());
        let quantity = i64::from(txn.quantity.unsigned_abs());
        let cost = product.map(|p| p.cost_price).unwrap_or(Decimal::ZERO);

        let row = rows
            .entry(txn.product_id.as_str())
            .or_insert_with(|| WithdrawalRow {
                product_id: txn.product_id.clone(),
                product_name: product
                    .map(|p| p.product_name.clone())
                    .unwrap_or_else(|| txn.product_id.clone()),
                unit: product.and_then(|p| p.unit.clone()),
                total_quantity: 0,
                total_amount: Decimal::ZERO,
            });
        row.total_quantity += quantity;
        row.total_amount += cost * Decimal::from(quantity);
    }

    let mut rows: Vec<WithdrawalRow> = rows
        .into_values()
        .map(|mut row| {
            row.total_amount = round_money(row.total_amount);
            row
        })
        .collect();
    rows.sort_by(|a, b| a.product_name.cmp(&b.product_name));
    rows
}

/// Inclusive day range as a half-open timestamp range
fn range_bounds(range: &DateRange) -> AppResult<(DateTime<Utc>, DateTime<Utc>)> {
    let day_after = range.end.succ_opt().ok_or_else(|| {
        AppError::validation(
            "endDate",
            "End date is out of range",
            "วันที่สิ้นสุดอยู่นอกช่วงที่รองรับ",
        )
    })?;
    let start = range.start.and_time(NaiveTime::MIN).and_utc();
    let end = day_after.and_time(NaiveTime::MIN).and_utc();
    Ok((start, end))
}

pub fn validate_range(start: NaiveDate, end: NaiveDate) -> AppResult<DateRange> {
    if start > end {
        return Err(AppError::validation(
            "startDate",
            "Start date must not be after end date",
            "วันที่เริ่มต้นต้องไม่เกินวันที่สิ้นสุด",
        ));
    }
    Ok(DateRange { start, end })
}

impl ReportingService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Get dashboard metrics
    pub async fn get_dashboard_metrics(&self, low_stock_threshold: i32) -> AppResult<DashboardMetrics> {
        let (product_count, low_stock_count, stock_value): (i64, i64, Decimal) = sqlx::query_as(
            r#"
            SELECT
                COUNT(*),
                COUNT(*) FILTER (WHERE quantity <= $1),
                COALESCE(SUM(cost_price * GREATEST(quantity, 0)), 0)
            FROM product WHERE active = TRUE
            "#,
        )
        .bind(low_stock_threshold)
        .fetch_one(&self.db)
        .await?;

        let (pending_requests, requests_to_fulfill): (i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE r.status = 'Awaiting Approval'),
                COUNT(*) FILTER (WHERE r.status IN ('Approved', 'Pending') AND EXISTS (
                    SELECT 1 FROM request_item ri
                    WHERE ri.request_id = r.request_id AND ri.remaining_qty > 0))
            FROM request r
            "#,
        )
        .fetch_one(&self.db)
        .await?;

        let open_orders: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE status <> 'Closed'")
                .fetch_one(&self.db)
                .await?;

        let open_purchase_orders: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM purchase_order WHERE status IN ('New order', 'Pending')",
        )
        .fetch_one(&self.db)
        .await?;

        let transactions_today: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM stock_transaction WHERE transaction_date >= CURRENT_DATE",
        )
        .fetch_one(&self.db)
        .await?;

        Ok(DashboardMetrics {
            product_count,
            low_stock_count,
            stock_value: round_money(stock_value),
            pending_requests,
            requests_to_fulfill,
            open_orders,
            open_purchase_orders,
            transactions_today,
        })
    }

    pub async fn transactions_in_range(&self, range: &DateRange) -> AppResult<Vec<StockTransaction>> {
        let (start, end) = range_bounds(range)?;
        let rows = sqlx::query_as::<_, StockTransaction>(&format!(
            "SELECT {} FROM stock_transaction \
             WHERE transaction_date >= $1 AND transaction_date < $2 \
             ORDER BY transaction_date",
            TRANSACTION_COLUMNS
        ))
        .bind(start)
        .bind(end)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    pub async fn withdrawals(&self, range: &DateRange) -> AppResult<Vec<WithdrawalRow>> {
        let transactions = self.transactions_in_range(range).await?;
        let products = sqlx::query_as::<_, ProductCostRow>(
            "SELECT product_id, product_name, unit, cost_price FROM product",
        )
        .fetch_all(&self.db)
        .await?;
        Ok(aggregate_withdrawals(&transactions, &products))
    }

    pub async fn orders_in_range(&self, range: &DateRange) -> AppResult<Vec<OrderExportRow>> {
        let (start, end) = range_bounds(range)?;
        let rows = sqlx::query_as::<_, OrderExportRow>(
            r#"
            SELECT o.order_id, o.order_date, c.customer_name, o.status::TEXT AS status,
                   (SELECT COUNT(*) FROM order_item oi WHERE oi.order_id = o.order_id) AS item_count,
                   o.total_amount
            FROM orders o
            LEFT JOIN customer c ON c.customer_id = o.customer_id
            WHERE o.order_date >= $1 AND o.order_date < $2
            ORDER BY o.order_date
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    pub async fn purchase_orders_in_range(
        &self,
        range: &DateRange,
    ) -> AppResult<Vec<PurchaseOrderExportRow>> {
        let (start, end) = range_bounds(range)?;
        let rows = sqlx::query_as::<_, PurchaseOrderExportRow>(
            r#"
            SELECT po.po_id, po.po_date, s.supplier_name, po.status::TEXT AS status,
                   (SELECT COUNT(*) FROM purchase_item pi WHERE pi.po_id = po.po_id) AS item_count,
                   po.total_amount
            FROM purchase_order po
            LEFT JOIN supplier s ON s.supplier_id = po.supplier_id
            WHERE po.po_date >= $1 AND po.po_date < $2
            ORDER BY po.po_date
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    /// Build an export file of the given kind and format
    pub async fn export(
        &self,
        kind: ExportKind,
        format: ExportFormat,
        range: &DateRange,
    ) -> AppResult<ExportFile> {
        let title = format!("{} {} - {}", kind.title(), range.start, range.end);
        let (json, table) = match kind {
            ExportKind::Transactions => {
                let rows = self.transactions_in_range(range).await?;
                (to_json(&rows)?, transactions_table(title, &rows))
            }
            ExportKind::Withdrawals => {
                let rows = self.withdrawals(range).await?;
                (to_json(&rows)?, withdrawals_table(title, &rows))
            }
            ExportKind::Orders => {
                let rows = self.orders_in_range(range).await?;
                let table = ReportTable {
                    title,
                    headers: vec!["Order", "Date", "Customer", "Status", "Items", "Total"],
                    rows: rows
                        .iter()
                        .map(|r| {
                            vec![
                                r.order_id.clone(),
                                r.order_date.to_rfc3339(),
                                r.customer_name.clone().unwrap_or_default(),
                                r.status.clone(),
                                r.item_count.to_string(),
                                r.total_amount.to_string(),
                            ]
                        })
                        .collect(),
                };
                (to_json(&rows)?, table)
            }
            ExportKind::PurchaseOrders => {
                let rows = self.purchase_orders_in_range(range).await?;
                let table = ReportTable {
                    title,
                    headers: vec!["Purchase order", "Date", "Supplier", "Status", "Items", "Total"],
                    rows: rows
                        .iter()
                        .map(|r| {
                            vec![
                                r.po_id.clone(),
                                r.po_date.to_rfc3339(),
                                r.supplier_name.clone().unwrap_or_default(),
                                r.status.clone(),
                                r.item_count.to_string(),
                                r.total_amount.to_string(),
                            ]
                        })
                        .collect(),
                };
                (to_json(&rows)?, table)
            }
        };

        let body = match format {
            ExportFormat::Json => json,
            ExportFormat::Csv => Self::export_to_csv(&table)?,
            ExportFormat::Html => export_to_html(&table),
        };

        tracing::info!(
            kind = kind.file_stem(),
            format = format.extension(),
            rows = table.rows.len(),
            "Report exported"
        );

        Ok(ExportFile {
            filename: format!(
                "{}_{}_{}.{}",
                kind.file_stem(),
                range.start,
                range.end,
                format.extension()
            ),
            content_type: format.content_type(),
            body,
        })
    }

    /// Export report data as CSV
    pub fn export_to_csv(table: &ReportTable) -> AppResult<String> {
        let mut wtr = csv::Writer::from_writer(vec![]);
        wtr.write_record(&table.headers)
            .map_err(|e| AppError::Internal(format!("CSV serialization error: {}", e)))?;
        for row in &table.rows {
            wtr.write_record(row)
                .map_err(|e| AppError::Internal(format!("CSV serialization error: {}", e)))?;
        }
        let bytes = wtr
            .into_inner()
            .map_err(|e| AppError::Internal(format!("CSV writer error: {}", e)))?;
        String::from_utf8(bytes)
            .map_err(|e| AppError::Internal(format!("UTF-8 conversion error: {}", e)))
    }
}

fn to_json<T: Serialize>(rows: &[T]) -> AppResult<String> {
    serde_json::to_string(rows)
        .map_err(|e| AppError::Internal(format!("JSON serialization error: {}", e)))
}

fn transactions_table(title: String, rows: &[StockTransaction]) -> ReportTable {
    ReportTable {
        title,
        headers: vec![
            "Transaction", "Date", "Type", "Product", "Quantity", "Staff", "Batch", "Reference",
            "Description",
        ],
        rows: rows
            .iter()
            .map(|t| {
                vec![
                    t.transaction_id.clone(),
                    t.transaction_date.to_rfc3339(),
                    t.transaction_type.to_string(),
                    t.product_id.clone(),
                    t.quantity.to_string(),
                    t.staff_id.clone().unwrap_or_default(),
                    t.batch_id.clone().unwrap_or_default(),
                    t.reference_id.clone().unwrap_or_default(),
                    t.description.clone().unwrap_or_default(),
                ]
            })
            .collect(),
    }
}

fn withdrawals_table(title: String, rows: &[WithdrawalRow]) -> ReportTable {
    ReportTable {
        title,
        headers: vec!["#", "Product", "Name", "Unit", "Quantity", "Amount"],
        rows: rows
            .iter()
            .enumerate()
            .map(|(i, r)| {
                vec![
                    (i + 1).to_string(),
                    r.product_id.clone(),
                    r.product_name.clone(),
                    r.unit.clone().unwrap_or_else(|| "-".to_string()),
                    r.total_quantity.to_string(),
                    format!("{:.2}", r.total_amount),
                ]
            })
            .collect(),
    }
}

pub fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// Printable HTML document with every cell escaped
pub fn export_to_html(table: &ReportTable) -> String {
    let title = escape_html(&table.title);
    let head: String = table
        .headers
        .iter()
        .map(|h| format!("<th>{}</th>", escape_html(h)))
        .collect();
    let body: String = table
        .rows
        .iter()
        .map(|row| {
            let cells: String = row
                .iter()
                .map(|cell| format!("<td>{}</td>", escape_html(cell)))
                .collect();
            format!("<tr>{}</tr>", cells)
        })
        .collect();

    format!(
        "<!DOCTYPE html>\n<html lang=\"th\">\n<head>\n<meta charset=\"utf-8\" />\n\
         <title>{title}</title>\n<style>\n\
         body {{ font-family: 'Sarabun', 'Prompt', sans-serif; margin: 32px; }}\n\
         table {{ width: 100%; border-collapse: collapse; }}\n\
         th, td {{ border: 1px solid #cbd5f5; padding: 8px 10px; font-size: 12px; text-align: left; }}\n\
         </style>\n</head>\n<body>\n<h1>{title}</h1>\n<p>Rows: {count}</p>\n\
         <table>\n<thead><tr>{head}</tr></thead>\n<tbody>{body}</tbody>\n</table>\n</body>\n</html>\n",
        title = title,
        count = table.rows.len(),
        head = head,
        body = body,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn txn(product_id: &str, kind: TransactionType, quantity: i32) -> StockTransaction {
        StockTransaction {
            transaction_id: format!("ST-{}{}", product_id, quantity),
            transaction_date: Utc::now(),
            transaction_type: kind,
            product_id: product_id.to_string(),
            quantity,
            staff_id: None,
            description: None,
            batch_id: None,
            reference_id: None,
        }
    }

    fn product(id: &str, name: &str, cost: &str) -> ProductCostRow {
        ProductCostRow {
            product_id: id.to_string(),
            product_name: name.to_string(),
            unit: Some("pcs".to_string()),
            cost_price: cost.parse().unwrap(),
        }
    }

    #[test]
    fn test_aggregate_withdrawals_only_counts_out() {
        let transactions = vec![
            txn("P1", TransactionType::Out, 3),
            txn("P1", TransactionType::In, 50),
            txn("P2", TransactionType::Out, 2),
            txn("P1", TransactionType::Out, 4),
            txn("P2", TransactionType::Adjust, -1),
        ];
        let products = vec![product("P1", "Valve", "12.50"), product("P2", "Anchor", "3.00")];

        let rows = aggregate_withdrawals(&transactions, &products);
        assert_eq!(rows.len(), 2);
        // Sorted by name
        assert_eq!(rows[0].product_name, "Anchor");
        assert_eq!(rows[0].total_quantity, 2);
        assert_eq!(rows[0].total_amount, "6.00".parse::<Decimal>().unwrap());
        assert_eq!(rows[1].total_quantity, 7);
        assert_eq!(rows[1].total_amount, "87.50".parse::<Decimal>().unwrap());
    }

    #[test]
    fn test_aggregate_withdrawals_unknown_product() {
        let rows = aggregate_withdrawals(&[txn("GONE", TransactionType::Out, 5)], &[]);
        assert_eq!(rows[0].product_name, "GONE");
        assert_eq!(rows[0].total_amount, Decimal::ZERO);
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<b>"Tom" & 'Jerry'</b>"#),
            "&lt;b&gt;&quot;Tom&quot; &amp; &#39;Jerry&#39;&lt;/b&gt;"
        );
    }

    #[test]
    fn test_html_export_escapes_cells() {
        let table = ReportTable {
            title: "Report <1>".to_string(),
            headers: vec!["Name"],
            rows: vec![vec!["<script>".to_string()]],
        };
        let html = export_to_html(&table);
        assert!(html.contains("<td>&lt;script&gt;</td>"));
        assert!(html.contains("<title>Report &lt;1&gt;</title>"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn test_csv_export_has_header_row() {
        let table = ReportTable {
            title: "t".to_string(),
            headers: vec!["Product", "Quantity"],
            rows: vec![vec!["Cable, 2m".to_string(), "4".to_string()]],
        };
        let csv = ReportingService::export_to_csv(&table).unwrap();
        assert_eq!(csv, "Product,Quantity\n\"Cable, 2m\",4\n");
    }

    #[test]
    fn test_range_bounds_cover_whole_end_day() {
        let range = validate_range(
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
        )
        .unwrap();
        let (start, end) = range_bounds(&range).unwrap();
        assert_eq!(start.to_rfc3339(), "2024-03-01T00:00:00+00:00");
        assert_eq!(end.to_rfc3339(), "2024-04-01T00:00:00+00:00");
    }

    #[test]
    fn test_range_ending_on_last_supported_day_is_rejected() {
        let end: NaiveDate = serde_json::from_str("\"+262142-12-31\"").unwrap();
        let range = validate_range(NaiveDate::MAX, end).unwrap();
        assert!(matches!(
            range_bounds(&range),
            Err(AppError::Validation { ref field, .. }) if field == "endDate"
        ));
    }

    #[test]
    fn test_reversed_range_is_rejected() {
        assert!(validate_range(
            NaiveDate::from_ymd_opt(2024, 3, 2).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        )
        .is_err());
    }
}
