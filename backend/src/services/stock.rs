//! Stock movements: stock-in, FIFO fulfillment of requests, and the
//! transaction ledger
//!
//! Every mutation runs inside one database transaction. Batch rows are
//! locked before the allocation planner runs, so two fulfillments of the
//! same product serialize instead of both drawing from the same batch.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{
    check_fulfillment, fifo_order, plan_batch_allocation, trim_to_null, IdPrefix, ProductBatch,
    Request, RequestItem, RequestStatus, StockTransaction, TransactionType,
};
use sqlx::{PgConnection, PgPool};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::new_id;

pub(crate) const BATCH_COLUMNS: &str = "batch_id, product_id, po_id, received_date, quantity_in, \
     quantity_remaining, unit_cost, expiry_date";

pub(crate) const TRANSACTION_COLUMNS: &str = "transaction_id, transaction_date, transaction_type, \
     product_id, quantity, staff_id, description, batch_id, reference_id";

const REQUEST_COLUMNS: &str = "request_id, request_date, status, order_id, customer_id, \
     staff_id, description, approved_by, approved_date";

const REQUEST_ITEM_COLUMNS: &str =
    "request_item_id, request_id, product_id, quantity, fulfilled_qty, remaining_qty";

#[derive(Clone)]
pub struct StockService {
    db: PgPool,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct StockInInput {
    #[validate(length(min = 1))]
    pub product_id: String,
    #[validate(range(min = 1))]
    pub quantity: i32,
    pub supplier_id: Option<String>,
    pub note: Option<String>,
    pub expiry_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FulfillItemInput {
    pub request_item_id: String,
    #[serde(alias = "fulfillQty")]
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FulfillRequestInput {
    pub request_id: String,
    pub items: Vec<FulfillItemInput>,
}

/// Result of a stock-in
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockInReceipt {
    pub product_id: String,
    pub batch_id: String,
    pub transaction_id: String,
    pub quantity: i32,
    pub new_quantity: i32,
}

/// One batch draw, planned or applied
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchDraw {
    pub batch_id: String,
    pub received_date: Option<DateTime<Utc>>,
    pub expiry_date: Option<NaiveDate>,
    pub unit_cost: Option<Decimal>,
    pub take: i32,
    pub remaining_after: i32,
}

/// Read-only FIFO plan for a product
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationPreview {
    pub product_id: String,
    pub quantity: i32,
    pub allocations: Vec<BatchDraw>,
    pub shortfall: i32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemFulfillment {
    pub request_id: String,
    pub request_item_id: String,
    pub product_id: String,
    pub quantity: i32,
    pub draws: Vec<BatchDraw>,
}

/// A stock transaction row about to be written
pub(crate) struct NewTransaction<'a> {
    pub transaction_type: TransactionType,
    pub product_id: &'a str,
    pub quantity: i32,
    pub staff_id: Option<&'a str>,
    pub description: &'a str,
    pub batch_id: Option<&'a str>,
    pub reference_id: Option<&'a str>,
}

/// A batch row about to be written
pub(crate) struct NewBatch<'a> {
    pub product_id: &'a str,
    pub po_id: Option<&'a str>,
    pub quantity: i32,
    pub unit_cost: Decimal,
    pub expiry_date: Option<NaiveDate>,
}

/// Description written on stock-in transactions
pub fn stock_in_description(supplier_id: Option<&str>, note: Option<&str>) -> String {
    let note = trim_to_null(note).unwrap_or_else(|| "-".to_string());
    match trim_to_null(supplier_id) {
        Some(supplier_id) => format!("Stock-In from Supplier ID {}. Note: {}", supplier_id, note),
        None => format!("Stock-In. Note: {}", note),
    }
}

impl StockService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Receive stock outside of a purchase order
    pub async fn add_stock_in(&self, staff_id: &str, input: StockInInput) -> AppResult<StockInReceipt> {
        input.validate()?;
        let mut tx = self.db.begin().await?;

        let new_quantity = sqlx::query_scalar::<_, i32>(
            "UPDATE product SET quantity = quantity + $2 WHERE product_id = $1 RETURNING quantity",
        )
        .bind(&input.product_id)
        .bind(input.quantity)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

        let batch_id = insert_batch(
            &mut tx,
            NewBatch {
                product_id: &input.product_id,
                po_id: None,
                quantity: input.quantity,
                unit_cost: Decimal::ZERO,
                expiry_date: input.expiry_date,
            },
        )
        .await?;

        let description =
            stock_in_description(input.supplier_id.as_deref(), input.note.as_deref());
        let transaction_id = insert_transaction(
            &mut tx,
            NewTransaction {
                transaction_type: TransactionType::In,
                product_id: &input.product_id,
                quantity: input.quantity,
                staff_id: Some(staff_id),
                description: &description,
                batch_id: Some(&batch_id),
                reference_id: None,
            },
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            product_id = %input.product_id,
            quantity = input.quantity,
            batch_id = %batch_id,
            "Stock received"
        );

        Ok(StockInReceipt {
            product_id: input.product_id,
            batch_id,
            transaction_id,
            quantity: input.quantity,
            new_quantity,
        })
    }

    /// Plan a FIFO draw without touching stock
    pub async fn preview_allocation(
        &self,
        product_id: &str,
        quantity: i32,
    ) -> AppResult<AllocationPreview> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM product WHERE product_id = $1)",
        )
        .bind(product_id)
        .fetch_one(&self.db)
        .await?;
        if !exists {
            return Err(AppError::NotFound("Product".to_string()));
        }

        let mut batches = sqlx::query_as::<_, ProductBatch>(&format!(
            "SELECT {} FROM product_batch WHERE product_id = $1 AND quantity_remaining > 0",
            BATCH_COLUMNS
        ))
        .bind(product_id)
        .fetch_all(&self.db)
        .await?;
        fifo_order(&mut batches);

        let plan = plan_batch_allocation(&batches, quantity);
        Ok(AllocationPreview {
            product_id: product_id.to_string(),
            quantity,
            allocations: plan
                .allocations
                .iter()
                .map(|a| draw_of(a.batch, a.take, a.remaining_after))
                .collect(),
            shortfall: plan.shortfall,
        })
    }

    /// Fulfill one request item, drawing from batches oldest first
    pub async fn fulfill_item(
        &self,
        staff_id: &str,
        input: FulfillItemInput,
    ) -> AppResult<ItemFulfillment> {
        let mut tx = self.db.begin().await?;
        let result =
            fulfill_in_tx(&mut tx, &input.request_item_id, input.quantity, staff_id, None).await?;
        tx.commit().await?;
        Ok(result)
    }

    /// Fulfill several items of one request; either every line applies or none
    pub async fn fulfill_request(
        &self,
        staff_id: &str,
        input: FulfillRequestInput,
    ) -> AppResult<Vec<ItemFulfillment>> {
        if input.items.is_empty() {
            return Err(AppError::validation(
                "items",
                "At least one item is required",
                "ต้องระบุรายการอย่างน้อย 1 รายการ",
            ));
        }

        let mut tx = self.db.begin().await?;
        // Items, then the request, then products in id order; the per-line
        // locks below are then re-locks of rows this transaction holds
        let item_ids = lock_order(input.items.iter().map(|l| l.request_item_id.as_str()));
        let product_ids = sqlx::query_scalar::<_, String>(
            "SELECT product_id FROM request_item WHERE request_item_id = ANY($1) \
             ORDER BY request_item_id FOR UPDATE",
        )
        .bind(&item_ids)
        .fetch_all(&mut *tx)
        .await?;
        sqlx::query("SELECT 1 FROM request WHERE request_id = $1 FOR UPDATE")
            .bind(&input.request_id)
            .fetch_optional(&mut *tx)
            .await?;
        lock_products(&mut tx, product_ids.iter().map(String::as_str)).await?;

        let mut results = Vec::with_capacity(input.items.len());
        for line in &input.items {
            let result = fulfill_in_tx(
                &mut tx,
                &line.request_item_id,
                line.quantity,
                staff_id,
                Some(&input.request_id),
            )
            .await?;
            results.push(result);
        }
        tx.commit().await?;

        tracing::info!(
            request_id = %input.request_id,
            lines = results.len(),
            "Request fulfilled"
        );
        Ok(results)
    }

    /// Requests the warehouse still has to serve, with their items
    pub async fn approved_requests(&self) -> AppResult<Vec<Request>> {
        let mut requests = sqlx::query_as::<_, Request>(&format!(
            r#"
            SELECT {} FROM request r
            WHERE r.status IN ('Approved', 'Pending')
              AND EXISTS (SELECT 1 FROM request_item ri
                          WHERE ri.request_id = r.request_id AND ri.remaining_qty > 0)
            ORDER BY r.request_date
            "#,
            REQUEST_COLUMNS
        ))
        .fetch_all(&self.db)
        .await?;

        for request in &mut requests {
            let items = sqlx::query_as::<_, RequestItem>(&format!(
                "SELECT {} FROM request_item WHERE request_id = $1 ORDER BY request_item_id",
                REQUEST_ITEM_COLUMNS
            ))
            .bind(&request.request_id)
            .fetch_all(&self.db)
            .await?;
            request.items = Some(items);
        }
        Ok(requests)
    }

    /// Full ledger, newest first
    pub async fn list_transactions(&self) -> AppResult<Vec<StockTransaction>> {
        let transactions = sqlx::query_as::<_, StockTransaction>(&format!(
            "SELECT {} FROM stock_transaction ORDER BY transaction_date DESC",
            TRANSACTION_COLUMNS
        ))
        .fetch_all(&self.db)
        .await?;
        Ok(transactions)
    }

    /// Movements caused by one request or purchase order
    pub async fn transactions_for_reference(
        &self,
        reference_id: &str,
    ) -> AppResult<Vec<StockTransaction>> {
        let transactions = sqlx::query_as::<_, StockTransaction>(&format!(
            "SELECT {} FROM stock_transaction WHERE reference_id = $1 ORDER BY transaction_date",
            TRANSACTION_COLUMNS
        ))
        .bind(reference_id)
        .fetch_all(&self.db)
        .await?;
        Ok(transactions)
    }
}

/// Sorted, de-duplicated ids; rows locked in this order cannot deadlock
/// against another transaction doing the same
pub(crate) fn lock_order<'a>(ids: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut ids: Vec<String> = ids.into_iter().map(str::to_string).collect();
    ids.sort();
    ids.dedup();
    ids
}

/// Lock product rows ahead of multi-line stock changes
pub(crate) async fn lock_products<'a>(
    conn: &mut PgConnection,
    product_ids: impl IntoIterator<Item = &'a str>,
) -> AppResult<()> {
    let ids = lock_order(product_ids);
    sqlx::query("SELECT 1 FROM product WHERE product_id = ANY($1) ORDER BY product_id FOR UPDATE")
        .bind(&ids)
        .fetch_all(&mut *conn)
        .await?;
    Ok(())
}

async fn fulfill_in_tx(
    conn: &mut PgConnection,
    request_item_id: &str,
    quantity: i32,
    staff_id: &str,
    expected_request: Option<&str>,
) -> AppResult<ItemFulfillment> {
    let item = sqlx::query_as::<_, RequestItem>(&format!(
        "SELECT {} FROM request_item WHERE request_item_id = $1 FOR UPDATE",
        REQUEST_ITEM_COLUMNS
    ))
    .bind(request_item_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound("Request item".to_string()))?;

    if let Some(expected) = expected_request {
        if item.request_id != expected {
            return Err(AppError::validation(
                "requestItemId",
                "Item does not belong to the request",
                "รายการนี้ไม่ได้อยู่ในคำขอเบิกที่ระบุ",
            ));
        }
    }

    let (status, order_id) = sqlx::query_as::<_, (RequestStatus, Option<String>)>(
        "SELECT status, order_id FROM request WHERE request_id = $1 FOR UPDATE",
    )
    .bind(&item.request_id)
    .fetch_one(&mut *conn)
    .await?;
    if !status.accepts_fulfillment() {
        return Err(AppError::InvalidStateTransition(format!(
            "Request {} is {} and cannot be fulfilled",
            item.request_id, status
        )));
    }

    let product_stock = sqlx::query_scalar::<_, i32>(
        "SELECT quantity FROM product WHERE product_id = $1 FOR UPDATE",
    )
    .bind(&item.product_id)
    .fetch_one(&mut *conn)
    .await?;
    check_fulfillment(&item.product_id, quantity, item.remaining_qty, product_stock)?;

    let description = format!("Fulfill Request ID {}", item.request_id);
    let draws = draw_from_batches(
        conn,
        &item.product_id,
        quantity,
        TransactionType::Out,
        Some(staff_id),
        &description,
        Some(&item.request_id),
    )
    .await?;

    sqlx::query("UPDATE request_item SET fulfilled_qty = fulfilled_qty + $2 WHERE request_item_id = $1")
        .bind(request_item_id)
        .bind(quantity)
        .execute(&mut *conn)
        .await?;

    sqlx::query("UPDATE product SET quantity = quantity - $2 WHERE product_id = $1")
        .bind(&item.product_id)
        .bind(quantity)
        .execute(&mut *conn)
        .await?;

    sqlx::query("UPDATE request SET status = $2 WHERE request_id = $1")
        .bind(&item.request_id)
        .bind(RequestStatus::Pending)
        .execute(&mut *conn)
        .await?;

    if let Some(order_id) = &order_id {
        sqlx::query(
            r#"
            UPDATE order_item SET fulfilled_qty = fulfilled_qty + $3
            WHERE order_item_id = (
                SELECT order_item_id FROM order_item
                WHERE order_id = $1 AND product_id = $2
                ORDER BY (quantity - fulfilled_qty) DESC, order_item_id
                LIMIT 1
            )
            "#,
        )
        .bind(order_id)
        .bind(&item.product_id)
        .bind(quantity)
        .execute(&mut *conn)
        .await?;

        sqlx::query("UPDATE orders SET status = 'Pending' WHERE order_id = $1 AND status <> 'Closed'")
            .bind(order_id)
            .execute(&mut *conn)
            .await?;
    }

    tracing::info!(
        request_id = %item.request_id,
        request_item_id = %request_item_id,
        product_id = %item.product_id,
        quantity,
        batches = draws.len(),
        "Request item fulfilled"
    );

    Ok(ItemFulfillment {
        request_id: item.request_id,
        request_item_id: request_item_id.to_string(),
        product_id: item.product_id,
        quantity,
        draws,
    })
}

/// Lock a product's available batches and take `quantity` units oldest first
///
/// Writes one ledger row per batch touched. Fails without side effects on
/// the batches when they cannot cover the whole quantity.
pub(crate) async fn draw_from_batches(
    conn: &mut PgConnection,
    product_id: &str,
    quantity: i32,
    transaction_type: TransactionType,
    staff_id: Option<&str>,
    description: &str,
    reference_id: Option<&str>,
) -> AppResult<Vec<BatchDraw>> {
    // Lock in id order so concurrent draws cannot deadlock
    let mut batches = sqlx::query_as::<_, ProductBatch>(&format!(
        r#"
        SELECT {} FROM product_batch
        WHERE product_id = $1 AND quantity_remaining > 0
        ORDER BY batch_id
        FOR UPDATE
        "#,
        BATCH_COLUMNS
    ))
    .bind(product_id)
    .fetch_all(&mut *conn)
    .await?;
    fifo_order(&mut batches);

    let plan = plan_batch_allocation(&batches, quantity);
    if !plan.is_satisfied() {
        tracing::warn!(
            product_id = %product_id,
            requested = quantity,
            shortfall = plan.shortfall,
            "Batches cannot cover the draw"
        );
        return Err(AppError::InsufficientStock(format!(
            "Batches of product {} are short by {} units",
            product_id, plan.shortfall
        )));
    }

    let mut draws = Vec::with_capacity(plan.allocations.len());
    for allocation in &plan.allocations {
        let batch = allocation.batch;
        sqlx::query("UPDATE product_batch SET quantity_remaining = $2 WHERE batch_id = $1")
            .bind(&batch.batch_id)
            .bind(allocation.remaining_after)
            .execute(&mut *conn)
            .await?;

        insert_transaction(
            conn,
            NewTransaction {
                transaction_type,
                product_id,
                quantity: allocation.take,
                staff_id,
                description,
                batch_id: Some(&batch.batch_id),
                reference_id,
            },
        )
        .await?;

        draws.push(draw_of(batch, allocation.take, allocation.remaining_after));
    }
    Ok(draws)
}

pub(crate) async fn insert_batch(conn: &mut PgConnection, batch: NewBatch<'_>) -> AppResult<String> {
    let batch_id = new_id(IdPrefix::Batch);
    sqlx::query(
        r#"
        INSERT INTO product_batch
            (batch_id, product_id, po_id, received_date, quantity_in, quantity_remaining, unit_cost, expiry_date)
        VALUES ($1, $2, $3, NOW(), $4, $4, $5, $6)
        "#,
    )
    .bind(&batch_id)
    .bind(batch.product_id)
    .bind(batch.po_id)
    .bind(batch.quantity)
    .bind(batch.unit_cost)
    .bind(batch.expiry_date)
    .execute(&mut *conn)
    .await?;
    Ok(batch_id)
}

pub(crate) async fn insert_transaction(
    conn: &mut PgConnection,
    txn: NewTransaction<'_>,
) -> AppResult<String> {
    let transaction_id = new_id(IdPrefix::StockTransaction);
    sqlx::query(
        r#"
        INSERT INTO stock_transaction
            (transaction_id, transaction_date, transaction_type, product_id, quantity, staff_id,
             description, batch_id, reference_id)
        VALUES ($1, NOW(), $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(&transaction_id)
    .bind(txn.transaction_type)
    .bind(txn.product_id)
    .bind(txn.quantity)
    .bind(txn.staff_id)
    .bind(txn.description)
    .bind(txn.batch_id)
    .bind(txn.reference_id)
    .execute(&mut *conn)
    .await?;
    Ok(transaction_id)
}

fn draw_of(batch: &ProductBatch, take: i32, remaining_after: i32) -> BatchDraw {
    BatchDraw {
        batch_id: batch.batch_id.clone(),
        received_date: batch.received_date,
        expiry_date: batch.expiry_date,
        unit_cost: batch.unit_cost,
        take,
        remaining_after,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stock_in_description() {
        assert_eq!(
            stock_in_description(Some("SUP-1A2B3C4D"), Some("pallet 3")),
            "Stock-In from Supplier ID SUP-1A2B3C4D. Note: pallet 3"
        );
        assert_eq!(stock_in_description(None, None), "Stock-In. Note: -");
        assert_eq!(stock_in_description(Some("  "), Some(" ")), "Stock-In. Note: -");
    }

    #[test]
    fn test_fulfill_input_accepts_legacy_field() {
        let input: FulfillItemInput =
            serde_json::from_str(r#"{"requestItemId":"RIT-1","fulfillQty":4}"#).unwrap();
        assert_eq!(input.quantity, 4);
    }

    #[test]
    fn test_lock_order_is_independent_of_line_order() {
        let forward = lock_order(["PRD-00000001", "PRD-00000002"]);
        let reversed = lock_order(["PRD-00000002", "PRD-00000001", "PRD-00000002"]);
        assert_eq!(forward, vec!["PRD-00000001", "PRD-00000002"]);
        assert_eq!(forward, reversed);
    }
}
