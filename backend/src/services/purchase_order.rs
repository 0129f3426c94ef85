//! Purchase orders: raise, price, receive
//!
//! Receiving is where purchased stock enters the batch ledger and where the
//! product's average cost moves.

use rust_decimal::Decimal;
use serde::Deserialize;
use shared::{
    order_total, round_money, trim_to_null, validate_positive_quantity, validate_unit_cost,
    weighted_average_cost, IdPrefix, PurchaseItem, PurchaseOrder, PurchaseOrderStatus,
    TransactionType,
};
use sqlx::{PgConnection, PgPool};

use crate::error::{AppError, AppResult};
use crate::services::new_id;
use crate::services::stock::{
    insert_batch, insert_transaction, lock_order, lock_products, NewBatch, NewTransaction,
};

const PO_COLUMNS: &str = "po_id, po_date, supplier_id, staff_id, total_amount, status";

const PO_ITEM_COLUMNS: &str = "po_item_id, po_id, product_id, quantity, unit_price";

#[derive(Clone)]
pub struct PurchaseOrderService {
    db: PgPool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseLineInput {
    #[serde(default)]
    pub product_id: String,
    pub quantity: i32,
    pub unit_price: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePurchaseOrderInput {
    #[serde(default)]
    pub supplier_id: String,
    #[serde(default)]
    pub items: Vec<PurchaseLineInput>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricedItemInput {
    pub po_item_id: String,
    pub unit_price: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingInput {
    #[serde(default)]
    pub items: Vec<PricedItemInput>,
    #[serde(default)]
    pub reject: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceivedItemInput {
    pub po_item_id: String,
    pub quantity: i32,
    pub unit_price: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiveInput {
    #[serde(default)]
    pub items: Vec<ReceivedItemInput>,
}

/// Unit price of a priced or received line; must be positive
fn positive_price(price: Option<Decimal>) -> AppResult<Decimal> {
    let price = price.unwrap_or(Decimal::ZERO);
    validate_unit_cost(price)
        .map_err(|m| AppError::validation("unitPrice", m, "ราคาต่อหน่วยต้องมากกว่า 0"))?;
    Ok(price)
}

impl PurchaseOrderService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Purchase orders with their items, optionally only those in one status
    pub async fn list(&self, status: Option<PurchaseOrderStatus>) -> AppResult<Vec<PurchaseOrder>> {
        let orders = sqlx::query_as::<_, PurchaseOrder>(&format!(
            "SELECT {} FROM purchase_order WHERE ($1::purchase_order_status IS NULL OR status = $1) \
             ORDER BY po_date DESC",
            PO_COLUMNS
        ))
        .bind(status)
        .fetch_all(&self.db)
        .await?;

        let mut with_items = Vec::with_capacity(orders.len());
        for order in orders {
            let items = self.items(&order.po_id).await?;
            with_items.push(PurchaseOrder {
                items: Some(items),
                ..order
            });
        }
        Ok(with_items)
    }

    pub async fn get(&self, po_id: &str) -> AppResult<PurchaseOrder> {
        let order = sqlx::query_as::<_, PurchaseOrder>(&format!(
            "SELECT {} FROM purchase_order WHERE po_id = $1",
            PO_COLUMNS
        ))
        .bind(po_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Purchase order".to_string()))?;

        let items = self.items(po_id).await?;
        Ok(PurchaseOrder {
            items: Some(items),
            ..order
        })
    }

    pub async fn create(
        &self,
        staff_id: &str,
        input: CreatePurchaseOrderInput,
    ) -> AppResult<PurchaseOrder> {
        let supplier_id = trim_to_null(Some(input.supplier_id.as_str())).ok_or_else(|| {
            AppError::validation(
                "supplierId",
                "Supplier is required",
                "ต้องระบุ Supplier สำหรับใบสั่งซื้อ",
            )
        })?;
        if input.items.is_empty() {
            return Err(AppError::validation(
                "items",
                "At least one item is required",
                "ต้องมีรายการสินค้าอย่างน้อย 1 รายการ",
            ));
        }
        for item in &input.items {
            if item.product_id.trim().is_empty() {
                return Err(AppError::validation(
                    "productId",
                    "Product is required",
                    "ต้องระบุสินค้าในใบสั่งซื้อ",
                ));
            }
            validate_positive_quantity(item.quantity).map_err(|m| {
                AppError::validation("quantity", m, "จำนวนสินค้าต่อรายการต้องมากกว่า 0")
            })?;
        }

        let mut tx = self.db.begin().await?;
        let order = sqlx::query_as::<_, PurchaseOrder>(&format!(
            r#"
            INSERT INTO purchase_order (po_id, po_date, supplier_id, staff_id, total_amount, status)
            VALUES ($1, NOW(), $2, $3, 0, $4)
            RETURNING {}
            "#,
            PO_COLUMNS
        ))
        .bind(new_id(IdPrefix::PurchaseOrder))
        .bind(&supplier_id)
        .bind(staff_id)
        .bind(PurchaseOrderStatus::NewOrder)
        .fetch_one(&mut *tx)
        .await?;

        let mut items = Vec::with_capacity(input.items.len());
        for line in &input.items {
            let item = sqlx::query_as::<_, PurchaseItem>(&format!(
                r#"
                INSERT INTO purchase_item (po_item_id, po_id, product_id, quantity, unit_price)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING {}
                "#,
                PO_ITEM_COLUMNS
            ))
            .bind(new_id(IdPrefix::PurchaseItem))
            .bind(&order.po_id)
            .bind(line.product_id.trim())
            .bind(line.quantity)
            .bind(line.unit_price)
            .fetch_one(&mut *tx)
            .await?;
            items.push(item);
        }

        tx.commit().await?;
        tracing::info!(po_id = %order.po_id, supplier_id = %supplier_id, "Purchase order created");
        Ok(PurchaseOrder {
            items: Some(items),
            ..order
        })
    }

    /// Record supplier prices, or reject the order
    pub async fn update_pricing(&self, po_id: &str, input: PricingInput) -> AppResult<PurchaseOrder> {
        let mut tx = self.db.begin().await?;
        let status = lock_status(&mut tx, po_id).await?;
        if !status.can_be_priced() {
            return Err(AppError::InvalidStateTransition(format!(
                "Purchase order {} is {} and cannot be priced",
                po_id, status
            )));
        }

        if input.reject {
            sqlx::query("UPDATE purchase_order SET status = $2 WHERE po_id = $1")
                .bind(po_id)
                .bind(PurchaseOrderStatus::Rejected)
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;
            tracing::info!(po_id = %po_id, "Purchase order rejected");
            return self.get(po_id).await;
        }

        if input.items.is_empty() {
            return Err(AppError::validation(
                "items",
                "Prices are required for the items",
                "ต้องส่งข้อมูลราคาสำหรับทุกรายการ",
            ));
        }

        let mut lines = Vec::with_capacity(input.items.len());
        for priced in &input.items {
            let price = positive_price(priced.unit_price)?;
            let item = lock_item(&mut tx, po_id, &priced.po_item_id).await?;
            sqlx::query("UPDATE purchase_item SET unit_price = $2 WHERE po_item_id = $1")
                .bind(&item.po_item_id)
                .bind(round_money(price))
                .execute(&mut *tx)
                .await?;
            lines.push((item.quantity, price));
        }

        let total = order_total(lines);
        sqlx::query("UPDATE purchase_order SET total_amount = $2, status = $3 WHERE po_id = $1")
            .bind(po_id)
            .bind(total)
            .bind(PurchaseOrderStatus::Pending)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        tracing::info!(po_id = %po_id, total = %total, "Purchase order priced");
        self.get(po_id).await
    }

    /// Take delivered goods into stock
    ///
    /// Each line becomes a batch carrying the PO id and its unit cost, and the
    /// product's cost price moves to the weighted average.
    pub async fn receive(
        &self,
        po_id: &str,
        staff_id: &str,
        input: ReceiveInput,
    ) -> AppResult<PurchaseOrder> {
        if input.items.is_empty() {
            return Err(AppError::validation(
                "items",
                "At least one received item is required",
                "ต้องระบุรายการสินค้าที่รับเข้า",
            ));
        }

        let mut tx = self.db.begin().await?;
        let status = lock_status(&mut tx, po_id).await?;
        if !status.can_be_received() {
            return Err(AppError::InvalidStateTransition(format!(
                "Purchase order {} is {} and cannot be received",
                po_id, status
            )));
        }

        let item_ids = lock_order(input.items.iter().map(|r| r.po_item_id.as_str()));
        let product_ids = sqlx::query_scalar::<_, String>(
            "SELECT product_id FROM purchase_item WHERE po_id = $1 AND po_item_id = ANY($2)",
        )
        .bind(po_id)
        .bind(&item_ids)
        .fetch_all(&mut *tx)
        .await?;
        lock_products(&mut tx, product_ids.iter().map(String::as_str)).await?;

        let description = format!("Received from PO {}", po_id);
        let mut lines = Vec::with_capacity(input.items.len());
        for received in &input.items {
            let item = lock_item(&mut tx, po_id, &received.po_item_id).await?;
            let unit_cost = round_money(positive_price(received.unit_price)?);
            validate_positive_quantity(received.quantity)
                .map_err(|m| AppError::validation("quantity", m, "จำนวนที่รับต้องมากกว่า 0"))?;

            let (old_qty, old_cost) = sqlx::query_as::<_, (i32, Decimal)>(
                "SELECT quantity, cost_price FROM product WHERE product_id = $1 FOR UPDATE",
            )
            .bind(&item.product_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

            let average = weighted_average_cost(old_qty, old_cost, received.quantity, unit_cost);
            sqlx::query(
                "UPDATE product SET quantity = quantity + $2, cost_price = $3 WHERE product_id = $1",
            )
            .bind(&item.product_id)
            .bind(received.quantity)
            .bind(average)
            .execute(&mut *tx)
            .await?;

            sqlx::query("UPDATE purchase_item SET quantity = $2, unit_price = $3 WHERE po_item_id = $1")
                .bind(&item.po_item_id)
                .bind(received.quantity)
                .bind(unit_cost)
                .execute(&mut *tx)
                .await?;

            let batch_id = insert_batch(
                &mut tx,
                NewBatch {
                    product_id: &item.product_id,
                    po_id: Some(po_id),
                    quantity: received.quantity,
                    unit_cost,
                    expiry_date: None,
                },
            )
            .await?;
            insert_transaction(
                &mut tx,
                NewTransaction {
                    transaction_type: TransactionType::In,
                    product_id: &item.product_id,
                    quantity: received.quantity,
                    staff_id: Some(staff_id),
                    description: &description,
                    batch_id: Some(&batch_id),
                    reference_id: Some(po_id),
                },
            )
            .await?;

            tracing::debug!(
                po_id = %po_id,
                product_id = %item.product_id,
                quantity = received.quantity,
                average_cost = %average,
                "Line received"
            );
            lines.push((received.quantity, unit_cost));
        }

        let total = order_total(lines);
        sqlx::query("UPDATE purchase_order SET total_amount = $2, status = $3 WHERE po_id = $1")
            .bind(po_id)
            .bind(total)
            .bind(PurchaseOrderStatus::Received)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        tracing::info!(po_id = %po_id, staff_id = %staff_id, total = %total, "Purchase order received");
        self.get(po_id).await
    }

    async fn items(&self, po_id: &str) -> AppResult<Vec<PurchaseItem>> {
        let items = sqlx::query_as::<_, PurchaseItem>(&format!(
            "SELECT {} FROM purchase_item WHERE po_id = $1 ORDER BY po_item_id",
            PO_ITEM_COLUMNS
        ))
        .bind(po_id)
        .fetch_all(&self.db)
        .await?;
        Ok(items)
    }
}

async fn lock_status(conn: &mut PgConnection, po_id: &str) -> AppResult<PurchaseOrderStatus> {
    sqlx::query_scalar::<_, PurchaseOrderStatus>(
        "SELECT status FROM purchase_order WHERE po_id = $1 FOR UPDATE",
    )
    .bind(po_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound("Purchase order".to_string()))
}

/// A line of this purchase order; lines of other orders are not found
async fn lock_item(conn: &mut PgConnection, po_id: &str, po_item_id: &str) -> AppResult<PurchaseItem> {
    sqlx::query_as::<_, PurchaseItem>(&format!(
        "SELECT {} FROM purchase_item WHERE po_item_id = $1 AND po_id = $2 FOR UPDATE",
        PO_ITEM_COLUMNS
    ))
    .bind(po_item_id)
    .bind(po_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound("Purchase order item".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positive_price() {
        assert!(positive_price(Some(Decimal::new(1250, 2))).is_ok());
        assert!(positive_price(Some(Decimal::ZERO)).is_err());
        assert!(positive_price(None).is_err());
    }

    #[test]
    fn test_pricing_input_reject_only() {
        let input: PricingInput = serde_json::from_str(r#"{"reject":true}"#).unwrap();
        assert!(input.reject);
        assert!(input.items.is_empty());
    }
}
