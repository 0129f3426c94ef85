//! Product catalogue and stock level management

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{
    fifo_order, require_text, trim_to_null, validate_sell_price, validate_unit_cost, IdPrefix,
    Product, ProductBatch, TransactionType,
};
use sqlx::PgPool;

use crate::error::{AppError, AppResult};
use crate::services::new_id;
use crate::services::stock::{
    draw_from_batches, insert_batch, insert_transaction, NewBatch, NewTransaction, BATCH_COLUMNS,
};

const PRODUCT_COLUMNS: &str = "product_id, product_name, description, unit, cost_price, \
     sell_price, supplier_id, quantity, image_url, active";

const INITIAL_STOCK_NOTE: &str = "Initial stock recorded on product creation";

#[derive(Clone)]
pub struct ProductService {
    db: PgPool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductInput {
    #[serde(default)]
    pub product_name: String,
    pub description: Option<String>,
    pub unit: Option<String>,
    #[serde(default)]
    pub cost_price: Decimal,
    #[serde(default)]
    pub sell_price: Decimal,
    pub supplier_id: Option<String>,
    #[serde(default)]
    pub quantity: i32,
    pub image_url: Option<String>,
}

/// Fields left out of the body keep their stored value
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductInput {
    #[serde(default)]
    pub product_name: String,
    pub description: Option<String>,
    pub unit: Option<String>,
    pub sell_price: Option<Decimal>,
    pub supplier_id: Option<String>,
    pub image_url: Option<String>,
}

/// Signed change of on-hand quantity
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustQuantityInput {
    pub delta: i32,
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustmentResult {
    pub product: Product,
    pub delta: i32,
    pub batches_touched: Vec<String>,
}

/// Whether an opening quantity must come with a positive cost price
pub fn requires_cost_price(quantity: i32) -> bool {
    quantity > 1
}

/// Apply a details update to the stored product
pub fn apply_update(current: Product, input: UpdateProductInput) -> AppResult<Product> {
    let product_name = require_text(&input.product_name, "Product name is required")
        .map_err(|m| AppError::validation("productName", m, "กรุณาระบุชื่อสินค้า"))?;
    let sell_price = input.sell_price.unwrap_or(current.sell_price);
    validate_sell_price(sell_price)
        .map_err(|m| AppError::validation("sellPrice", m, "ราคาขายต้องไม่ติดลบ"))?;

    Ok(Product {
        product_name,
        description: trim_to_null(input.description.as_deref()).or(current.description),
        unit: trim_to_null(input.unit.as_deref()).or(current.unit),
        sell_price,
        supplier_id: trim_to_null(input.supplier_id.as_deref()).or(current.supplier_id),
        image_url: trim_to_null(input.image_url.as_deref()).or(current.image_url),
        ..current
    })
}

/// On-hand quantity after a signed adjustment
pub fn adjusted_quantity(product_id: &str, quantity: i32, delta: i32) -> AppResult<i32> {
    if delta == 0 {
        return Err(AppError::validation(
            "delta",
            "Adjustment must not be zero",
            "จำนวนที่ปรับต้องไม่เป็นศูนย์",
        ));
    }
    let adjusted = quantity.checked_add(delta).ok_or_else(|| {
        AppError::validation(
            "delta",
            "Adjustment is out of range",
            "จำนวนที่ปรับเกินขอบเขตที่รองรับ",
        )
    })?;
    if adjusted < 0 {
        return Err(shared::StockError::InsufficientStock {
            product_id: product_id.to_string(),
            requested: delta.saturating_neg(),
            available: quantity,
        }
        .into());
    }
    Ok(adjusted)
}

impl ProductService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list(&self) -> AppResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {} FROM product WHERE active = TRUE ORDER BY product_name",
            PRODUCT_COLUMNS
        ))
        .fetch_all(&self.db)
        .await?;
        Ok(products)
    }

    pub async fn get(&self, product_id: &str) -> AppResult<Product> {
        sqlx::query_as::<_, Product>(&format!(
            "SELECT {} FROM product WHERE product_id = $1",
            PRODUCT_COLUMNS
        ))
        .bind(product_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))
    }

    /// Create a product, recording its opening stock as a batch
    pub async fn create(&self, staff_id: &str, input: CreateProductInput) -> AppResult<Product> {
        let name = require_text(&input.product_name, "Product name is required")
            .map_err(|m| AppError::validation("productName", m, "กรุณาระบุชื่อสินค้า"))?;
        validate_sell_price(input.sell_price)
            .map_err(|m| AppError::validation("sellPrice", m, "ราคาขายต้องไม่ติดลบ"))?;
        let quantity = input.quantity.max(0);

        if requires_cost_price(quantity) {
            validate_unit_cost(input.cost_price).map_err(|m| {
                AppError::validation(
                    "costPrice",
                    m,
                    "ต้องระบุราคาทุนมากกว่า 0 เมื่อมีจำนวนสินค้าเริ่มต้น",
                )
            })?;
        }

        let mut tx = self.db.begin().await?;
        let product = sqlx::query_as::<_, Product>(&format!(
            r#"
            INSERT INTO product
                (product_id, product_name, description, unit, cost_price, sell_price,
                 supplier_id, quantity, image_url, active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, TRUE)
            RETURNING {}
            "#,
            PRODUCT_COLUMNS
        ))
        .bind(new_id(IdPrefix::Product))
        .bind(&name)
        .bind(trim_to_null(input.description.as_deref()))
        .bind(trim_to_null(input.unit.as_deref()))
        .bind(input.cost_price.max(Decimal::ZERO))
        .bind(input.sell_price)
        .bind(trim_to_null(input.supplier_id.as_deref()))
        .bind(quantity)
        .bind(trim_to_null(input.image_url.as_deref()))
        .fetch_one(&mut *tx)
        .await?;

        if quantity > 0 {
            let batch_id = insert_batch(
                &mut tx,
                NewBatch {
                    product_id: &product.product_id,
                    po_id: None,
                    quantity,
                    unit_cost: product.cost_price,
                    expiry_date: None,
                },
            )
            .await?;
            insert_transaction(
                &mut tx,
                NewTransaction {
                    transaction_type: TransactionType::In,
                    product_id: &product.product_id,
                    quantity,
                    staff_id: Some(staff_id),
                    description: INITIAL_STOCK_NOTE,
                    batch_id: Some(&batch_id),
                    reference_id: None,
                },
            )
            .await?;
        }

        tx.commit().await?;
        tracing::info!(product_id = %product.product_id, quantity, "Product created");
        Ok(product)
    }

    /// Update descriptive fields; quantity and cost only move through stock operations
    pub async fn update(&self, product_id: &str, input: UpdateProductInput) -> AppResult<Product> {
        let mut tx = self.db.begin().await?;
        let current = sqlx::query_as::<_, Product>(&format!(
            "SELECT {} FROM product WHERE product_id = $1 FOR UPDATE",
            PRODUCT_COLUMNS
        ))
        .bind(product_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))?;
        let updated = apply_update(current, input)?;

        let product = sqlx::query_as::<_, Product>(&format!(
            r#"
            UPDATE product
            SET product_name = $2, description = $3, unit = $4, sell_price = $5,
                supplier_id = $6, image_url = $7
            WHERE product_id = $1
            RETURNING {}
            "#,
            PRODUCT_COLUMNS
        ))
        .bind(product_id)
        .bind(&updated.product_name)
        .bind(&updated.description)
        .bind(&updated.unit)
        .bind(updated.sell_price)
        .bind(&updated.supplier_id)
        .bind(&updated.image_url)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!(product_id = %product_id, "Product details updated");
        Ok(product)
    }

    /// Hide a product from the catalogue; deactivating twice is a not-found
    pub async fn deactivate(&self, product_id: &str) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE product SET active = FALSE WHERE product_id = $1 AND active = TRUE",
        )
        .bind(product_id)
        .execute(&self.db)
        .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Product".to_string()));
        }
        tracing::info!(product_id = %product_id, "Product deactivated");
        Ok(())
    }

    /// Stock count correction
    ///
    /// A positive delta adds a batch at the current cost; a negative one draws
    /// from batches oldest first, the same way fulfillment does.
    pub async fn adjust_quantity(
        &self,
        product_id: &str,
        staff_id: &str,
        input: AdjustQuantityInput,
    ) -> AppResult<AdjustmentResult> {
        let mut tx = self.db.begin().await?;
        let (quantity, cost_price) = sqlx::query_as::<_, (i32, Decimal)>(
            "SELECT quantity, cost_price FROM product WHERE product_id = $1 FOR UPDATE",
        )
        .bind(product_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

        adjusted_quantity(product_id, quantity, input.delta)?;

        let description = match trim_to_null(input.reason.as_deref()) {
            Some(reason) => format!("Stock adjustment. Reason: {}", reason),
            None => "Stock adjustment".to_string(),
        };

        let batches_touched = if input.delta > 0 {
            let batch_id = insert_batch(
                &mut tx,
                NewBatch {
                    product_id,
                    po_id: None,
                    quantity: input.delta,
                    unit_cost: cost_price,
                    expiry_date: None,
                },
            )
            .await?;
            insert_transaction(
                &mut tx,
                NewTransaction {
                    transaction_type: TransactionType::Adjust,
                    product_id,
                    quantity: input.delta,
                    staff_id: Some(staff_id),
                    description: &description,
                    batch_id: Some(&batch_id),
                    reference_id: None,
                },
            )
            .await?;
            vec![batch_id]
        } else {
            draw_from_batches(
                &mut tx,
                product_id,
                -input.delta,
                TransactionType::Adjust,
                Some(staff_id),
                &description,
                None,
            )
            .await?
            .into_iter()
            .map(|draw| draw.batch_id)
            .collect()
        };

        let product = sqlx::query_as::<_, Product>(&format!(
            "UPDATE product SET quantity = quantity + $2 WHERE product_id = $1 RETURNING {}",
            PRODUCT_COLUMNS
        ))
        .bind(product_id)
        .bind(input.delta)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!(
            product_id = %product_id,
            delta = input.delta,
            quantity = product.quantity,
            "Stock adjusted"
        );

        Ok(AdjustmentResult {
            product,
            delta: input.delta,
            batches_touched,
        })
    }

    /// All batches of a product, newest first
    pub async fn batches(&self, product_id: &str) -> AppResult<Vec<ProductBatch>> {
        self.get(product_id).await?;
        let batches = sqlx::query_as::<_, ProductBatch>(&format!(
            "SELECT {} FROM product_batch WHERE product_id = $1 \
             ORDER BY received_date DESC NULLS LAST, batch_id DESC",
            BATCH_COLUMNS
        ))
        .bind(product_id)
        .fetch_all(&self.db)
        .await?;
        Ok(batches)
    }

    /// Batches with stock left, in the order fulfillment consumes them
    pub async fn available_batches(&self, product_id: &str) -> AppResult<Vec<ProductBatch>> {
        self.get(product_id).await?;
        let mut batches = sqlx::query_as::<_, ProductBatch>(&format!(
            "SELECT {} FROM product_batch WHERE product_id = $1 AND quantity_remaining > 0",
            BATCH_COLUMNS
        ))
        .bind(product_id)
        .fetch_all(&self.db)
        .await?;
        fifo_order(&mut batches);
        Ok(batches)
    }

    pub async fn batch(&self, product_id: &str, batch_id: &str) -> AppResult<ProductBatch> {
        sqlx::query_as::<_, ProductBatch>(&format!(
            "SELECT {} FROM product_batch WHERE batch_id = $1 AND product_id = $2",
            BATCH_COLUMNS
        ))
        .bind(batch_id)
        .bind(product_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Batch".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cost_price_threshold() {
        assert!(!requires_cost_price(0));
        assert!(!requires_cost_price(1));
        assert!(requires_cost_price(2));
    }

    fn stored_product() -> Product {
        Product {
            product_id: "PRD-1".to_string(),
            product_name: "Ball valve".to_string(),
            description: Some("Brass, 1/2 inch".to_string()),
            unit: Some("pcs".to_string()),
            cost_price: "80.00".parse().unwrap(),
            sell_price: "120.00".parse().unwrap(),
            supplier_id: Some("SUP-1".to_string()),
            quantity: 14,
            image_url: Some("https://img.example.com/valve.png".to_string()),
            active: true,
        }
    }

    #[test]
    fn test_name_only_update_keeps_other_details() {
        let input: UpdateProductInput =
            serde_json::from_str(r#"{"productName":"Valve"}"#).unwrap();
        let updated = apply_update(stored_product(), input).unwrap();

        assert_eq!(updated.product_name, "Valve");
        assert_eq!(updated.sell_price, "120.00".parse::<Decimal>().unwrap());
        assert_eq!(updated.image_url.as_deref(), Some("https://img.example.com/valve.png"));
        assert_eq!(updated.description.as_deref(), Some("Brass, 1/2 inch"));
        assert_eq!(updated.unit.as_deref(), Some("pcs"));
        assert_eq!(updated.supplier_id.as_deref(), Some("SUP-1"));
        assert_eq!(updated.quantity, 14);
    }

    #[test]
    fn test_update_replaces_given_fields() {
        let input: UpdateProductInput =
            serde_json::from_str(r#"{"productName":" Valve ","sellPrice":"99.50","unit":"box"}"#)
                .unwrap();
        let updated = apply_update(stored_product(), input).unwrap();

        assert_eq!(updated.product_name, "Valve");
        assert_eq!(updated.sell_price, "99.50".parse::<Decimal>().unwrap());
        assert_eq!(updated.unit.as_deref(), Some("box"));
    }

    #[test]
    fn test_update_rejects_blank_name_and_negative_price() {
        let blank: UpdateProductInput = serde_json::from_str(r#"{"productName":"  "}"#).unwrap();
        assert!(apply_update(stored_product(), blank).is_err());

        let negative: UpdateProductInput =
            serde_json::from_str(r#"{"productName":"Valve","sellPrice":"-1"}"#).unwrap();
        assert!(apply_update(stored_product(), negative).is_err());
    }

    #[test]
    fn test_adjusted_quantity() {
        assert_eq!(adjusted_quantity("PRD-1", 5, 3).unwrap(), 8);
        assert_eq!(adjusted_quantity("PRD-1", 5, -5).unwrap(), 0);
        assert!(matches!(
            adjusted_quantity("PRD-1", 5, 0),
            Err(AppError::Validation { .. })
        ));
        assert!(matches!(
            adjusted_quantity("PRD-1", 5, -6),
            Err(AppError::InsufficientStock(_))
        ));
    }

    #[test]
    fn test_adjusted_quantity_at_integer_bounds() {
        assert!(matches!(
            adjusted_quantity("PRD-1", 5, i32::MAX),
            Err(AppError::Validation { ref field, .. }) if field == "delta"
        ));
        assert!(matches!(
            adjusted_quantity("PRD-1", 0, i32::MIN),
            Err(AppError::InsufficientStock(_))
        ));
    }

    #[test]
    fn test_create_input_defaults() {
        let input: CreateProductInput =
            serde_json::from_str(r#"{"productName":"Cable tie"}"#).unwrap();
        assert_eq!(input.quantity, 0);
        assert_eq!(input.cost_price, Decimal::ZERO);
        assert!(input.supplier_id.is_none());
    }
}
