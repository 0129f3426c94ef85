//! Sales orders

use rust_decimal::Decimal;
use serde::Deserialize;
use shared::{
    line_total, order_total, trim_to_null, validate_positive_quantity, IdPrefix, Order, OrderItem,
    OrderStatus,
};
use sqlx::PgPool;

use crate::error::{AppError, AppResult};
use crate::services::new_id;

const ORDER_COLUMNS: &str = "order_id, order_date, total_amount, status, customer_id, staff_id";

const ORDER_ITEM_COLUMNS: &str = "order_item_id, order_id, product_id, quantity, unit_price, \
     line_total, fulfilled_qty, remaining_qty";

#[derive(Clone)]
pub struct OrderService {
    db: PgPool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineInput {
    pub product_id: String,
    pub quantity: i32,
    /// Defaults to the product's current sell price
    pub unit_price: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderInput {
    pub customer_id: Option<String>,
    #[serde(default)]
    pub items: Vec<OrderLineInput>,
}

impl OrderService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Record a confirmed order with priced lines
    pub async fn create(&self, staff_id: &str, input: CreateOrderInput) -> AppResult<Order> {
        if input.items.is_empty() {
            return Err(AppError::validation(
                "items",
                "At least one item is required",
                "ต้องระบุรายการสินค้าอย่างน้อย 1 รายการ",
            ));
        }

        let mut tx = self.db.begin().await?;
        let mut priced = Vec::with_capacity(input.items.len());
        for line in &input.items {
            validate_positive_quantity(line.quantity)
                .map_err(|m| AppError::validation("quantity", m, "จำนวนต้องมากกว่า 0"))?;
            let sell_price = sqlx::query_scalar::<_, Decimal>(
                "SELECT sell_price FROM product WHERE product_id = $1 AND active = TRUE",
            )
            .bind(line.product_id.trim())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Product {}", line.product_id)))?;

            let unit_price = line.unit_price.unwrap_or(sell_price);
            if unit_price < Decimal::ZERO {
                return Err(AppError::validation(
                    "unitPrice",
                    "Unit price must not be negative",
                    "ราคาต่อหน่วยต้องไม่ติดลบ",
                ));
            }
            priced.push((line.product_id.trim(), line.quantity, unit_price));
        }

        let total = order_total(priced.iter().map(|(_, qty, price)| (*qty, *price)));
        let order = sqlx::query_as::<_, Order>(&format!(
            r#"
            INSERT INTO orders (order_id, order_date, total_amount, status, customer_id, staff_id)
            VALUES ($1, NOW(), $2, $3, $4, $5)
            RETURNING {}
            "#,
            ORDER_COLUMNS
        ))
        .bind(new_id(IdPrefix::Order))
        .bind(total)
        .bind(OrderStatus::Confirmed)
        .bind(trim_to_null(input.customer_id.as_deref()))
        .bind(staff_id)
        .fetch_one(&mut *tx)
        .await?;

        let mut items = Vec::with_capacity(priced.len());
        for (product_id, quantity, unit_price) in priced {
            let item = sqlx::query_as::<_, OrderItem>(&format!(
                r#"
                INSERT INTO order_item (order_item_id, order_id, product_id, quantity, unit_price, line_total)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING {}
                "#,
                ORDER_ITEM_COLUMNS
            ))
            .bind(new_id(IdPrefix::OrderItem))
            .bind(&order.order_id)
            .bind(product_id)
            .bind(quantity)
            .bind(unit_price)
            .bind(line_total(quantity, unit_price))
            .fetch_one(&mut *tx)
            .await?;
            items.push(item);
        }

        tx.commit().await?;
        tracing::info!(order_id = %order.order_id, total = %total, "Order created");
        Ok(Order {
            items: Some(items),
            ..order
        })
    }

    pub async fn list(&self) -> AppResult<Vec<Order>> {
        self.query_orders("TRUE").await
    }

    /// Orders requests can still be raised against
    pub async fn confirmed(&self) -> AppResult<Vec<Order>> {
        self.query_orders("o.status = 'Confirmed'").await
    }

    /// Orders in progress whose every line has been delivered
    pub async fn ready_to_close(&self) -> AppResult<Vec<Order>> {
        self.query_orders(
            "o.status = 'Pending' AND NOT EXISTS (SELECT 1 FROM order_item oi \
             WHERE oi.order_id = o.order_id AND oi.remaining_qty > 0)",
        )
        .await
    }

    pub async fn items(&self, order_id: &str) -> AppResult<Vec<OrderItem>> {
        let items = sqlx::query_as::<_, OrderItem>(&format!(
            "SELECT {} FROM order_item WHERE order_id = $1 ORDER BY order_item_id",
            ORDER_ITEM_COLUMNS
        ))
        .bind(order_id)
        .fetch_all(&self.db)
        .await?;
        Ok(items)
    }

    /// Close an order once none of its requests are still open
    pub async fn close(&self, order_id: &str, staff_id: &str) -> AppResult<Order> {
        let mut tx = self.db.begin().await?;
        let status = sqlx::query_scalar::<_, OrderStatus>(
            "SELECT status FROM orders WHERE order_id = $1 FOR UPDATE",
        )
        .bind(order_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Order".to_string()))?;

        if status == OrderStatus::Closed {
            return Err(AppError::InvalidStateTransition(format!(
                "Order {} is already closed",
                order_id
            )));
        }

        let open_requests = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(1) FROM request WHERE order_id = $1 AND status <> 'Closed'",
        )
        .bind(order_id)
        .fetch_one(&mut *tx)
        .await?;
        if open_requests > 0 {
            tracing::warn!(order_id = %order_id, open_requests, "Close refused, requests open");
            return Err(AppError::conflict(
                "orderId",
                "The order still has open requests",
                "ยังมีคำขอเบิกสินค้าที่ยังค้างอยู่ ไม่สามารถปิด Order ได้",
            ));
        }

        let order = sqlx::query_as::<_, Order>(&format!(
            "UPDATE orders SET status = $2 WHERE order_id = $1 RETURNING {}",
            ORDER_COLUMNS
        ))
        .bind(order_id)
        .bind(OrderStatus::Closed)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!(order_id = %order_id, staff_id = %staff_id, "Order closed");
        Ok(order)
    }

    async fn query_orders(&self, condition: &str) -> AppResult<Vec<Order>> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            "SELECT {} FROM orders o WHERE {} ORDER BY o.order_date DESC",
            ORDER_COLUMNS, condition
        ))
        .fetch_all(&self.db)
        .await?;
        Ok(orders)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_line_price_is_optional() {
        let input: CreateOrderInput = serde_json::from_str(
            r#"{"customerId":"CUS-1","items":[{"productId":"PROD-1","quantity":3}]}"#,
        )
        .unwrap();
        assert_eq!(input.items.len(), 1);
        assert!(input.items[0].unit_price.is_none());
    }
}
