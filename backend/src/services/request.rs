//! Stock request workflow: raise, approve or reject, close

use serde::Deserialize;
use shared::{
    check_request_against_order, trim_to_null, validate_positive_quantity, IdPrefix, OrderItem,
    Request, RequestItem, RequestLine, RequestStatus,
};
use sqlx::PgPool;

use crate::error::{AppError, AppResult};
use crate::services::new_id;

const REQUEST_COLUMNS: &str = "request_id, request_date, status, order_id, customer_id, \
     staff_id, description, approved_by, approved_date";

const REQUEST_ITEM_COLUMNS: &str =
    "request_item_id, request_id, product_id, quantity, fulfilled_qty, remaining_qty";

#[derive(Clone)]
pub struct RequestService {
    db: PgPool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRequestInput {
    pub order_id: Option<String>,
    pub customer_id: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub items: Vec<RequestLine>,
}

/// Which requests a listing returns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestFilter {
    All,
    Pending,
    ReadyToClose,
}

impl Default for RequestFilter {
    fn default() -> Self {
        RequestFilter::All
    }
}

/// Structural checks on request lines before they touch the database
pub fn validate_request_lines(lines: &[RequestLine]) -> AppResult<()> {
    if lines.is_empty() {
        return Err(AppError::validation(
            "items",
            "At least one item is required",
            "ต้องระบุรายการสินค้าอย่างน้อย 1 รายการ",
        ));
    }
    for line in lines {
        if line.product_id.trim().is_empty() {
            return Err(AppError::validation(
                "productId",
                "Product is required",
                "กรุณาเลือกสินค้า",
            ));
        }
        validate_positive_quantity(line.quantity)
            .map_err(|m| AppError::validation("quantity", m, "จำนวนต้องมากกว่า 0"))?;
    }
    Ok(())
}

impl RequestService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Raise a request, checked against the linked order's remaining quantities
    pub async fn create(&self, staff_id: &str, input: CreateRequestInput) -> AppResult<Request> {
        validate_request_lines(&input.items)?;
        let order_id = trim_to_null(input.order_id.as_deref());

        let mut tx = self.db.begin().await?;
        let mut customer_id = trim_to_null(input.customer_id.as_deref());

        if let Some(order_id) = &order_id {
            let order_customer = sqlx::query_scalar::<_, Option<String>>(
                "SELECT customer_id FROM orders WHERE order_id = $1 FOR SHARE",
            )
            .bind(order_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound("Order".to_string()))?;

            let order_items = sqlx::query_as::<_, OrderItem>(
                r#"
                SELECT order_item_id, order_id, product_id, quantity, unit_price, line_total,
                       fulfilled_qty, remaining_qty
                FROM order_item WHERE order_id = $1 ORDER BY order_item_id
                "#,
            )
            .bind(order_id)
            .fetch_all(&mut *tx)
            .await?;

            check_request_against_order(&order_items, &input.items)?;
            if customer_id.is_none() {
                customer_id = order_customer;
            }
        }

        let request = sqlx::query_as::<_, Request>(&format!(
            r#"
            INSERT INTO request (request_id, request_date, status, order_id, customer_id, staff_id, description)
            VALUES ($1, NOW(), $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            REQUEST_COLUMNS
        ))
        .bind(new_id(IdPrefix::Request))
        .bind(RequestStatus::AwaitingApproval)
        .bind(&order_id)
        .bind(&customer_id)
        .bind(staff_id)
        .bind(trim_to_null(input.description.as_deref()))
        .fetch_one(&mut *tx)
        .await?;

        let mut items = Vec::with_capacity(input.items.len());
        for line in &input.items {
            let item = sqlx::query_as::<_, RequestItem>(&format!(
                r#"
                INSERT INTO request_item (request_item_id, request_id, product_id, quantity)
                VALUES ($1, $2, $3, $4)
                RETURNING {}
                "#,
                REQUEST_ITEM_COLUMNS
            ))
            .bind(new_id(IdPrefix::RequestItem))
            .bind(&request.request_id)
            .bind(line.product_id.trim())
            .bind(line.quantity)
            .fetch_one(&mut *tx)
            .await?;
            items.push(item);
        }

        tx.commit().await?;
        tracing::info!(
            request_id = %request.request_id,
            order_id = ?order_id,
            lines = items.len(),
            "Request created"
        );

        Ok(Request {
            items: Some(items),
            ..request
        })
    }

    pub async fn list(&self, filter: RequestFilter, order_id: Option<&str>) -> AppResult<Vec<Request>> {
        let condition = match filter {
            RequestFilter::All => "TRUE",
            RequestFilter::Pending => "r.status = 'Awaiting Approval'",
            RequestFilter::ReadyToClose => {
                "r.status = 'Pending' AND NOT EXISTS (SELECT 1 FROM request_item ri \
                 WHERE ri.request_id = r.request_id AND ri.remaining_qty > 0)"
            }
        };

        let requests = sqlx::query_as::<_, Request>(&format!(
            "SELECT {} FROM request r WHERE {} AND ($1::VARCHAR IS NULL OR r.order_id = $1) \
             ORDER BY r.request_date DESC",
            REQUEST_COLUMNS, condition
        ))
        .bind(order_id)
        .fetch_all(&self.db)
        .await?;
        Ok(requests)
    }

    pub async fn get(&self, request_id: &str) -> AppResult<Request> {
        let request = sqlx::query_as::<_, Request>(&format!(
            "SELECT {} FROM request WHERE request_id = $1",
            REQUEST_COLUMNS
        ))
        .bind(request_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Request".to_string()))?;

        let items = self.items(request_id).await?;
        Ok(Request {
            items: Some(items),
            ..request
        })
    }

    pub async fn items(&self, request_id: &str) -> AppResult<Vec<RequestItem>> {
        let items = sqlx::query_as::<_, RequestItem>(&format!(
            "SELECT {} FROM request_item WHERE request_id = $1 ORDER BY request_item_id",
            REQUEST_ITEM_COLUMNS
        ))
        .bind(request_id)
        .fetch_all(&self.db)
        .await?;
        Ok(items)
    }

    pub async fn approve(&self, request_id: &str, approver_id: &str) -> AppResult<Request> {
        self.decide(request_id, approver_id, RequestStatus::Approved)
            .await
    }

    pub async fn reject(&self, request_id: &str, approver_id: &str) -> AppResult<Request> {
        self.decide(request_id, approver_id, RequestStatus::Rejected)
            .await
    }

    /// Close a fully served request
    pub async fn close(&self, request_id: &str, staff_id: &str) -> AppResult<Request> {
        let mut tx = self.db.begin().await?;
        let status = lock_status(&mut tx, request_id).await?;
        if !status.can_transition_to(RequestStatus::Closed) {
            return Err(AppError::InvalidStateTransition(format!(
                "Request {} is {} and cannot be closed",
                request_id, status
            )));
        }

        let outstanding = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM request_item WHERE request_id = $1 AND remaining_qty > 0)",
        )
        .bind(request_id)
        .fetch_one(&mut *tx)
        .await?;
        if outstanding {
            tracing::warn!(request_id = %request_id, "Close refused, items outstanding");
            return Err(AppError::InvalidStateTransition(format!(
                "Request {} still has items to fulfill",
                request_id
            )));
        }

        let request = sqlx::query_as::<_, Request>(&format!(
            "UPDATE request SET status = $2 WHERE request_id = $1 RETURNING {}",
            REQUEST_COLUMNS
        ))
        .bind(request_id)
        .bind(RequestStatus::Closed)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!(request_id = %request_id, staff_id = %staff_id, "Request closed");
        Ok(request)
    }

    async fn decide(
        &self,
        request_id: &str,
        approver_id: &str,
        decision: RequestStatus,
    ) -> AppResult<Request> {
        let mut tx = self.db.begin().await?;
        let status = lock_status(&mut tx, request_id).await?;
        if !status.can_transition_to(decision) {
            return Err(AppError::InvalidStateTransition(format!(
                "Request {} is {} and cannot become {}",
                request_id, status, decision
            )));
        }

        let request = sqlx::query_as::<_, Request>(&format!(
            r#"
            UPDATE request SET status = $2, approved_by = $3, approved_date = NOW()
            WHERE request_id = $1
            RETURNING {}
            "#,
            REQUEST_COLUMNS
        ))
        .bind(request_id)
        .bind(decision)
        .bind(approver_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!(
            request_id = %request_id,
            approver_id = %approver_id,
            status = %decision,
            "Request decided"
        );
        Ok(request)
    }
}

async fn lock_status(conn: &mut sqlx::PgConnection, request_id: &str) -> AppResult<RequestStatus> {
    sqlx::query_scalar::<_, RequestStatus>(
        "SELECT status FROM request WHERE request_id = $1 FOR UPDATE",
    )
    .bind(request_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound("Request".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(product_id: &str, quantity: i32) -> RequestLine {
        RequestLine {
            product_id: product_id.to_string(),
            quantity,
        }
    }

    #[test]
    fn test_validate_request_lines() {
        assert!(validate_request_lines(&[line("PROD-1", 2)]).is_ok());
        assert!(validate_request_lines(&[]).is_err());
        assert!(validate_request_lines(&[line(" ", 1)]).is_err());
        assert!(validate_request_lines(&[line("PROD-1", 0)]).is_err());
    }

    #[test]
    fn test_request_filter_from_query() {
        let filter: RequestFilter = serde_json::from_str("\"ready-to-close\"").unwrap();
        assert_eq!(filter, RequestFilter::ReadyToClose);
        assert_eq!(RequestFilter::default(), RequestFilter::All);
    }
}
