//! Customer management
//!
//! Customers are matched by phone as well as email, so both must be unique.

use serde::Deserialize;
use shared::{require_text, trim_to_null, validate_email, Customer, IdPrefix};
use sqlx::PgPool;

use crate::error::{AppError, AppResult};
use crate::services::new_id;

const CUSTOMER_COLUMNS: &str = "customer_id, customer_name, address, phone, email, active";

#[derive(Clone)]
pub struct CustomerService {
    db: PgPool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerInput {
    #[serde(default)]
    pub customer_name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

impl CustomerService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list(&self) -> AppResult<Vec<Customer>> {
        let customers = sqlx::query_as::<_, Customer>(&format!(
            "SELECT {} FROM customer WHERE active = TRUE ORDER BY customer_name",
            CUSTOMER_COLUMNS
        ))
        .fetch_all(&self.db)
        .await?;
        Ok(customers)
    }

    pub async fn get(&self, customer_id: &str) -> AppResult<Customer> {
        sqlx::query_as::<_, Customer>(&format!(
            "SELECT {} FROM customer WHERE customer_id = $1",
            CUSTOMER_COLUMNS
        ))
        .bind(customer_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Customer".to_string()))
    }

    pub async fn create(&self, input: CustomerInput) -> AppResult<Customer> {
        let (name, address, phone, email) = normalize(input)?;
        self.ensure_unique(phone.as_deref(), email.as_deref(), None)
            .await?;

        let customer = sqlx::query_as::<_, Customer>(&format!(
            r#"
            INSERT INTO customer (customer_id, customer_name, address, phone, email, active)
            VALUES ($1, $2, $3, $4, $5, TRUE)
            RETURNING {}
            "#,
            CUSTOMER_COLUMNS
        ))
        .bind(new_id(IdPrefix::Customer))
        .bind(&name)
        .bind(&address)
        .bind(&phone)
        .bind(&email)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(customer_id = %customer.customer_id, "Customer created");
        Ok(customer)
    }

    pub async fn update(&self, customer_id: &str, input: CustomerInput) -> AppResult<Customer> {
        self.get(customer_id).await?;
        let (name, address, phone, email) = normalize(input)?;
        self.ensure_unique(phone.as_deref(), email.as_deref(), Some(customer_id))
            .await?;

        let customer = sqlx::query_as::<_, Customer>(&format!(
            r#"
            UPDATE customer SET customer_name = $2, address = $3, phone = $4, email = $5
            WHERE customer_id = $1
            RETURNING {}
            "#,
            CUSTOMER_COLUMNS
        ))
        .bind(customer_id)
        .bind(&name)
        .bind(&address)
        .bind(&phone)
        .bind(&email)
        .fetch_one(&self.db)
        .await?;

        Ok(customer)
    }

    pub async fn deactivate(&self, customer_id: &str) -> AppResult<()> {
        let result = sqlx::query("UPDATE customer SET active = FALSE WHERE customer_id = $1")
            .bind(customer_id)
            .execute(&self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Customer".to_string()));
        }
        Ok(())
    }

    async fn ensure_unique(
        &self,
        phone: Option<&str>,
        email: Option<&str>,
        except: Option<&str>,
    ) -> AppResult<()> {
        if let Some(phone) = phone {
            let owner = sqlx::query_scalar::<_, String>(
                "SELECT customer_id FROM customer WHERE phone = $1",
            )
            .bind(phone)
            .fetch_optional(&self.db)
            .await?;
            if owner.is_some_and(|o| Some(o.as_str()) != except) {
                return Err(AppError::conflict(
                    "phone",
                    "Phone number already exists",
                    "เบอร์โทรศัพท์นี้มีในระบบแล้ว",
                ));
            }
        }

        if let Some(email) = email {
            let owner = sqlx::query_scalar::<_, String>(
                "SELECT customer_id FROM customer WHERE LOWER(email) = LOWER($1)",
            )
            .bind(email)
            .fetch_optional(&self.db)
            .await?;
            if owner.is_some_and(|o| Some(o.as_str()) != except) {
                return Err(AppError::conflict(
                    "email",
                    "Email already exists",
                    "อีเมลนี้มีในระบบแล้ว",
                ));
            }
        }
        Ok(())
    }
}

type CustomerFields = (String, Option<String>, Option<String>, Option<String>);

fn normalize(input: CustomerInput) -> AppResult<CustomerFields> {
    let name = require_text(&input.customer_name, "Customer name is required")
        .map_err(|m| AppError::validation("customerName", m, "กรุณาระบุชื่อลูกค้า"))?;
    let email = trim_to_null(input.email.as_deref());
    if let Some(email) = &email {
        validate_email(email).map_err(|m| AppError::validation("email", m, "รูปแบบอีเมลไม่ถูกต้อง"))?;
    }
    Ok((
        name,
        trim_to_null(input.address.as_deref()),
        trim_to_null(input.phone.as_deref()),
        email,
    ))
}
