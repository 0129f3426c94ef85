//! Supplier management

use serde::Deserialize;
use shared::{require_text, trim_to_null, validate_email, IdPrefix, Supplier};
use sqlx::PgPool;

use crate::error::{AppError, AppResult};
use crate::services::new_id;

const SUPPLIER_COLUMNS: &str = "supplier_id, supplier_name, address, phone, email, active";

#[derive(Clone)]
pub struct SupplierService {
    db: PgPool,
}

/// Create and update payload
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplierInput {
    #[serde(default)]
    pub supplier_name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

/// Trimmed and checked supplier fields
struct NormalizedSupplier {
    name: String,
    address: Option<String>,
    phone: Option<String>,
    email: Option<String>,
}

impl SupplierInput {
    fn normalize(self) -> AppResult<NormalizedSupplier> {
        let name = require_text(&self.supplier_name, "Supplier name is required").map_err(|m| {
            AppError::validation("supplierName", m, "กรุณาระบุชื่อ Supplier")
        })?;
        let email = trim_to_null(self.email.as_deref());
        if let Some(email) = &email {
            validate_email(email)
                .map_err(|m| AppError::validation("email", m, "รูปแบบอีเมลไม่ถูกต้อง"))?;
        }
        Ok(NormalizedSupplier {
            name,
            address: trim_to_null(self.address.as_deref()),
            phone: trim_to_null(self.phone.as_deref()),
            email,
        })
    }
}

impl SupplierService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Active suppliers, by name
    pub async fn list(&self) -> AppResult<Vec<Supplier>> {
        let suppliers = sqlx::query_as::<_, Supplier>(&format!(
            "SELECT {} FROM supplier WHERE active = TRUE ORDER BY supplier_name",
            SUPPLIER_COLUMNS
        ))
        .fetch_all(&self.db)
        .await?;
        Ok(suppliers)
    }

    pub async fn get(&self, supplier_id: &str) -> AppResult<Supplier> {
        sqlx::query_as::<_, Supplier>(&format!(
            "SELECT {} FROM supplier WHERE supplier_id = $1",
            SUPPLIER_COLUMNS
        ))
        .bind(supplier_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Supplier".to_string()))
    }

    pub async fn create(&self, input: SupplierInput) -> AppResult<Supplier> {
        let fields = input.normalize()?;
        if let Some(email) = &fields.email {
            self.ensure_email_free(email, None).await?;
        }

        let supplier = sqlx::query_as::<_, Supplier>(&format!(
            r#"
            INSERT INTO supplier (supplier_id, supplier_name, address, phone, email, active)
            VALUES ($1, $2, $3, $4, $5, TRUE)
            RETURNING {}
            "#,
            SUPPLIER_COLUMNS
        ))
        .bind(new_id(IdPrefix::Supplier))
        .bind(&fields.name)
        .bind(&fields.address)
        .bind(&fields.phone)
        .bind(&fields.email)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(supplier_id = %supplier.supplier_id, "Supplier created");
        Ok(supplier)
    }

    pub async fn update(&self, supplier_id: &str, input: SupplierInput) -> AppResult<Supplier> {
        self.get(supplier_id).await?;
        let fields = input.normalize()?;
        if let Some(email) = &fields.email {
            self.ensure_email_free(email, Some(supplier_id)).await?;
        }

        let supplier = sqlx::query_as::<_, Supplier>(&format!(
            r#"
            UPDATE supplier SET supplier_name = $2, address = $3, phone = $4, email = $5
            WHERE supplier_id = $1
            RETURNING {}
            "#,
            SUPPLIER_COLUMNS
        ))
        .bind(supplier_id)
        .bind(&fields.name)
        .bind(&fields.address)
        .bind(&fields.phone)
        .bind(&fields.email)
        .fetch_one(&self.db)
        .await?;

        Ok(supplier)
    }

    pub async fn deactivate(&self, supplier_id: &str) -> AppResult<()> {
        let result = sqlx::query("UPDATE supplier SET active = FALSE WHERE supplier_id = $1")
            .bind(supplier_id)
            .execute(&self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Supplier".to_string()));
        }
        Ok(())
    }

    async fn ensure_email_free(&self, email: &str, except: Option<&str>) -> AppResult<()> {
        let owner = sqlx::query_scalar::<_, String>(
            "SELECT supplier_id FROM supplier WHERE LOWER(email) = LOWER($1)",
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;

        match owner {
            Some(owner) if Some(owner.as_str()) != except => Err(AppError::conflict(
                "email",
                "Email already exists",
                "อีเมลนี้มีในระบบแล้ว",
            )),
            _ => Ok(()),
        }
    }
}
