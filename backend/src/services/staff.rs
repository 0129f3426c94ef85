//! Staff account management

use serde::Deserialize;
use shared::{trim_to_null, validate_email, validate_password, IdPrefix, Staff, StaffRole};
use sqlx::PgPool;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::auth::hash_password;
use crate::services::new_id;

const STAFF_COLUMNS: &str = "staff_id, staff_name, role, email, phone, active";

#[derive(Clone)]
pub struct StaffService {
    db: PgPool,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateStaffInput {
    #[validate(length(min = 1, max = 255))]
    pub staff_name: String,
    pub role: StaffRole,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8))]
    pub password: String,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStaffInput {
    #[validate(length(min = 1, max = 255))]
    pub staff_name: Option<String>,
    pub role: Option<StaffRole>,
    pub phone: Option<String>,
}

impl StaffService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list(&self) -> AppResult<Vec<Staff>> {
        let staff = sqlx::query_as::<_, Staff>(&format!(
            "SELECT {} FROM staff ORDER BY staff_name",
            STAFF_COLUMNS
        ))
        .fetch_all(&self.db)
        .await?;
        Ok(staff)
    }

    pub async fn get(&self, staff_id: &str) -> AppResult<Staff> {
        sqlx::query_as::<_, Staff>(&format!(
            "SELECT {} FROM staff WHERE staff_id = $1",
            STAFF_COLUMNS
        ))
        .bind(staff_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Staff".to_string()))
    }

    /// Create a staff account with a hashed password
    pub async fn create(&self, input: CreateStaffInput) -> AppResult<Staff> {
        input.validate()?;
        let email = input.email.trim().to_lowercase();
        validate_email(&email)
            .map_err(|m| AppError::validation("email", m, "รูปแบบอีเมลไม่ถูกต้อง"))?;
        validate_password(&input.password)
            .map_err(|m| AppError::validation("password", m, "รหัสผ่านต้องมีอย่างน้อย 8 ตัวอักษร"))?;

        let taken = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM staff WHERE LOWER(email) = $1)",
        )
        .bind(&email)
        .fetch_one(&self.db)
        .await?;
        if taken {
            return Err(AppError::conflict(
                "email",
                "Email is already in use",
                "อีเมลนี้ถูกใช้แล้ว",
            ));
        }

        let password_hash = hash_password(&input.password)?;
        let staff = sqlx::query_as::<_, Staff>(&format!(
            r#"
            INSERT INTO staff (staff_id, staff_name, role, email, password_hash, phone, active)
            VALUES ($1, $2, $3, $4, $5, $6, TRUE)
            RETURNING {}
            "#,
            STAFF_COLUMNS
        ))
        .bind(new_id(IdPrefix::Staff))
        .bind(input.staff_name.trim())
        .bind(input.role)
        .bind(&email)
        .bind(&password_hash)
        .bind(trim_to_null(input.phone.as_deref()))
        .fetch_one(&self.db)
        .await?;

        tracing::info!(staff_id = %staff.staff_id, role = %staff.role, "Staff created");
        Ok(staff)
    }

    pub async fn update(&self, staff_id: &str, input: UpdateStaffInput) -> AppResult<Staff> {
        input.validate()?;
        let existing = self.get(staff_id).await?;

        let name = input
            .staff_name
            .as_deref()
            .and_then(|n| trim_to_null(Some(n)))
            .unwrap_or(existing.staff_name);
        let role = input.role.unwrap_or(existing.role);
        let phone = match input.phone {
            Some(phone) => trim_to_null(Some(phone.as_str())),
            None => existing.phone,
        };

        let staff = sqlx::query_as::<_, Staff>(&format!(
            r#"
            UPDATE staff SET staff_name = $2, role = $3, phone = $4
            WHERE staff_id = $1
            RETURNING {}
            "#,
            STAFF_COLUMNS
        ))
        .bind(staff_id)
        .bind(&name)
        .bind(role)
        .bind(&phone)
        .fetch_one(&self.db)
        .await?;

        Ok(staff)
    }

    /// Deactivated staff can no longer log in
    pub async fn deactivate(&self, staff_id: &str) -> AppResult<()> {
        let result = sqlx::query("UPDATE staff SET active = FALSE WHERE staff_id = $1")
            .bind(staff_id)
            .execute(&self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Staff".to_string()));
        }
        tracing::info!(staff_id = %staff_id, "Staff deactivated");
        Ok(())
    }

    /// Create the first administrator when the staff table is empty
    pub async fn ensure_admin(&self, name: &str, email: &str, password: &str) -> AppResult<()> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM staff")
            .fetch_one(&self.db)
            .await?;
        if count > 0 {
            return Ok(());
        }

        let admin = self
            .create(CreateStaffInput {
                staff_name: name.to_string(),
                role: StaffRole::Admin,
                email: email.to_string(),
                password: password.to_string(),
                phone: None,
            })
            .await?;
        tracing::info!(staff_id = %admin.staff_id, "Bootstrap administrator created");
        Ok(())
    }
}
