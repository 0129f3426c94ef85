//! Authentication service for staff login and token management

use bcrypt::{hash, verify};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use shared::{Staff, StaffRole};
use sqlx::PgPool;

use crate::config::Config;
use crate::error::{AppError, AppResult};

/// bcrypt work factor for staff passwords
pub const BCRYPT_COST: u32 = 12;

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    db: PgPool,
    jwt_secret: String,
    access_token_expiry: i64,
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // Staff ID
    pub role: String,
    pub exp: i64,
    pub iat: i64,
}

/// Issued access token with the staff profile
#[derive(Debug, Serialize)]
pub struct AuthSession {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub staff: Staff,
}

/// Staff row including the password hash
#[derive(Debug, sqlx::FromRow)]
struct StaffCredentialRow {
    staff_id: String,
    staff_name: String,
    role: StaffRole,
    email: String,
    password_hash: String,
    phone: Option<String>,
    active: bool,
}

impl AuthService {
    /// Create a new AuthService instance
    pub fn new(db: PgPool, config: &Config) -> Self {
        Self {
            db,
            jwt_secret: config.jwt.secret.clone(),
            access_token_expiry: config.jwt.access_token_expiry,
        }
    }

    /// Authenticate staff with email and password
    pub async fn login(&self, email: &str, password: &str) -> AppResult<AuthSession> {
        let row = sqlx::query_as::<_, StaffCredentialRow>(
            r#"
            SELECT staff_id, staff_name, role, email, password_hash, phone, active
            FROM staff
            WHERE LOWER(email) = LOWER($1)
            "#,
        )
        .bind(email.trim())
        .fetch_optional(&self.db)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

        let valid = verify(password, &row.password_hash)
            .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))?;
        if !valid {
            tracing::warn!(email = %email, "Failed login attempt");
            return Err(AppError::InvalidCredentials);
        }

        if !row.active {
            return Err(AppError::AccountDisabled);
        }

        let access_token = self.issue_token(&row.staff_id, row.role)?;
        tracing::info!(staff_id = %row.staff_id, role = %row.role, "Staff logged in");

        Ok(AuthSession {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: self.access_token_expiry,
            staff: Staff {
                staff_id: row.staff_id,
                staff_name: row.staff_name,
                role: row.role,
                email: row.email,
                phone: row.phone,
                active: row.active,
            },
        })
    }

    /// Sign an access token for a staff member
    pub fn issue_token(&self, staff_id: &str, role: StaffRole) -> AppResult<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: staff_id.to_string(),
            role: role.as_str().to_string(),
            exp: (now + Duration::seconds(self.access_token_expiry)).timestamp(),
            iat: now.timestamp(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
    }

    /// Validate access token and return claims
    pub fn validate_token(&self, token: &str) -> AppResult<Claims> {
        decode_token(token, &self.jwt_secret)
    }
}

/// Decode and validate an HS256 access token
pub fn decode_token(token: &str, secret: &str) -> AppResult<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::InvalidToken)
}

pub fn hash_password(password: &str) -> AppResult<String> {
    hash(password, BCRYPT_COST)
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
}
