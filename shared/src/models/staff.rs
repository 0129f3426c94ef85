//! Staff and role models

use serde::{Deserialize, Serialize};

/// A staff account
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Staff {
    pub staff_id: String,
    pub staff_name: String,
    pub role: StaffRole,
    pub email: String,
    pub phone: Option<String>,
    pub active: bool,
}

/// Roles a staff member can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "staff_role", rename_all = "UPPERCASE")
)]
#[serde(rename_all = "UPPERCASE")]
pub enum StaffRole {
    Admin,
    Sales,
    Technician,
    Foreman,
    Warehouse,
    Procurement,
}

impl StaffRole {
    pub const ALL: [StaffRole; 6] = [
        StaffRole::Admin,
        StaffRole::Sales,
        StaffRole::Technician,
        StaffRole::Foreman,
        StaffRole::Warehouse,
        StaffRole::Procurement,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StaffRole::Admin => "ADMIN",
            StaffRole::Sales => "SALES",
            StaffRole::Technician => "TECHNICIAN",
            StaffRole::Foreman => "FOREMAN",
            StaffRole::Warehouse => "WAREHOUSE",
            StaffRole::Procurement => "PROCUREMENT",
        }
    }
}

impl std::fmt::Display for StaffRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for StaffRole {
    type Err = String;

    /// Case-insensitive; an optional `ROLE_` prefix is accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase();
        let name = normalized.strip_prefix("ROLE_").unwrap_or(&normalized);
        StaffRole::ALL
            .into_iter()
            .find(|role| role.as_str() == name)
            .ok_or_else(|| format!("Unknown role: {}", s))
    }
}
