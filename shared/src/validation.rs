//! Validation utilities for the Smart Inventory Platform
//!
//! Input normalisation and field checks shared by the backend services and
//! the dashboard forms.

use rust_decimal::Decimal;

// ============================================================================
// Text Normalisation
// ============================================================================

/// Trim a value, mapping blank input to `None`
pub fn trim_to_null(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Trim a required value, rejecting blank input
pub fn require_text(value: &str, message: &'static str) -> Result<String, &'static str> {
    trim_to_null(Some(value)).ok_or(message)
}

// ============================================================================
// General Validations
// ============================================================================

/// Validate email format (basic check)
pub fn validate_email(email: &str) -> Result<(), &'static str> {
    let email = email.trim();
    let Some((local, domain)) = email.split_once('@') else {
        return Err("Invalid email format");
    };
    if local.is_empty() || !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.')
    {
        return Err("Invalid email format");
    }
    Ok(())
}

/// Validate password strength
pub fn validate_password(password: &str) -> Result<(), &'static str> {
    if password.len() < 8 {
        return Err("Password must be at least 8 characters");
    }
    Ok(())
}

// ============================================================================
// Stock Validations
// ============================================================================

pub fn validate_positive_quantity(quantity: i32) -> Result<(), &'static str> {
    if quantity <= 0 {
        return Err("Quantity must be greater than zero");
    }
    Ok(())
}

/// Selling prices may be zero but never negative
pub fn validate_sell_price(price: Decimal) -> Result<(), &'static str> {
    if price < Decimal::ZERO {
        return Err("Sell price cannot be negative");
    }
    Ok(())
}

/// Purchase costs must be strictly positive
pub fn validate_unit_cost(cost: Decimal) -> Result<(), &'static str> {
    if cost <= Decimal::ZERO {
        return Err("Unit cost must be greater than zero");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trim_to_null() {
        assert_eq!(trim_to_null(Some("  Acme  ")), Some("Acme".to_string()));
        assert_eq!(trim_to_null(Some("   ")), None);
        assert_eq!(trim_to_null(None), None);
    }

    #[test]
    fn test_require_text() {
        assert_eq!(require_text(" Bolt ", "name required"), Ok("Bolt".to_string()));
        assert_eq!(require_text("", "name required"), Err("name required"));
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("warehouse@example.co.th").is_ok());
        assert!(validate_email("a@b.co").is_ok());
        assert!(validate_email("no-at-sign.com").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("user@localhost").is_err());
        assert!(validate_email("user@.com").is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("longenough").is_ok());
        assert!(validate_password("short").is_err());
    }

    #[test]
    fn test_quantity_and_prices() {
        assert!(validate_positive_quantity(1).is_ok());
        assert!(validate_positive_quantity(0).is_err());
        assert!(validate_sell_price(Decimal::ZERO).is_ok());
        assert!(validate_sell_price(Decimal::from(-1)).is_err());
        assert!(validate_unit_cost(Decimal::ZERO).is_err());
        assert!(validate_unit_cost(Decimal::new(1250, 2)).is_ok());
    }
}
