//! Business logic services for the Smart Inventory Platform

use shared::IdPrefix;

pub mod auth;
pub mod customer;
pub mod order;
pub mod product;
pub mod purchase_order;
pub mod reporting;
pub mod request;
pub mod staff;
pub mod stock;
pub mod supplier;

pub use auth::AuthService;
pub use staff::StaffService;

/// New `PREFIX-XXXXXXXX` identifier
pub fn new_id(prefix: IdPrefix) -> String {
    prefix.with_suffix(&uuid::Uuid::new_v4().simple().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_id_shape() {
        let id = new_id(IdPrefix::Request);
        assert!(id.starts_with("REQ-"));
        assert_eq!(id.len(), "REQ-".len() + 8);
        assert_ne!(id, new_id(IdPrefix::Request));
    }
}
