//! HTTP request handlers

pub mod auth;
pub mod customer;
pub mod health;
pub mod order;
pub mod product;
pub mod purchase_order;
pub mod reporting;
pub mod request;
pub mod staff;
pub mod stock;
pub mod supplier;

pub use auth::*;
pub use customer::*;
pub use health::*;
pub use order::*;
pub use product::*;
pub use purchase_order::*;
pub use reporting::*;
pub use request::*;
pub use staff::*;
pub use stock::*;
pub use supplier::*;
