//! Domain models for the Smart Inventory Platform

mod order;
mod party;
mod product;
mod purchase_order;
mod request;
mod staff;
mod stock;

pub use order::*;
pub use party::*;
pub use product::*;
pub use purchase_order::*;
pub use request::*;
pub use staff::*;
pub use stock::*;
