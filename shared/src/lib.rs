//! Shared types and models for the Smart Inventory Platform
//!
//! This crate contains the domain types and pure computations shared between
//! the backend, the dashboard (via WASM), and other components of the system:
//! batch allocation planning, the role capability table, and stock arithmetic.

pub mod access;
pub mod allocation;
pub mod models;
pub mod stock;
pub mod types;
pub mod validation;

pub use access::*;
pub use allocation::*;
pub use models::*;
pub use stock::*;
pub use types::*;
pub use validation::*;
