//! Data models
//!
//! Aggregates mutated as side effects of the order lifecycle.
//! Shared between sync-server and devices (via API). IDs are strings (UUID).

pub mod cash_register;
pub mod customer;
pub mod dining_table;

// Re-exports
pub use cash_register::*;
pub use customer::*;
pub use dining_table::*;
