//! Order model
//!
//! - Types: status, line items, amendment deltas, sync results
//! - Model: canonical typed order aggregate
//! - Snapshot: device wire format and boundary validation
//! - Request: lifecycle / amendment request bodies

pub mod model;
pub mod money;
pub mod request;
pub mod snapshot;
pub mod types;

// Re-exports
pub use model::{Order, apply_deltas, parse_table_ids};
pub use request::*;
pub use snapshot::{IncomingSnapshot, OrderSnapshotDto, SnapshotError};
pub use types::*;
