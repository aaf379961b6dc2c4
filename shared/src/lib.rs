//! Shared types for the order sync platform
//!
//! Types used by both the sync server and staff devices: the vector clock
//! comparator, the typed order model and its wire format, realtime payloads,
//! and the unified error/response structures.

pub mod clock;
pub mod error;
pub mod message;
pub mod models;
pub mod order;
pub mod util;

// Re-exports
pub use axum::Json;
pub use http;
pub use serde::{Deserialize, Serialize};

pub use clock::{Superiority, VectorClock, compare_encoded, is_superior};
pub use error::{ApiResponse, AppError, AppResult, ErrorCode};
pub use message::{Role, Severity};
pub use order::{Order, OrderSnapshotDto, OrderStatus};
