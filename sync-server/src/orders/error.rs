use shared::error::{AppError, ErrorCode};
use shared::order::{OrderStatus, SnapshotError};
use thiserror::Error;

use crate::store::StorageError;

/// 订单写入路径的领域错误
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Order not found: {0}")]
    NotFound(String),

    #[error("Customer not found: {0}")]
    CustomerNotFound(String),

    #[error("Order {order_id}: cannot move from {from} to {to}")]
    TransitionOutOfOrder {
        order_id: String,
        from: OrderStatus,
        to: OrderStatus,
    },

    #[error("Order {order_id} can no longer be amended (status {status})")]
    NotAmendable {
        order_id: String,
        status: OrderStatus,
    },

    #[error("Order {0} has no pending amendment")]
    NoPendingAmendment(String),

    #[error("Invalid order payload: {0}")]
    InvalidPayload(String),
}

impl From<SnapshotError> for OrderError {
    fn from(err: SnapshotError) -> Self {
        OrderError::InvalidPayload(err.to_string())
    }
}

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::Storage(StorageError::VersionConflict {
                order_id,
                expected,
                found,
            }) => {
                tracing::warn!(
                    order_id = %order_id,
                    expected = ?expected,
                    found = ?found,
                    "Concurrent write detected, request rejected"
                );
                AppError::sync_conflict(order_id)
            }
            OrderError::Storage(e) => {
                tracing::error!(error = %e, "Storage error occurred");
                AppError::database(e.to_string())
            }
            OrderError::NotFound(id) => AppError::order_not_found(id),
            OrderError::CustomerNotFound(id) => AppError::customer_not_found(id),
            OrderError::TransitionOutOfOrder { order_id, from, to } => {
                AppError::transition_out_of_order(from.as_str(), to.as_str())
                    .with_detail("order_id", order_id)
            }
            OrderError::NotAmendable { order_id, status } => AppError::with_message(
                ErrorCode::OrderNotAmendable,
                format!("Order {} can no longer be amended", order_id),
            )
            .with_detail("order_id", order_id)
            .with_detail("status", status.as_str()),
            OrderError::NoPendingAmendment(order_id) => {
                AppError::new(ErrorCode::NoPendingAmendment).with_detail("order_id", order_id)
            }
            OrderError::InvalidPayload(msg) => AppError::invalid_order_payload(msg),
        }
    }
}

pub type OrderResult<T> = Result<T, OrderError>;
