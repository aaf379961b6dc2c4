//! HTTP status code mapping for error codes

use super::codes::ErrorCode;
use http::StatusCode;

impl ErrorCode {
    /// Get the appropriate HTTP status code for this error code
    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::Success => StatusCode::OK,

            Self::NotFound
            | Self::OrderNotFound
            | Self::CustomerNotFound
            | Self::TableNotFound
            | Self::NotificationNotFound => StatusCode::NOT_FOUND,

            Self::AlreadyExists
            | Self::TransitionOutOfOrder
            | Self::OrderNotAmendable
            | Self::NoPendingAmendment
            | Self::SyncConflict => StatusCode::CONFLICT,

            Self::NotAuthenticated | Self::TokenExpired | Self::TokenInvalid => {
                StatusCode::UNAUTHORIZED
            }

            Self::PermissionDenied
            | Self::RoleRequired
            | Self::TenantMismatch
            | Self::TenantNotSelected => StatusCode::FORBIDDEN,

            Self::NetworkError | Self::TimeoutError => StatusCode::SERVICE_UNAVAILABLE,

            Self::InternalError | Self::DatabaseError | Self::ConfigError | Self::Unknown => {
                StatusCode::INTERNAL_SERVER_ERROR
            }

            // 400 Bad Request (validation / malformed payloads)
            Self::ValidationFailed
            | Self::InvalidRequest
            | Self::InvalidFormat
            | Self::ClockParseFailure
            | Self::InvalidOrderPayload => StatusCode::BAD_REQUEST,
        }
    }
}
