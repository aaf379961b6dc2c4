//! Unified error codes for the order sync platform
//!
//! Error codes are shared by sync-server, sync-client and the device UI.
//! They are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 2xxx: Permission errors
//! - 3xxx: Tenant errors
//! - 4xxx: Order / sync errors
//! - 6xxx: Customer errors
//! - 7xxx: Table errors
//! - 8xxx: Notification errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values for efficient serialization
/// and cross-language compatibility (Rust, TypeScript, etc.)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,
    /// Invalid request
    InvalidRequest = 5,
    /// Invalid format
    InvalidFormat = 6,

    // ==================== 1xxx: Auth ====================
    /// User is not authenticated
    NotAuthenticated = 1001,
    /// Token has expired
    TokenExpired = 1003,
    /// Token is invalid
    TokenInvalid = 1004,

    // ==================== 2xxx: Permission ====================
    /// Permission denied
    PermissionDenied = 2001,
    /// Specific role required
    RoleRequired = 2002,

    // ==================== 3xxx: Tenant ====================
    /// Tenant header does not match the token
    TenantMismatch = 3001,
    /// Tenant not selected
    TenantNotSelected = 3002,

    // ==================== 4xxx: Order / Sync ====================
    /// Order not found
    OrderNotFound = 4001,
    /// Status transition not allowed from the current state
    TransitionOutOfOrder = 4002,
    /// Order no longer accepts amendments
    OrderNotAmendable = 4003,
    /// No amendment is pending on the order
    NoPendingAmendment = 4004,
    /// Vector clock could not be parsed
    ClockParseFailure = 4005,
    /// Canonical order changed while a batch was being reconciled
    SyncConflict = 4006,
    /// Order payload (items / amendments) could not be parsed
    InvalidOrderPayload = 4007,

    // ==================== 6xxx: Customer ====================
    /// Customer not found
    CustomerNotFound = 6001,

    // ==================== 7xxx: Table ====================
    /// Table not found
    TableNotFound = 7001,

    // ==================== 8xxx: Notification ====================
    /// Notification not found
    NotificationNotFound = 8001,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
    /// Network error
    NetworkError = 9003,
    /// Operation timed out
    TimeoutError = 9004,
    /// Configuration error
    ConfigError = 9005,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Check if this is a success code
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// Get the default message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::Unknown => "An unknown error occurred",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::AlreadyExists => "Resource already exists",
            ErrorCode::InvalidRequest => "Invalid request",
            ErrorCode::InvalidFormat => "Invalid format",

            ErrorCode::NotAuthenticated => "User is not authenticated",
            ErrorCode::TokenExpired => "Authentication token has expired",
            ErrorCode::TokenInvalid => "Authentication token is invalid",

            ErrorCode::PermissionDenied => "Permission denied",
            ErrorCode::RoleRequired => "Specific role is required",

            ErrorCode::TenantMismatch => "Tenant does not match the authenticated session",
            ErrorCode::TenantNotSelected => "No tenant selected",

            ErrorCode::OrderNotFound => "Order not found",
            ErrorCode::TransitionOutOfOrder => "Status transition is not allowed",
            ErrorCode::OrderNotAmendable => "Order can no longer be amended",
            ErrorCode::NoPendingAmendment => "No amendment is pending",
            ErrorCode::ClockParseFailure => "Vector clock is malformed",
            ErrorCode::SyncConflict => "Order changed during synchronization, retry",
            ErrorCode::InvalidOrderPayload => "Order payload is malformed",

            ErrorCode::CustomerNotFound => "Customer not found",
            ErrorCode::TableNotFound => "Table not found",
            ErrorCode::NotificationNotFound => "Notification not found",

            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database error",
            ErrorCode::NetworkError => "Network error",
            ErrorCode::TimeoutError => "Operation timed out",
            ErrorCode::ConfigError => "Configuration error",
        }
    }
}

impl From<ErrorCode> for u16 {
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error returned when converting an unknown u16 into [`ErrorCode`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ErrorCode::Success),
            1 => Ok(ErrorCode::Unknown),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            4 => Ok(ErrorCode::AlreadyExists),
            5 => Ok(ErrorCode::InvalidRequest),
            6 => Ok(ErrorCode::InvalidFormat),

            1001 => Ok(ErrorCode::NotAuthenticated),
            1003 => Ok(ErrorCode::TokenExpired),
            1004 => Ok(ErrorCode::TokenInvalid),

            2001 => Ok(ErrorCode::PermissionDenied),
            2002 => Ok(ErrorCode::RoleRequired),

            3001 => Ok(ErrorCode::TenantMismatch),
            3002 => Ok(ErrorCode::TenantNotSelected),

            4001 => Ok(ErrorCode::OrderNotFound),
            4002 => Ok(ErrorCode::TransitionOutOfOrder),
            4003 => Ok(ErrorCode::OrderNotAmendable),
            4004 => Ok(ErrorCode::NoPendingAmendment),
            4005 => Ok(ErrorCode::ClockParseFailure),
            4006 => Ok(ErrorCode::SyncConflict),
            4007 => Ok(ErrorCode::InvalidOrderPayload),

            6001 => Ok(ErrorCode::CustomerNotFound),
            7001 => Ok(ErrorCode::TableNotFound),
            8001 => Ok(ErrorCode::NotificationNotFound),

            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::DatabaseError),
            9003 => Ok(ErrorCode::NetworkError),
            9004 => Ok(ErrorCode::TimeoutError),
            9005 => Ok(ErrorCode::ConfigError),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
