//! Notification API Handlers

use axum::{
    Json,
    extract::{Path, State},
};
use shared::ErrorCode;
use shared::message::Notification;

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::utils::{ApiResponse, AppError, AppResult};

/// GET /api/notifications - 调用者角色的通知 (持久化顺序)
pub async fn list(
    State(state): State<ServerState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<Notification>>> {
    let notifications = state
        .store
        .notifications_for(&current_user.tenant_id, Some(current_user.role))
        .map_err(|e| AppError::database(e.to_string()))?;
    Ok(Json(notifications))
}

/// POST /api/notifications/:id/read - 标记调用者角色的通知已读
pub async fn mark_read(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<()>>> {
    let found = state
        .store
        .mark_notification_read(&current_user.tenant_id, current_user.role, &id)
        .map_err(|e| AppError::database(e.to_string()))?;
    if !found {
        return Err(AppError::with_message(
            ErrorCode::NotificationNotFound,
            format!("Notification {} not found", id),
        ));
    }
    Ok(Json(ApiResponse::ok()))
}
