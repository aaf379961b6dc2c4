//! Dining Table API Handlers

use axum::{Json, extract::State};
use shared::models::DiningTable;

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::utils::{AppError, AppResult};

/// GET /api/tables - 当前租户的桌台及占用状态
pub async fn list(
    State(state): State<ServerState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<DiningTable>>> {
    let tables = state
        .store
        .list_tables(&current_user.tenant_id)
        .map_err(|e| AppError::database(e.to_string()))?;
    Ok(Json(tables))
}
