//! Sync API Handlers

use axum::{Json, extract::State};
use shared::order::{OrderSnapshotDto, SyncResult};

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::utils::AppResult;

/// POST /api/sync/orders - 批量同步订单快照
///
/// 整批一次提交：任何版本冲突或存储失败都会使整批失败，
/// 返回的逐单结果只在提交成功后产生。
pub async fn sync_orders(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Json(batch): Json<Vec<OrderSnapshotDto>>,
) -> AppResult<Json<Vec<SyncResult>>> {
    tracing::debug!(
        tenant_id = %current_user.tenant_id,
        staff_id = %current_user.id,
        count = batch.len(),
        "Sync batch received"
    );
    let results = state.orders.reconcile(&current_user.tenant_id, batch)?;
    Ok(Json(results))
}
