//! Order API Handlers

use axum::{
    Json,
    extract::{Path, State},
};
use shared::order::{
    AmendmentResponseRequest, DeletedResponse, Order, OrderSnapshotDto, OrderStatusResponse,
    ProposeAmendmentRequest, StatusUpdateRequest,
};

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::utils::AppResult;

/// 拉取接口返回的最大订单数
const RECENT_ORDERS_LIMIT: usize = 100;

fn status_response(order: &Order) -> OrderStatusResponse {
    OrderStatusResponse {
        id: order.id.clone(),
        status: order.status,
        version: order.version,
    }
}

/// GET /api/orders - 最近订单 (与同步推送相同的快照格式)
pub async fn list(
    State(state): State<ServerState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<OrderSnapshotDto>>> {
    let orders = state
        .orders
        .recent_orders(&current_user.tenant_id, RECENT_ORDERS_LIMIT)?;
    Ok(Json(orders.iter().map(Order::to_snapshot).collect()))
}

/// GET /api/orders/:id - 获取单个订单
pub async fn get_by_id(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<Order>> {
    let order = state.orders.get_order(&current_user.tenant_id, &id)?;
    Ok(Json(order))
}

/// POST /api/orders/:id/status - 状态迁移
pub async fn update_status(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Path(id): Path<String>,
    Json(payload): Json<StatusUpdateRequest>,
) -> AppResult<Json<OrderStatusResponse>> {
    let order = state
        .orders
        .transition(&current_user.tenant_id, &id, payload, &current_user.id)?;
    Ok(Json(status_response(&order)))
}

/// POST /api/orders/:id/propose-amendment - 提交改单提案
pub async fn propose_amendment(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Path(id): Path<String>,
    Json(payload): Json<ProposeAmendmentRequest>,
) -> AppResult<Json<OrderStatusResponse>> {
    let order = state
        .orders
        .propose_amendment(&current_user.tenant_id, &id, payload.deltas)?;
    Ok(Json(status_response(&order)))
}

/// POST /api/orders/:id/respond-amendment - 审批改单
pub async fn respond_amendment(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Path(id): Path<String>,
    Json(payload): Json<AmendmentResponseRequest>,
) -> AppResult<Json<OrderStatusResponse>> {
    let order = state.orders.respond_amendment(
        &current_user.tenant_id,
        &id,
        payload,
        &current_user.id,
    )?;
    Ok(Json(status_response(&order)))
}

/// DELETE /api/orders/:id - 删除订单 (回滚顾客、收银、桌台)
pub async fn delete(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<DeletedResponse>> {
    let response = state.orders.remove_order(&current_user.tenant_id, &id)?;
    tracing::info!(
        order_id = %id,
        staff_id = %current_user.id,
        "Order deleted"
    );
    Ok(Json(response))
}
