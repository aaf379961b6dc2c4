//! Customer API Handlers

use axum::{
    Json,
    extract::{Path, State},
};
use shared::models::Customer;
use shared::order::DeletedResponse;

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::utils::AppResult;

/// GET /api/customers/:id - 获取顾客聚合
pub async fn get_by_id(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<Customer>> {
    let customer = state.orders.get_customer(&current_user.tenant_id, &id)?;
    Ok(Json(customer))
}

/// DELETE /api/customers/:id - 删除顾客，引用它的订单解除关联
pub async fn delete(
    State(state): State<ServerState>,
    current_user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<DeletedResponse>> {
    let response = state.orders.remove_customer(&current_user.tenant_id, &id)?;
    tracing::info!(
        customer_id = %id,
        staff_id = %current_user.id,
        "Customer deleted"
    );
    Ok(Json(response))
}
