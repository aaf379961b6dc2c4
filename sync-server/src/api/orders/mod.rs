//! Order API 模块
//!
//! # 路由列表
//!
//! | 路径 | 方法 | 说明 |
//! |------|------|------|
//! | /api/orders | GET | 最近 100 单 (新→旧)，快照格式 |
//! | /api/orders/{id} | GET | 单个订单 |
//! | /api/orders/{id} | DELETE | 删除订单并回滚聚合数据 |
//! | /api/orders/{id}/status | POST | 状态迁移 |
//! | /api/orders/{id}/propose-amendment | POST | 提交改单提案 |
//! | /api/orders/{id}/respond-amendment | POST | 审批改单 |

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/orders", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", get(handler::list))
        .route("/{id}", get(handler::get_by_id).delete(handler::delete))
        .route("/{id}/status", post(handler::update_status))
        .route("/{id}/propose-amendment", post(handler::propose_amendment))
        .route("/{id}/respond-amendment", post(handler::respond_amendment))
}
