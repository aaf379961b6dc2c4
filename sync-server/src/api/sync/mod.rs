//! Sync API 模块
//!
//! 设备把离线期间积累的订单快照批量推送到服务端，逐单返回判定结果。

mod handler;

use axum::{Router, routing::post};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/sync", routes())
}

fn routes() -> Router<ServerState> {
    Router::new().route("/orders", post(handler::sync_orders))
}
