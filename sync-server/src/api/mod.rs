//! HTTP API 模块
//!
//! # 路由列表
//!
//! | 前缀 | 模块 | 说明 | 认证 |
//! |------|------|------|------|
//! | /api/sync | [`sync`] | 设备批量同步 | JWT |
//! | /api/orders | [`orders`] | 订单查询、状态机、改单 | JWT |
//! | /api/customers | [`customers`] | 顾客查询、删除 | JWT |
//! | /api/tables | [`tables`] | 桌台占用状态 | JWT |
//! | /api/notifications | [`notifications`] | 持久化通知 | JWT |
//! | /api/health | [`health`] | 健康检查 | 无 |
//! | /hub/notifications | [`hub`] | WebSocket 实时推送 | query token |

use axum::{Router, middleware};
use http::{HeaderName, HeaderValue};
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{
    MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::core::ServerState;

pub mod customers;
pub mod health;
pub mod hub;
pub mod notifications;
pub mod orders;
pub mod sync;
pub mod tables;

#[cfg(test)]
mod tests;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Request ID generator
#[derive(Clone)]
struct XRequestId;

impl MakeRequestId for XRequestId {
    fn make_request_id<B>(&mut self, _request: &http::Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// HTTP 请求日志中间件
async fn log_request(
    request: http::Request<axum::body::Body>,
    next: middleware::Next,
) -> http::Response<axum::body::Body> {
    let method = request.method().clone();
    let uri = request.uri().path().to_string();

    let response = next.run(request).await;

    let status = response.status();

    tracing::info!(target: "http_access", "{} {} {}", method, uri, status);

    response
}

/// Build a router with all routes registered (no middleware, no state)
pub fn build_router() -> Router<ServerState> {
    Router::new()
        // Sync API - device batches
        .merge(sync::router())
        // Order API - lifecycle and amendments
        .merge(orders::router())
        .merge(customers::router())
        .merge(tables::router())
        .merge(notifications::router())
        // Health API - public route
        .merge(health::router())
        // Realtime hub - token in query string
        .merge(hub::router())
}

/// Build a fully configured application with all middleware and state
///
/// Used by both the HTTP server and oneshot tests
pub fn build_app(state: ServerState) -> Router {
    build_router()
        .with_state(state)
        // Tower HTTP 中间件
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        // HTTP 请求日志中间件
        .layer(middleware::from_fn(log_request))
        .layer(TraceLayer::new_for_http())
        // Request ID - 每个请求生成并回传 x-request-id
        .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
            REQUEST_ID_HEADER,
        )))
        .layer(SetRequestIdLayer::new(
            HeaderName::from_static(REQUEST_ID_HEADER),
            XRequestId,
        ))
}
