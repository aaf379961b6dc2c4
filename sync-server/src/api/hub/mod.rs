//! 实时推送 WebSocket 端点
//!
//! GET /hub/notifications?token=<JWT>
//! Auth: JWT 通过 query parameter 传递 (浏览器 WebSocket 不支持自定义 headers)
//!
//! 协议:
//! - Device → Server: `HubCommand` (JoinRoleGroup, JoinTenantGroup)
//! - Server → Device: `HubEvent` (ReceiveNotification, ReceiveOrderUpdate, Joined, Error)
//!
//! 每个连接最多加入一个角色组和一个租户频道。连接关闭即取消，不排空在途事件，
//! 设备通过 `/api/notifications` 补齐。

use axum::Router;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{FromRequestParts, Query, State};
use axum::http::request::Parts;
use axum::response::IntoResponse;
use axum::routing::get;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use shared::message::{HubCommand, HubEvent, Role, role_channel, tenant_channel};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::Duration;

use crate::auth::{CurrentUser, authenticate_token};
use crate::core::ServerState;
use crate::utils::AppError;

const PING_INTERVAL: Duration = Duration::from_secs(30);

pub fn router() -> Router<ServerState> {
    Router::new().route("/hub/notifications", get(handle_hub_ws))
}

#[derive(Deserialize)]
pub struct HubAuthQuery {
    token: String,
}

/// 查询参数中的令牌 (升级请求无法携带 Authorization header)
///
/// 需在 `WebSocketUpgrade` 之前提取，未认证的请求不进入升级流程
pub struct HubUser(CurrentUser);

impl FromRequestParts<ServerState> for HubUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        let Query(query) = Query::<HubAuthQuery>::from_request_parts(parts, state)
            .await
            .map_err(|_| AppError::not_authenticated())?;
        let user = authenticate_token(&state.get_jwt_service(), &query.token, "/hub/notifications")?;
        Ok(HubUser(user))
    }
}

/// GET /hub/notifications?token=<JWT>
async fn handle_hub_ws(
    State(state): State<ServerState>,
    HubUser(user): HubUser,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| hub_session(socket, state, user))
}

type WsSink = SplitSink<WebSocket, Message>;

async fn hub_session(socket: WebSocket, state: ServerState, user: CurrentUser) {
    let (mut sink, mut stream) = socket.split();

    tracing::info!(
        tenant_id = %user.tenant_id,
        staff_id = %user.id,
        role = %user.role,
        "Hub connected"
    );

    let mut role_rx: Option<broadcast::Receiver<HubEvent>> = None;
    let mut tenant_rx: Option<broadcast::Receiver<HubEvent>> = None;

    let mut ping_interval = tokio::time::interval(PING_INTERVAL);
    ping_interval.tick().await; // skip immediate

    loop {
        tokio::select! {
            _ = ping_interval.tick() => {
                if sink.send(Message::Ping(Vec::new().into())).await.is_err() {
                    break;
                }
            }

            event = next_event(&mut role_rx) => {
                if forward(&mut sink, event, &user).await.is_err() {
                    break;
                }
            }

            event = next_event(&mut tenant_rx) => {
                if forward(&mut sink, event, &user).await.is_err() {
                    break;
                }
            }

            msg = stream.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let reply = match serde_json::from_str::<HubCommand>(&text) {
                            Ok(HubCommand::JoinRoleGroup { role }) => {
                                join_role_group(&state, &user, role, &mut role_rx)
                            }
                            Ok(HubCommand::JoinTenantGroup) => {
                                let channel = tenant_channel(&user.tenant_id);
                                tenant_rx = Some(state.hub.subscribe(&channel));
                                tracing::debug!(staff_id = %user.id, channel = %channel, "Joined tenant channel");
                                HubEvent::Joined { channel }
                            }
                            Err(e) => HubEvent::Error {
                                message: format!("Unrecognized command: {}", e),
                            },
                        };
                        if send_event(&mut sink, &reply).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Pong(_))) => {}
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    _ => {}
                }
            }
        }
    }

    drop(role_rx);
    drop(tenant_rx);
    state.hub.prune();

    tracing::info!(
        tenant_id = %user.tenant_id,
        staff_id = %user.id,
        "Hub disconnected"
    );
}

/// 加入角色组 (替换之前的角色组)，组必须与令牌角色一致
fn join_role_group(
    state: &ServerState,
    user: &CurrentUser,
    role: Role,
    role_rx: &mut Option<broadcast::Receiver<HubEvent>>,
) -> HubEvent {
    if role.delivery_group() != user.role.delivery_group() {
        crate::security_log!(
            "WARN",
            "hub_role_mismatch",
            staff_id = user.id.as_str(),
            requested = role.as_str(),
            token_role = user.role.as_str()
        );
        return HubEvent::Error {
            message: format!("Role {} does not match the token role {}", role, user.role),
        };
    }

    let channel = role_channel(&user.tenant_id, role);
    *role_rx = Some(state.hub.subscribe(&channel));
    tracing::debug!(staff_id = %user.id, channel = %channel, "Joined role group");
    HubEvent::Joined { channel }
}

/// 未加入的频道永远挂起，不参与 select
async fn next_event(rx: &mut Option<broadcast::Receiver<HubEvent>>) -> Result<HubEvent, RecvError> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

/// 转发频道事件；落后的接收端丢弃错过的事件继续运行
async fn forward(
    sink: &mut WsSink,
    event: Result<HubEvent, RecvError>,
    user: &CurrentUser,
) -> Result<(), axum::Error> {
    match event {
        Ok(event) => send_event(sink, &event).await,
        Err(RecvError::Lagged(n)) => {
            tracing::warn!(staff_id = %user.id, lagged = n, "Hub subscriber lagged, events dropped");
            Ok(())
        }
        Err(RecvError::Closed) => Err(axum::Error::new("hub channel closed")),
    }
}

async fn send_event(sink: &mut WsSink, event: &HubEvent) -> Result<(), axum::Error> {
    let json = serde_json::to_string(event).map_err(axum::Error::new)?;
    sink.send(Message::Text(json.into())).await
}
