use super::{Role, Severity};
use crate::order::OrderStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==================== Durable Notification ====================

/// 持久化通知 (每个原始角色一行)
///
/// 创建后只会修改 `isRead`。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub order_id: String,
    pub tenant_id: String,
    pub target_role: Role,
    #[serde(default)]
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub severity: Severity,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub is_read: bool,
}

// ==================== Push Payloads ====================

/// `ReceiveNotification` 推送载荷 (每个分组一条)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPush {
    pub id: String,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub severity: Severity,
    pub order_id: String,
    pub timestamp: DateTime<Utc>,
}

/// `ReceiveOrderUpdate` 推送载荷 (全租户频道)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderUpdatePush {
    pub id: String,
    pub status: OrderStatus,
}

// ==================== Hub Protocol ====================

/// 服务端 → 设备
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum HubEvent {
    ReceiveNotification(NotificationPush),
    ReceiveOrderUpdate(OrderUpdatePush),
    /// 加入频道确认
    Joined { channel: String },
    Error { message: String },
}

/// 设备 → 服务端
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum HubCommand {
    /// 加入角色组；再次发送会替换之前的角色组
    JoinRoleGroup { role: Role },
    JoinTenantGroup,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hub_command_wire_format() {
        let cmd: HubCommand =
            serde_json::from_str(r#"{"type":"JoinRoleGroup","role":"Assistant Chef"}"#).unwrap();
        assert_eq!(
            cmd,
            HubCommand::JoinRoleGroup {
                role: Role::AssistantChef
            }
        );
        let cmd: HubCommand = serde_json::from_str(r#"{"type":"JoinTenantGroup"}"#).unwrap();
        assert_eq!(cmd, HubCommand::JoinTenantGroup);
    }

    #[test]
    fn test_hub_event_wire_format() {
        let event = HubEvent::ReceiveOrderUpdate(OrderUpdatePush {
            id: "o-1".into(),
            status: OrderStatus::Ready,
        });
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            serde_json::json!({"type": "ReceiveOrderUpdate", "payload": {"id": "o-1", "status": "Ready"}})
        );
    }

    #[test]
    fn test_notification_uses_type_field() {
        let n = Notification {
            id: "n-1".into(),
            order_id: "o-1".into(),
            tenant_id: "t-1".into(),
            target_role: Role::Chef,
            title: "New Order Placed".into(),
            message: "hi".into(),
            severity: Severity::Success,
            created_at: Utc::now(),
            is_read: false,
        };
        let value = serde_json::to_value(&n).unwrap();
        assert_eq!(value["type"], "success");
        assert_eq!(value["targetRole"], "Chef");
        assert_eq!(value["isRead"], false);
    }
}
