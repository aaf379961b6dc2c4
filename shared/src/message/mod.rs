//! 员工角色与实时推送消息
//!
//! 这些类型在 sync-server 和设备之间共享，用于通知持久化、
//! WebSocket 推送以及角色分组。
//!
//! # 投递分组
//!
//! | 角色 | 推送分组 |
//! |------|----------|
//! | Kitchen / Chef / Assistant Chef | `Kitchen` |
//! | 其他角色 | 自身 |
//!
//! 推送频道：`tenant:{tenantId}:{group}` (角色组) 与 `tenant:{tenantId}` (全租户)。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub mod payload;
pub use payload::*;

/// 员工角色 (JWT `role` claim)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    Kitchen,
    Chef,
    #[serde(rename = "Assistant Chef", alias = "AssistantChef")]
    AssistantChef,
    Admin,
    Manager,
    Owner,
    Till,
    Waiter,
}

impl Role {
    pub const ALL: [Role; 8] = [
        Role::Kitchen,
        Role::Chef,
        Role::AssistantChef,
        Role::Admin,
        Role::Manager,
        Role::Owner,
        Role::Till,
        Role::Waiter,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Kitchen => "Kitchen",
            Role::Chef => "Chef",
            Role::AssistantChef => "Assistant Chef",
            Role::Admin => "Admin",
            Role::Manager => "Manager",
            Role::Owner => "Owner",
            Role::Till => "Till",
            Role::Waiter => "Waiter",
        }
    }

    pub fn is_kitchen_family(&self) -> bool {
        matches!(self, Role::Kitchen | Role::Chef | Role::AssistantChef)
    }

    /// 厨房角色合并为一个推送分组
    pub fn delivery_group(&self) -> Role {
        if self.is_kitchen_family() {
            Role::Kitchen
        } else {
            *self
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_')
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "kitchen" => Ok(Role::Kitchen),
            "chef" => Ok(Role::Chef),
            "assistantchef" => Ok(Role::AssistantChef),
            "admin" => Ok(Role::Admin),
            "manager" => Ok(Role::Manager),
            "owner" => Ok(Role::Owner),
            "till" => Ok(Role::Till),
            "waiter" => Ok(Role::Waiter),
            _ => Err(UnknownRole(s.to_string())),
        }
    }
}

/// 通知级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Success => write!(f, "success"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// 角色组频道
pub fn role_channel(tenant_id: &str, group: Role) -> String {
    format!("tenant:{}:{}", tenant_id, group.delivery_group().as_str())
}

/// 全租户频道
pub fn tenant_channel(tenant_id: &str) -> String {
    format!("tenant:{}", tenant_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kitchen_family_collapses() {
        assert_eq!(Role::Chef.delivery_group(), Role::Kitchen);
        assert_eq!(Role::AssistantChef.delivery_group(), Role::Kitchen);
        assert_eq!(Role::Kitchen.delivery_group(), Role::Kitchen);
        assert_eq!(Role::Waiter.delivery_group(), Role::Waiter);
        assert_eq!(Role::Till.delivery_group(), Role::Till);
    }

    #[test]
    fn test_role_wire_names() {
        assert_eq!(
            serde_json::to_string(&Role::AssistantChef).unwrap(),
            "\"Assistant Chef\""
        );
        let parsed: Role = serde_json::from_str("\"AssistantChef\"").unwrap();
        assert_eq!(parsed, Role::AssistantChef);
        assert_eq!("assistant chef".parse::<Role>(), Ok(Role::AssistantChef));
        assert_eq!("WAITER".parse::<Role>(), Ok(Role::Waiter));
        assert!("Sommelier".parse::<Role>().is_err());
    }

    #[test]
    fn test_channel_keys() {
        assert_eq!(role_channel("t1", Role::Chef), "tenant:t1:Kitchen");
        assert_eq!(role_channel("t1", Role::Manager), "tenant:t1:Manager");
        assert_eq!(tenant_channel("t1"), "tenant:t1");
    }
}
