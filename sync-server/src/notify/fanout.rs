//! NotificationFanout
//!
//! 一次分发 = 每个原始角色一条持久化记录 + 每个折叠分组一条实时推送。
//!
//! ```text
//! dispatch(roles = [Kitchen, Chef, Waiter])
//!     ├─ rows:   Kitchen, Chef, Waiter          (persist, 调用方事务内)
//!     └─ pushes: tenant:{t}:Kitchen, tenant:{t}:Waiter   (publish, 提交之后)
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use redb::WriteTransaction;
use shared::message::{
    HubEvent, Notification, NotificationPush, OrderUpdatePush, Role, Severity, role_channel,
    tenant_channel,
};
use shared::order::Order;
use shared::util::new_id;

use super::{Notice, NotificationHub};
use crate::store::{OrderStore, StorageResult};

/// 已构建、尚未持久化的一次分发
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatch {
    pub order_id: String,
    pub tenant_id: String,
    pub title: String,
    pub message: String,
    pub severity: Severity,
    pub created_at: DateTime<Utc>,
    /// 每个原始角色一条
    pub rows: Vec<Notification>,
}

impl Dispatch {
    /// 折叠后的推送分组，值为该分组推送使用的通知 id
    pub fn groups(&self) -> BTreeMap<Role, &str> {
        let mut groups = BTreeMap::new();
        for row in &self.rows {
            groups
                .entry(row.target_role.delivery_group())
                .or_insert(row.id.as_str());
        }
        groups
    }

    /// 原始角色 (去重后，保持顺序)
    pub fn roles(&self) -> Vec<Role> {
        self.rows.iter().map(|r| r.target_role).collect()
    }

    fn push_payload(&self, id: &str) -> NotificationPush {
        NotificationPush {
            id: id.to_string(),
            title: self.title.clone(),
            message: self.message.clone(),
            severity: self.severity,
            order_id: self.order_id.clone(),
            timestamp: self.created_at,
        }
    }
}

/// 通知分发：持久化 + 实时推送
#[derive(Clone)]
pub struct NotificationFanout {
    store: OrderStore,
    hub: NotificationHub,
}

impl NotificationFanout {
    pub fn new(store: OrderStore, hub: NotificationHub) -> Self {
        Self { store, hub }
    }

    pub fn hub(&self) -> &NotificationHub {
        &self.hub
    }

    /// 构建分发：每个原始角色一行 (重复角色只保留一次)
    pub fn dispatch(
        &self,
        order_id: &str,
        tenant_id: &str,
        roles: &[Role],
        title: &str,
        message: &str,
        severity: Severity,
    ) -> Dispatch {
        let created_at = Utc::now();
        let mut rows: Vec<Notification> = Vec::with_capacity(roles.len());
        for role in roles {
            if rows.iter().any(|r| r.target_role == *role) {
                continue;
            }
            rows.push(Notification {
                id: new_id(),
                order_id: order_id.to_string(),
                tenant_id: tenant_id.to_string(),
                target_role: *role,
                title: title.to_string(),
                message: message.to_string(),
                severity,
                created_at,
                is_read: false,
            });
        }

        Dispatch {
            order_id: order_id.to_string(),
            tenant_id: tenant_id.to_string(),
            title: title.to_string(),
            message: message.to_string(),
            severity,
            created_at,
            rows,
        }
    }

    /// 按订单与通知内容构建分发
    pub fn dispatch_notice(&self, order: &Order, notice: &Notice) -> Dispatch {
        self.dispatch(
            &order.id,
            &order.tenant_id,
            notice.roles,
            notice.title,
            &notice.message,
            notice.severity,
        )
    }

    /// 在调用方事务内写入通知行
    pub fn persist(&self, txn: &WriteTransaction, dispatch: &Dispatch) -> StorageResult<()> {
        for row in &dispatch.rows {
            self.store.append_notification(txn, row)?;
        }
        Ok(())
    }

    /// 实时推送 (提交之后调用)，每个折叠分组一条
    pub fn publish(&self, dispatch: &Dispatch) {
        for (group, id) in dispatch.groups() {
            let channel = role_channel(&dispatch.tenant_id, group);
            let delivered = self.hub.publish(
                &channel,
                HubEvent::ReceiveNotification(dispatch.push_payload(id)),
            );
            tracing::debug!(
                channel = %channel,
                order_id = %dispatch.order_id,
                delivered,
                "Notification pushed"
            );
        }
    }

    /// 全租户订单刷新推送
    pub fn publish_order_update(&self, tenant_id: &str, update: OrderUpdatePush) {
        let channel = tenant_channel(tenant_id);
        self.hub
            .publish(&channel, HubEvent::ReceiveOrderUpdate(update));
    }
}
