//! 订单事件 → 通知内容 (角色集合、标题、文案、级别)

use shared::message::{Role, Severity};
use shared::order::{Order, OrderStatus};

use Role::*;

/// 新订单
pub const NEW_ORDER_ROLES: &[Role] = &[Kitchen, Chef, AssistantChef, Admin, Manager, Owner];
/// 收款
pub const PAYMENT_ROLES: &[Role] = &[
    Till,
    Admin,
    Manager,
    Kitchen,
    Chef,
    AssistantChef,
    Waiter,
    Owner,
];
/// 同步时检测到的改单、改单提案
pub const AMENDMENT_ROLES: &[Role] = &[Kitchen, Chef, AssistantChef, Admin, Manager, Owner];
/// 改单审批结果
pub const AMENDMENT_RESPONSE_ROLES: &[Role] = &[
    Waiter,
    Chef,
    AssistantChef,
    Kitchen,
    Admin,
    Manager,
    Owner,
];
/// 接单 / 拒单 / 出餐
const FLOOR_ROLES: &[Role] = &[Waiter, Manager, Admin, Owner];
/// 已上菜
const SERVED_ROLES: &[Role] = &[Manager, Kitchen, Chef, AssistantChef, Admin, Owner];
/// 已结账
const PAID_ROLES: &[Role] = &[
    Admin,
    Manager,
    Kitchen,
    Chef,
    AssistantChef,
    Waiter,
    Till,
    Owner,
];
/// 已取消
const CANCELLED_ROLES: &[Role] = &[
    Waiter,
    Kitchen,
    Chef,
    AssistantChef,
    Manager,
    Admin,
    Owner,
];

/// 一次待分发的通知
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub roles: &'static [Role],
    pub title: &'static str,
    pub message: String,
    pub severity: Severity,
}

impl Notice {
    pub fn new_order(order: &Order) -> Self {
        Self {
            roles: NEW_ORDER_ROLES,
            title: "New Order Placed",
            message: format!(
                "New Order placed by {} ({})",
                order.customer_name,
                order.table_label()
            ),
            severity: Severity::Info,
        }
    }

    pub fn payment_received(order: &Order) -> Self {
        Self {
            roles: PAYMENT_ROLES,
            title: "Payment Received",
            message: format!("Payment received for {}", order.table_label()),
            severity: Severity::Success,
        }
    }

    pub fn amended(order: &Order) -> Self {
        Self {
            roles: AMENDMENT_ROLES,
            title: "Order Amended",
            message: format!("Order for {} has been amended.", order.table_label()),
            severity: Severity::Info,
        }
    }

    pub fn amendment_proposed(order: &Order) -> Self {
        Self {
            roles: AMENDMENT_ROLES,
            title: "Amendment Requested",
            message: format!(
                "Changes requested for order on {} ({} change(s))",
                order.table_label(),
                order.pending_amendment.len()
            ),
            severity: Severity::Info,
        }
    }

    pub fn amendment_resolved(order: &Order, approved: bool) -> Self {
        let (title, action, severity) = if approved {
            ("Amendment Approved", "ACCEPTED", Severity::Success)
        } else {
            ("Amendment Declined", "DECLINED", Severity::Warning)
        };
        Self {
            roles: AMENDMENT_RESPONSE_ROLES,
            title,
            message: format!(
                "Kitchen has {} changes for order on {}",
                action,
                order.table_label()
            ),
            severity,
        }
    }

    /// 状态变更通知 (按新状态查表)
    ///
    /// Placed / Pending 不会作为迁移目标出现，返回 None。
    pub fn status_changed(order: &Order, status: OrderStatus) -> Option<Self> {
        let label = order.table_label();
        let (roles, message, severity) = match status {
            OrderStatus::Preparing => (
                FLOOR_ROLES,
                format!("Kitchen ACCEPTED order for {}", label),
                Severity::Info,
            ),
            OrderStatus::Declined => (
                FLOOR_ROLES,
                format!("Kitchen DECLINED order for {}", label),
                Severity::Error,
            ),
            OrderStatus::Ready => (
                FLOOR_ROLES,
                format!("Order for {} is READY to serve!", label),
                Severity::Success,
            ),
            OrderStatus::Served => (
                SERVED_ROLES,
                format!("Order for {} has been SERVED.", label),
                Severity::Info,
            ),
            OrderStatus::Paid => (
                PAID_ROLES,
                format!("Payment received for {}", label),
                Severity::Success,
            ),
            OrderStatus::Cancelled => (
                CANCELLED_ROLES,
                format!("Order for {} has been CANCELLED.", label),
                Severity::Warning,
            ),
            OrderStatus::Placed | OrderStatus::Pending => return None,
        };

        let title = if severity == Severity::Error {
            "Order Alert"
        } else {
            match status {
                OrderStatus::Preparing => "Kitchen Accepted",
                OrderStatus::Ready => "Order Ready",
                OrderStatus::Paid => "Payment Received",
                _ => "Order Update",
            }
        };

        Some(Self {
            roles,
            title,
            message,
            severity,
        })
    }
}
