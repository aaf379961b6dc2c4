//! OrderLifecycle - 订单状态机
//!
//! # 允许的迁移
//!
//! ```text
//! Placed/Pending ──→ Preparing ──→ Ready ──→ Served ──→ Paid
//!       │                │           │          │
//!       ├──→ Declined    └───────────┴──────────┴──→ Cancelled
//!       │        └──────────────────────────────────→ Cancelled
//!       └───────────────────────────────────────────→ Cancelled
//! ```
//!
//! `Paid`、`Cancelled` 为终态；自迁移与表外迁移返回
//! [`OrderError::TransitionOutOfOrder`]，订单不变。

use chrono::Utc;
use shared::models::Customer;
use shared::order::{
    DeletedResponse, DiscountType, Order, OrderStatus, PaymentAdjustments, StatusUpdateRequest,
};

use super::changeset::ChangeSet;
use super::error::{OrderError, OrderResult};
use super::service::OrderService;
use crate::notify::Notice;

/// 迁移表
pub fn can_transition(from: OrderStatus, to: OrderStatus) -> bool {
    use OrderStatus::*;
    matches!(
        (from, to),
        (Placed | Pending, Preparing | Declined | Cancelled)
            | (Preparing, Ready | Cancelled)
            | (Ready, Served | Cancelled)
            | (Served, Paid | Cancelled)
            | (Declined, Cancelled)
    )
}

/// 经过一步或多步迁移可以到达
///
/// 离线设备可能一次同步跨过多个状态，同步路径只接受沿迁移表前进的状态。
pub fn can_reach(from: OrderStatus, to: OrderStatus) -> bool {
    let mut frontier = vec![from];
    let mut seen = vec![from];
    while let Some(status) = frontier.pop() {
        for next in OrderStatus::ALL {
            if !can_transition(status, next) {
                continue;
            }
            if next == to {
                return true;
            }
            if !seen.contains(&next) {
                seen.push(next);
                frontier.push(next);
            }
        }
    }
    false
}

impl OrderService {
    /// 执行一次状态迁移
    ///
    /// - 追加历史 `{status, timestamp, actor}`，`status` 与 `workflowStatus` 同时写入
    /// - `Paid`: 应用结账调整项，锁定改单，顾客累计与现金入账
    /// - 按新状态通知对应角色，并推送全租户订单刷新
    pub fn transition(
        &self,
        tenant_id: &str,
        order_id: &str,
        request: StatusUpdateRequest,
        actor: &str,
    ) -> OrderResult<Order> {
        let current = self.get_order(tenant_id, order_id)?;
        let to = request.new_status;
        if !can_transition(current.status, to) {
            tracing::warn!(
                order_id = %order_id,
                from = %current.status,
                to = %to,
                "Rejected out-of-order transition"
            );
            return Err(OrderError::TransitionOutOfOrder {
                order_id: order_id.to_string(),
                from: current.status,
                to,
            });
        }

        let now = Utc::now();
        let mut changes = ChangeSet::new();
        let mut order = current.clone();

        order.set_status(to, actor, now);
        self.stamp(&mut order);

        if to == OrderStatus::Paid {
            apply_adjustments(&mut order, &request.adjustments);
            self.settle_payment(&mut order, now, &mut changes);
        } else {
            if !request.adjustments.is_empty() {
                tracing::debug!(order_id = %order_id, "Payment adjustments ignored for non-payment transition");
            }
            if !to.is_amendable() && order.has_pending_amendment() {
                tracing::info!(order_id = %order_id, status = %to, "Pending amendment discarded");
                order.pending_amendment.clear();
            }
            if to == OrderStatus::Cancelled {
                changes.free_tables(&order.tenant_id, &order.table_ids);
            }
        }

        if let Some(notice) = Notice::status_changed(&order, to) {
            changes.notify(self.fanout().dispatch_notice(&order, &notice));
        }
        changes.push_order_update(&order);
        changes.stage_order(order, Some(current.version));

        let changes = self.commit(changes)?;
        tracing::info!(
            order_id = %order_id,
            tenant_id = %tenant_id,
            from = %current.status,
            to = %to,
            actor = %actor,
            "Order status changed"
        );
        committed_order(&changes, order_id)
    }

    /// 硬删除订单，撤销已入账的顾客累计与现金，释放桌台
    pub fn remove_order(&self, tenant_id: &str, order_id: &str) -> OrderResult<DeletedResponse> {
        let order = self.get_order(tenant_id, order_id)?;

        let mut changes = ChangeSet::new();
        self.reverse_payment(&order, &mut changes);
        changes.free_tables(&order.tenant_id, &order.table_ids);
        changes.remove_order(order.id.clone(), order.version);
        self.commit(changes)?;

        tracing::info!(
            order_id = %order_id,
            tenant_id = %tenant_id,
            status = %order.status,
            "Order deleted"
        );
        Ok(DeletedResponse::new(order_id))
    }

    /// 读取租户内的顾客
    pub fn get_customer(&self, tenant_id: &str, customer_id: &str) -> OrderResult<Customer> {
        match self.store().get_customer(customer_id)? {
            Some(customer) if customer.tenant_id == tenant_id => Ok(customer),
            _ => Err(OrderError::CustomerNotFound(customer_id.to_string())),
        }
    }

    /// 删除顾客，并从引用它的订单上解除关联
    pub fn remove_customer(&self, tenant_id: &str, customer_id: &str) -> OrderResult<DeletedResponse> {
        let customer = self.get_customer(tenant_id, customer_id)?;

        let mut changes = ChangeSet::new();
        let linked = self.store().orders_for_customer(&customer.id)?;
        for mut order in linked {
            let version = order.version;
            order.customer_id = None;
            changes.stage_order(order, Some(version));
        }
        changes.remove_customer(customer.id.clone());
        self.commit(changes)?;

        tracing::info!(customer_id = %customer_id, tenant_id = %tenant_id, "Customer deleted");
        Ok(DeletedResponse::new(customer_id))
    }
}

/// 结账调整项：每个字段独立覆盖
///
/// 未给出 finalTotal 但调整了服务费或折扣时重新计算。
fn apply_adjustments(order: &mut Order, adjustments: &PaymentAdjustments) {
    if let Some(method) = &adjustments.payment_method {
        order.payment_method = Some(method.clone());
    }
    if let Some(service_charge) = adjustments.service_charge {
        order.service_charge = service_charge;
    }
    if let Some(discount) = adjustments.discount {
        order.discount = discount;
    }
    if let Some(discount_type) = adjustments.discount_type {
        order.discount_type = discount_type;
    }
    if let Some(reason) = &adjustments.discount_reason {
        order.discount_reason = Some(reason.clone());
    }
    if order.discount_type == DiscountType::None {
        order.discount = 0.0;
    }

    match adjustments.final_total {
        Some(final_total) => order.final_total = final_total,
        None if adjustments.service_charge.is_some()
            || adjustments.discount.is_some()
            || adjustments.discount_type.is_some() =>
        {
            order.final_total = order.computed_final_total();
        }
        None => {}
    }
}

pub(crate) fn committed_order(changes: &ChangeSet, order_id: &str) -> OrderResult<Order> {
    changes
        .order(order_id)
        .cloned()
        .ok_or_else(|| OrderError::NotFound(order_id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_table() {
        use OrderStatus::*;
        assert!(can_transition(Placed, Preparing));
        assert!(can_transition(Pending, Declined));
        assert!(can_transition(Served, Paid));
        assert!(can_transition(Declined, Cancelled));

        assert!(!can_transition(Paid, Preparing));
        assert!(!can_transition(Cancelled, Placed));
        assert!(!can_transition(Placed, Paid));
        assert!(!can_transition(Ready, Ready));
        assert!(!can_transition(Preparing, Declined));
    }

    #[test]
    fn test_reachability_follows_the_table() {
        use OrderStatus::*;
        assert!(can_reach(Placed, Served));
        assert!(can_reach(Pending, Paid));
        assert!(can_reach(Placed, Cancelled));
        assert!(can_reach(Declined, Cancelled));

        assert!(!can_reach(Preparing, Placed));
        assert!(!can_reach(Served, Preparing));
        assert!(!can_reach(Declined, Paid));
        for to in OrderStatus::ALL {
            assert!(!can_reach(Paid, to));
            assert!(!can_reach(Cancelled, to));
        }
    }

    #[test]
    fn test_terminal_states_have_no_exit() {
        for to in [
            OrderStatus::Placed,
            OrderStatus::Pending,
            OrderStatus::Preparing,
            OrderStatus::Ready,
            OrderStatus::Served,
            OrderStatus::Paid,
            OrderStatus::Declined,
            OrderStatus::Cancelled,
        ] {
            assert!(!can_transition(OrderStatus::Paid, to));
            assert!(!can_transition(OrderStatus::Cancelled, to));
        }
    }

    #[test]
    fn test_adjustments_are_independent() {
        let mut order = Order::new("o-1", "t-1");
        order.total_amount = 40.0;
        order.final_total = 40.0;

        apply_adjustments(
            &mut order,
            &PaymentAdjustments {
                service_charge: Some(4.0),
                ..Default::default()
            },
        );
        assert_eq!(order.final_total, 44.0);

        apply_adjustments(
            &mut order,
            &PaymentAdjustments {
                discount: Some(10.0),
                discount_type: Some(DiscountType::Percentage),
                discount_reason: Some("regular".into()),
                ..Default::default()
            },
        );
        assert_eq!(order.final_total, 40.0);
        assert_eq!(order.discount_reason.as_deref(), Some("regular"));

        apply_adjustments(
            &mut order,
            &PaymentAdjustments {
                final_total: Some(42.5),
                payment_method: Some("Cash".into()),
                ..Default::default()
            },
        );
        assert_eq!(order.final_total, 42.5);
        assert!(order.is_cash_payment());
    }
}
