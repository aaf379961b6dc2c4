//! AmendmentProtocol - 改单提案与审批
//!
//! ```text
//! propose(deltas)          → pendingAmendment = deltas (整体替换)
//! respond(approve = true)  → 应用增量，重算总额，清空批次
//! respond(approve = false) → 清空批次，订单行不变
//! ```

use shared::order::money::{money_eq, validate_line_item};
use shared::order::{AmendmentDelta, AmendmentResponseRequest, LineItem, Order};

use super::changeset::ChangeSet;
use super::error::{OrderError, OrderResult};
use super::lifecycle::committed_order;
use super::service::OrderService;
use crate::notify::Notice;

impl OrderService {
    /// 提交改单提案，替换任何已存在的待审批批次
    pub fn propose_amendment(
        &self,
        tenant_id: &str,
        order_id: &str,
        deltas: Vec<AmendmentDelta>,
    ) -> OrderResult<Order> {
        let current = self.get_order(tenant_id, order_id)?;
        ensure_amendable(&current)?;
        if deltas.is_empty() {
            return Err(OrderError::InvalidPayload(
                "amendment proposal has no changes".to_string(),
            ));
        }
        for delta in &deltas {
            if let AmendmentDelta::Add { item } = delta {
                validate_items(std::slice::from_ref(item))?;
            }
        }

        let mut order = current.clone();
        if order.has_pending_amendment() {
            tracing::info!(order_id = %order_id, "Replacing pending amendment batch");
        }
        order.pending_amendment = deltas;
        self.stamp(&mut order);

        let mut changes = ChangeSet::new();
        changes.notify(
            self.fanout()
                .dispatch_notice(&order, &Notice::amendment_proposed(&order)),
        );
        changes.push_order_update(&order);
        changes.stage_order(order, Some(current.version));

        let changes = self.commit(changes)?;
        tracing::info!(order_id = %order_id, tenant_id = %tenant_id, "Amendment proposed");
        committed_order(&changes, order_id)
    }

    /// 审批改单
    ///
    /// 服务端持有待审批批次时按批次处理；没有批次时，`updatedItemsJson`
    /// (已在本地应用改单的旧设备) 在批准时替换订单行。两者都没有则
    /// 返回 [`OrderError::NoPendingAmendment`]。`updatedTotal` 不被采信。
    pub fn respond_amendment(
        &self,
        tenant_id: &str,
        order_id: &str,
        request: AmendmentResponseRequest,
        actor: &str,
    ) -> OrderResult<Order> {
        let current = self.get_order(tenant_id, order_id)?;
        if current.status.is_terminal() {
            return Err(OrderError::NotAmendable {
                order_id: order_id.to_string(),
                status: current.status,
            });
        }

        let mut order = current.clone();
        if order.has_pending_amendment() {
            if request.approve {
                order.apply_pending_amendment();
            } else {
                order.pending_amendment.clear();
            }
        } else {
            let Some(raw_items) = request.updated_items_json.as_deref() else {
                return Err(OrderError::NoPendingAmendment(order_id.to_string()));
            };
            if request.approve {
                let items: Vec<LineItem> = serde_json::from_str(raw_items).map_err(|e| {
                    OrderError::InvalidPayload(format!("malformed updatedItemsJson: {}", e))
                })?;
                validate_items(&items)?;
                // 旧设备发送的是应用后的完整订单行
                order.items = items;
                order.recompute_totals();
            }
        }

        let ignored_total = request
            .updated_total
            .filter(|reported| request.approve && !money_eq(*reported, order.total_amount));
        if let Some(reported) = ignored_total {
            tracing::warn!(
                order_id = %order_id,
                reported = reported,
                computed = order.total_amount,
                "Ignoring device-reported amendment total"
            );
        }
        self.stamp(&mut order);

        let mut changes = ChangeSet::new();
        changes.notify(self.fanout().dispatch_notice(
            &order,
            &Notice::amendment_resolved(&order, request.approve),
        ));
        changes.push_order_update(&order);
        changes.stage_order(order, Some(current.version));

        let changes = self.commit(changes)?;
        tracing::info!(
            order_id = %order_id,
            tenant_id = %tenant_id,
            approve = request.approve,
            actor = %actor,
            "Amendment resolved"
        );
        committed_order(&changes, order_id)
    }
}

fn validate_items(items: &[LineItem]) -> OrderResult<()> {
    items
        .iter()
        .try_for_each(validate_line_item)
        .map_err(OrderError::InvalidPayload)
}

fn ensure_amendable(order: &Order) -> OrderResult<()> {
    if order.can_amend && order.status.is_amendable() {
        Ok(())
    } else {
        Err(OrderError::NotAmendable {
            order_id: order.id.clone(),
            status: order.status,
        })
    }
}
