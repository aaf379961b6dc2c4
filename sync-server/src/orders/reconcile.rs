//! ReconciliationService - 设备批量同步
//!
//! # 单个快照的判定
//!
//! | 规范副本 | 时钟比较 | 结果 |
//! |----------|----------|------|
//! | 不存在 | - | 插入，占用桌台，新订单通知 → `Synchronized` |
//! | 存在 | 设备严格领先 | 覆盖可变字段，合并时钟 → `Updated` |
//! | 存在 | 设备领先但状态倒退 / 离开终态 | 不修改 → `Conflict - Server Wins` |
//! | 存在 | 不领先 / 时钟损坏 | 不修改 → `Conflict - Server Wins` |
//!
//! 整批在一个写事务内提交，每个写入都带规划时读到的版本号。
//! 任一冲突或存储错误使整批失败，结果只在提交成功后返回。

use std::collections::BTreeSet;

use chrono::Utc;
use shared::clock::{ClockOrdering, Superiority, VectorClock, compare_encoded, ordering};
use shared::order::{
    IncomingSnapshot, Order, OrderSnapshotDto, OrderStatus, SyncResult, SyncStatus,
};

use super::changeset::ChangeSet;
use super::error::OrderResult;
use super::lifecycle::can_reach;
use super::service::OrderService;
use crate::notify::Notice;

/// 同步写入的历史记录操作人
const SYNC_ACTOR: &str = "sync";

impl OrderService {
    /// 同步一批设备快照，每个输入返回一个结果 (顺序一致)
    ///
    /// 任一快照格式错误时整批拒绝 (`InvalidPayload`)，不做任何写入。
    pub fn reconcile(
        &self,
        tenant_id: &str,
        batch: Vec<OrderSnapshotDto>,
    ) -> OrderResult<Vec<SyncResult>> {
        let snapshots = batch
            .into_iter()
            .map(OrderSnapshotDto::into_typed)
            .collect::<Result<Vec<_>, _>>()?;

        let mut changes = ChangeSet::new();
        let mut results = Vec::with_capacity(snapshots.len());
        let mut malformed_clocks = 0usize;

        for snapshot in &snapshots {
            let status = self.plan_snapshot(tenant_id, snapshot, &mut changes, &mut malformed_clocks)?;
            results.push(SyncResult {
                order_id: snapshot.order_id.clone(),
                status,
            });
        }

        if malformed_clocks > 0 {
            tracing::warn!(
                tenant_id = %tenant_id,
                count = malformed_clocks,
                "ClockParseFailure: snapshots rejected in favour of server copy"
            );
        }

        if !changes.is_empty() {
            self.commit(changes)?;
        }

        let accepted = results.iter().filter(|r| r.status.is_accepted()).count();
        tracing::info!(
            tenant_id = %tenant_id,
            total = results.len(),
            accepted = accepted,
            "Sync batch reconciled"
        );
        Ok(results)
    }

    fn plan_snapshot(
        &self,
        tenant_id: &str,
        snapshot: &IncomingSnapshot,
        changes: &mut ChangeSet,
        malformed_clocks: &mut usize,
    ) -> OrderResult<SyncStatus> {
        // 同一批次内较早的快照对后续快照可见
        let canonical = match changes.order(&snapshot.order_id) {
            Some(staged) => Some(staged.clone()),
            None => self.store().get_order(&snapshot.order_id)?,
        };

        match canonical {
            None => {
                self.plan_insert(tenant_id, snapshot, changes);
                Ok(SyncStatus::Inserted)
            }
            Some(current) => {
                match compare_encoded(&snapshot.clock_json, &current.vector_clock.encode()) {
                    Superiority::Superior
                        if snapshot.status != current.status
                            && !can_reach(current.status, snapshot.status) =>
                    {
                        tracing::warn!(
                            order_id = %snapshot.order_id,
                            from = %current.status,
                            to = %snapshot.status,
                            "Rejected status regression from device, server copy wins"
                        );
                        Ok(SyncStatus::ConflictServerWins)
                    }
                    Superiority::Superior => {
                        self.plan_update(current, snapshot, changes);
                        Ok(SyncStatus::Updated)
                    }
                    Superiority::NotSuperior => {
                        tracing::debug!(order_id = %snapshot.order_id, "Server copy wins");
                        Ok(SyncStatus::ConflictServerWins)
                    }
                    Superiority::Malformed(e) => {
                        *malformed_clocks += 1;
                        tracing::warn!(order_id = %snapshot.order_id, error = %e, "Malformed vector clock");
                        Ok(SyncStatus::ConflictServerWins)
                    }
                }
            }
        }
    }

    fn plan_insert(&self, tenant_id: &str, snapshot: &IncomingSnapshot, changes: &mut ChangeSet) {
        let now = Utc::now();
        let clock = VectorClock::parse(&snapshot.clock_json).unwrap_or_else(|e| {
            tracing::warn!(
                order_id = %snapshot.order_id,
                error = %e,
                "Malformed vector clock on new order, stored with empty clock"
            );
            VectorClock::new()
        });

        let mut order = snapshot.to_order(tenant_id, clock);
        order.set_status(snapshot.status, actor_of(snapshot), now);
        drop_unamendable_proposal(&mut order);

        if snapshot.total_mismatch() {
            tracing::warn!(
                order_id = %order.id,
                reported = snapshot.reported_total,
                computed = order.total_amount,
                "Device total differs from line items, using computed total"
            );
        }

        if order.status == OrderStatus::Paid {
            self.settle_payment(&mut order, now, changes);
        }

        if order.status != OrderStatus::Cancelled {
            changes.occupy_tables(&order.tenant_id, &order.table_ids);
        }
        changes.notify(self.fanout().dispatch_notice(&order, &Notice::new_order(&order)));
        changes.push_order_update(&order);

        tracing::info!(
            order_id = %order.id,
            tenant_id = %order.tenant_id,
            status = %order.status,
            "Order inserted from device"
        );
        changes.stage_order(order, None);
    }

    fn plan_update(&self, current: Order, snapshot: &IncomingSnapshot, changes: &mut ChangeSet) {
        let now = Utc::now();
        // compare_encoded 已成功解析过
        let incoming_clock = VectorClock::parse(&snapshot.clock_json).unwrap_or_default();
        if ordering(&incoming_clock, &current.vector_clock) == ClockOrdering::Concurrent {
            tracing::warn!(
                order_id = %current.id,
                incoming = %incoming_clock,
                canonical = %current.vector_clock,
                "Divergent clocks, accepting incoming copy (last reconciler wins)"
            );
        }

        let expected_version = current.version;
        let mut order = current.clone();
        snapshot.overwrite(&mut order);
        if current.status == OrderStatus::Paid {
            // 已入账金额固定，删除时才能对称撤销
            order.final_total = current.final_total;
            order.payment_method = current.payment_method.clone();
            order.customer_id = current.customer_id.clone();
        }

        if snapshot.status != current.status {
            order.set_status(snapshot.status, actor_of(snapshot), now);
        }
        order.vector_clock.merge(&incoming_clock);
        order.can_amend = snapshot.can_amend && order.status != OrderStatus::Paid;
        drop_unamendable_proposal(&mut order);

        let is_payment = current.status != OrderStatus::Paid && order.status == OrderStatus::Paid;
        let is_amendment = order.items != current.items
            || order.notes != current.notes
            || order.pending_amendment != current.pending_amendment;

        if is_payment {
            self.settle_payment(&mut order, now, changes);
        }

        let newly_referenced: BTreeSet<&String> =
            order.table_ids.difference(&current.table_ids).collect();
        changes.occupy_tables(&order.tenant_id, newly_referenced);
        if order.status == OrderStatus::Cancelled {
            changes.free_tables(&order.tenant_id, &order.table_ids);
        }
        let released: BTreeSet<&String> = current.table_ids.difference(&order.table_ids).collect();
        changes.free_tables(&order.tenant_id, released);

        if is_payment {
            changes.notify(
                self.fanout()
                    .dispatch_notice(&order, &Notice::payment_received(&order)),
            );
        } else if is_amendment {
            changes.notify(self.fanout().dispatch_notice(&order, &Notice::amended(&order)));
        }
        changes.push_order_update(&order);

        tracing::info!(
            order_id = %order.id,
            tenant_id = %order.tenant_id,
            status = %order.status,
            payment = is_payment,
            amendment = is_amendment,
            "Order updated from device"
        );
        changes.stage_order(order, Some(expected_version));
    }
}

fn actor_of(snapshot: &IncomingSnapshot) -> String {
    snapshot
        .staff_id
        .clone()
        .unwrap_or_else(|| SYNC_ACTOR.to_string())
}

/// 不可改单状态下携带的改单提案直接丢弃
fn drop_unamendable_proposal(order: &mut Order) {
    if order.has_pending_amendment() && !(order.can_amend && order.status.is_amendable()) {
        tracing::warn!(
            order_id = %order.id,
            status = %order.status,
            "Dropping amendment proposal on non-amendable order"
        );
        order.pending_amendment.clear();
    }
}
