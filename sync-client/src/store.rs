//! 设备本地订单容器
//!
//! 设备上的所有修改都表达为 [`DeviceCommand`]，由 [`DeviceStore::apply`] 执行：
//! 只递增本设备在向量时钟中的计数器，并把订单标记为 `Offline`，等待下一次
//! 同步。跨设备传播只经过服务端的同步裁决，没有其他广播通道。
//!
//! ```text
//! apply(cmd)            → Offline
//! push → Updated/Inserted → Synchronized
//! push → Conflict       → Conflicted → 下次拉取被服务端副本覆盖
//! ```

use std::collections::{BTreeMap, BTreeSet};

use chrono::Utc;
use shared::clock::{VectorClock, is_superior};
use shared::order::{
    AmendmentDelta, Order, OrderSnapshotDto, OrderStatus, SyncResult, SyncStatus,
};

use crate::{ClientError, ClientResult};

/// 本地订单的同步状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// 有未推送的本地修改
    Offline,
    /// 与服务端一致
    Synchronized,
    /// 服务端拒绝了本地副本，等待拉取覆盖
    Conflicted,
}

/// 设备持有的订单副本
#[derive(Debug, Clone, PartialEq)]
pub struct LocalOrder {
    pub order: Order,
    pub sync_state: SyncState,
}

/// 设备端的离散修改命令
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCommand {
    /// 新下单
    PlaceOrder(Order),
    /// 编辑订单字段 (整单替换，时钟和版本保留本地值)
    UpdateOrder(Order),
    /// 提交改单提案 (替换已有批次)
    ProposeAmendment {
        order_id: String,
        deltas: Vec<AmendmentDelta>,
    },
    /// 记录本设备对改单的审批结果
    RecordAmendmentResponse { order_id: String, approve: bool },
    /// 状态变更
    ChangeStatus {
        order_id: String,
        status: OrderStatus,
        actor: String,
    },
    /// 删除本地订单
    RemoveOrder { order_id: String },
}

/// 一次拉取合并的统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeSummary {
    /// 采用服务端副本
    pub replaced: usize,
    /// 保留领先于服务端的本地离线副本
    pub kept_local: usize,
    /// 服务端已不存在的已同步订单
    pub removed: usize,
    /// 无法解析的服务端快照
    pub skipped: usize,
}

/// 设备本地状态容器
#[derive(Debug, Clone)]
pub struct DeviceStore {
    device_id: String,
    tenant_id: String,
    orders: BTreeMap<String, LocalOrder>,
    /// 已在本地审批、服务端可能仍显示待审批批次的订单
    processed_amendments: BTreeSet<String>,
}

impl DeviceStore {
    pub fn new(device_id: impl Into<String>, tenant_id: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            tenant_id: tenant_id.into(),
            orders: BTreeMap::new(),
            processed_amendments: BTreeSet::new(),
        }
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    pub fn get(&self, order_id: &str) -> Option<&LocalOrder> {
        self.orders.get(order_id)
    }

    pub fn orders(&self) -> impl Iterator<Item = &LocalOrder> {
        self.orders.values()
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// 订单是否处于改单回声保护中
    pub fn is_guarded(&self, order_id: &str) -> bool {
        self.processed_amendments.contains(order_id)
    }

    /// 执行一条本地命令
    pub fn apply(&mut self, command: DeviceCommand) -> ClientResult<()> {
        match command {
            DeviceCommand::PlaceOrder(mut order) => {
                if self.orders.contains_key(&order.id) {
                    return Err(ClientError::DuplicateOrder(order.id));
                }
                order.tenant_id = self.tenant_id.clone();
                if order.status_history.is_empty() {
                    let actor = order.staff_id.clone().unwrap_or_else(|| self.device_id.clone());
                    order.set_status(order.status, actor, Utc::now());
                }
                self.stage(order);
            }
            DeviceCommand::UpdateOrder(mut order) => {
                let current = self.local_order(&order.id)?;
                order.vector_clock = current.vector_clock.clone();
                order.version = current.version;
                order.tenant_id = self.tenant_id.clone();
                self.stage(order);
            }
            DeviceCommand::ProposeAmendment { order_id, deltas } => {
                let mut order = self.local_order(&order_id)?.clone();
                order.pending_amendment = deltas;
                self.stage(order);
            }
            DeviceCommand::RecordAmendmentResponse { order_id, approve } => {
                let mut order = self.local_order(&order_id)?.clone();
                if approve {
                    order.apply_pending_amendment();
                } else {
                    order.pending_amendment.clear();
                }
                self.processed_amendments.insert(order_id);
                self.stage(order);
            }
            DeviceCommand::ChangeStatus {
                order_id,
                status,
                actor,
            } => {
                let mut order = self.local_order(&order_id)?.clone();
                let now = Utc::now();
                order.set_status(status, actor, now);
                if status == OrderStatus::Paid {
                    order.can_amend = false;
                    order.paid_at = Some(now);
                }
                self.stage(order);
            }
            DeviceCommand::RemoveOrder { order_id } => {
                if self.orders.remove(&order_id).is_none() {
                    return Err(ClientError::UnknownOrder(order_id));
                }
                self.processed_amendments.remove(&order_id);
            }
        }
        Ok(())
    }

    fn local_order(&self, order_id: &str) -> ClientResult<&Order> {
        self.orders
            .get(order_id)
            .map(|local| &local.order)
            .ok_or_else(|| ClientError::UnknownOrder(order_id.to_string()))
    }

    /// 递增本设备计数器并标记为离线
    fn stage(&mut self, mut order: Order) {
        order.vector_clock.tick(&self.device_id);
        self.orders.insert(
            order.id.clone(),
            LocalOrder {
                order,
                sync_state: SyncState::Offline,
            },
        );
    }

    /// 所有离线订单的 wire 快照
    pub fn pending_batch(&self) -> Vec<OrderSnapshotDto> {
        self.orders
            .values()
            .filter(|local| local.sync_state == SyncState::Offline)
            .map(|local| local.order.to_snapshot())
            .collect()
    }

    /// 处理推送结果
    ///
    /// 推送之后又被本地修改的订单 (时钟与推送时不同) 保持离线，
    /// 下一次推送携带新修改。
    pub fn apply_sync_results(&mut self, pushed: &[OrderSnapshotDto], results: &[SyncResult]) {
        for result in results {
            let Some(sent) = pushed.iter().find(|s| s.order_id == result.order_id) else {
                tracing::warn!(order_id = %result.order_id, "Sync result for an order that was not pushed");
                continue;
            };
            let Some(local) = self.orders.get_mut(&result.order_id) else {
                continue;
            };
            if local.order.vector_clock.encode() != sent.vector_clock {
                continue;
            }
            local.sync_state = match result.status {
                SyncStatus::Inserted | SyncStatus::Updated => SyncState::Synchronized,
                SyncStatus::ConflictServerWins => {
                    tracing::info!(order_id = %result.order_id, "Server kept its copy");
                    SyncState::Conflicted
                }
            };
        }
    }

    /// 合并服务端拉取结果
    ///
    /// 服务端是权威来源，例外是时钟领先于服务端的本地离线副本 (下次推送)；
    /// 服务端不知道的本地离线订单保留。
    pub fn merge_pull(&mut self, server_orders: Vec<OrderSnapshotDto>) -> MergeSummary {
        let mut summary = MergeSummary::default();
        let mut merged = BTreeMap::new();

        for dto in server_orders {
            let snapshot = match dto.into_typed() {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping malformed server order");
                    summary.skipped += 1;
                    continue;
                }
            };
            let clock = VectorClock::parse(&snapshot.clock_json).unwrap_or_else(|e| {
                tracing::warn!(order_id = %snapshot.order_id, error = %e, "Server clock unreadable");
                VectorClock::new()
            });
            let mut server_order = snapshot.to_order(&self.tenant_id, clock);

            // 改单回声保护：本地已审批，服务端副本可能还是旧的待审批状态
            if self.processed_amendments.contains(&server_order.id) {
                if server_order.has_pending_amendment() {
                    server_order.pending_amendment.clear();
                } else {
                    self.processed_amendments.remove(&server_order.id);
                }
            }

            match self.orders.remove(&server_order.id) {
                Some(local)
                    if local.sync_state == SyncState::Offline
                        && is_superior(&local.order.vector_clock, &server_order.vector_clock) =>
                {
                    summary.kept_local += 1;
                    merged.insert(server_order.id.clone(), local);
                }
                _ => {
                    summary.replaced += 1;
                    merged.insert(
                        server_order.id.clone(),
                        LocalOrder {
                            order: server_order,
                            sync_state: SyncState::Synchronized,
                        },
                    );
                }
            }
        }

        // 服务端未返回的订单：离线的保留，其余视为已删除
        for (order_id, local) in std::mem::take(&mut self.orders) {
            if local.sync_state == SyncState::Offline {
                summary.kept_local += 1;
                merged.insert(order_id, local);
            } else {
                summary.removed += 1;
            }
        }

        self.orders = merged;
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::order::LineItem;

    const TENANT: &str = "tenant-1";

    fn new_order(order_id: &str) -> Order {
        let mut order = Order::new(order_id, TENANT);
        order.customer_name = "Ada".to_string();
        order.items = vec![LineItem::new("p1", "Pizza", 9.5, 2)];
        order.recompute_totals();
        order
    }

    fn placed(store: &mut DeviceStore, order_id: &str) {
        store
            .apply(DeviceCommand::PlaceOrder(new_order(order_id)))
            .unwrap();
    }

    fn server_copy(order_id: &str, clock: &str) -> OrderSnapshotDto {
        let mut dto = new_order(order_id).to_snapshot();
        dto.vector_clock = clock.to_string();
        dto
    }

    fn result(order_id: &str, status: SyncStatus) -> SyncResult {
        SyncResult {
            order_id: order_id.to_string(),
            status,
        }
    }

    #[test]
    fn test_commands_tick_only_own_counter() {
        let mut store = DeviceStore::new("tab-1", TENANT);
        placed(&mut store, "o-1");
        store
            .apply(DeviceCommand::ChangeStatus {
                order_id: "o-1".into(),
                status: OrderStatus::Preparing,
                actor: "chef-1".into(),
            })
            .unwrap();

        let local = store.get("o-1").unwrap();
        assert_eq!(local.sync_state, SyncState::Offline);
        assert_eq!(local.order.vector_clock, VectorClock::from([("tab-1", 2)]));
        assert_eq!(local.order.workflow_status, OrderStatus::Preparing);
        assert_eq!(local.order.status_history.len(), 2);
    }

    #[test]
    fn test_update_cannot_forge_clock() {
        let mut store = DeviceStore::new("tab-1", TENANT);
        placed(&mut store, "o-1");

        let mut edited = store.get("o-1").unwrap().order.clone();
        edited.notes = "extra napkins".to_string();
        edited.vector_clock = VectorClock::from([("tab-1", 99), ("tab-2", 7)]);
        store.apply(DeviceCommand::UpdateOrder(edited)).unwrap();

        let local = store.get("o-1").unwrap();
        assert_eq!(local.order.notes, "extra napkins");
        assert_eq!(local.order.vector_clock, VectorClock::from([("tab-1", 2)]));
    }

    #[test]
    fn test_unknown_and_duplicate_orders() {
        let mut store = DeviceStore::new("tab-1", TENANT);
        placed(&mut store, "o-1");
        assert!(matches!(
            store.apply(DeviceCommand::PlaceOrder(new_order("o-1"))),
            Err(ClientError::DuplicateOrder(_))
        ));
        assert!(matches!(
            store.apply(DeviceCommand::RemoveOrder {
                order_id: "nope".into()
            }),
            Err(ClientError::UnknownOrder(_))
        ));
    }

    #[test]
    fn test_payment_locks_amendments_locally() {
        let mut store = DeviceStore::new("till", TENANT);
        placed(&mut store, "o-1");
        store
            .apply(DeviceCommand::ChangeStatus {
                order_id: "o-1".into(),
                status: OrderStatus::Paid,
                actor: "till-1".into(),
            })
            .unwrap();
        let order = &store.get("o-1").unwrap().order;
        assert!(!order.can_amend);
        assert!(order.paid_at.is_some());
    }

    #[test]
    fn test_sync_results_update_states() {
        let mut store = DeviceStore::new("tab-1", TENANT);
        placed(&mut store, "o-1");
        placed(&mut store, "o-2");

        let batch = store.pending_batch();
        assert_eq!(batch.len(), 2);
        store.apply_sync_results(
            &batch,
            &[
                result("o-1", SyncStatus::Inserted),
                result("o-2", SyncStatus::ConflictServerWins),
            ],
        );

        assert_eq!(store.get("o-1").unwrap().sync_state, SyncState::Synchronized);
        assert_eq!(store.get("o-2").unwrap().sync_state, SyncState::Conflicted);
        assert!(store.pending_batch().is_empty());
    }

    #[test]
    fn test_edit_during_push_stays_offline() {
        let mut store = DeviceStore::new("tab-1", TENANT);
        placed(&mut store, "o-1");
        let batch = store.pending_batch();

        store
            .apply(DeviceCommand::ProposeAmendment {
                order_id: "o-1".into(),
                deltas: vec![AmendmentDelta::Delete {
                    item_id: "p1".into(),
                }],
            })
            .unwrap();
        store.apply_sync_results(&batch, &[result("o-1", SyncStatus::Updated)]);

        assert_eq!(store.get("o-1").unwrap().sync_state, SyncState::Offline);
        assert_eq!(store.pending_batch().len(), 1);
    }

    #[test]
    fn test_pull_replaces_synchronized_and_conflicted_copies() {
        let mut store = DeviceStore::new("tab-1", TENANT);
        placed(&mut store, "o-1");
        placed(&mut store, "o-2");
        let batch = store.pending_batch();
        store.apply_sync_results(
            &batch,
            &[
                result("o-1", SyncStatus::Inserted),
                result("o-2", SyncStatus::ConflictServerWins),
            ],
        );

        let mut server_o1 = server_copy("o-1", r#"{"tab-1":1,"tab-2":1}"#);
        server_o1.notes = "edited elsewhere".to_string();
        let server_o2 = server_copy("o-2", r#"{"tab-9":4}"#);
        let summary = store.merge_pull(vec![server_o1, server_o2]);

        assert_eq!(summary.replaced, 2);
        assert_eq!(store.get("o-1").unwrap().order.notes, "edited elsewhere");
        let o2 = store.get("o-2").unwrap();
        assert_eq!(o2.sync_state, SyncState::Synchronized);
        assert_eq!(o2.order.vector_clock, VectorClock::from([("tab-9", 4)]));
    }

    #[test]
    fn test_pull_keeps_superior_offline_copy() {
        let mut store = DeviceStore::new("tab-1", TENANT);
        placed(&mut store, "o-1");
        let mut edited = store.get("o-1").unwrap().order.clone();
        edited.notes = "local edit".to_string();
        store.apply(DeviceCommand::UpdateOrder(edited)).unwrap();

        let summary = store.merge_pull(vec![server_copy("o-1", r#"{"tab-1":1}"#)]);
        assert_eq!(summary.kept_local, 1);
        let local = store.get("o-1").unwrap();
        assert_eq!(local.order.notes, "local edit");
        assert_eq!(local.sync_state, SyncState::Offline);
    }

    #[test]
    fn test_pull_overrides_offline_copy_that_missed_remote_progress() {
        let mut store = DeviceStore::new("tab-1", TENANT);
        placed(&mut store, "o-1");

        store.merge_pull(vec![server_copy("o-1", r#"{"tab-1":1,"tab-2":3}"#)]);
        assert_eq!(store.get("o-1").unwrap().sync_state, SyncState::Synchronized);
    }

    #[test]
    fn test_pull_keeps_unknown_offline_and_drops_deleted() {
        let mut store = DeviceStore::new("tab-1", TENANT);
        placed(&mut store, "synced");
        let batch = store.pending_batch();
        store.apply_sync_results(&batch, &[result("synced", SyncStatus::Inserted)]);
        placed(&mut store, "offline");

        let summary = store.merge_pull(Vec::new());
        assert_eq!(summary.removed, 1);
        assert_eq!(summary.kept_local, 1);
        assert!(store.get("synced").is_none());
        assert!(store.get("offline").is_some());
    }

    #[test]
    fn test_pull_skips_malformed_server_orders() {
        let mut store = DeviceStore::new("tab-1", TENANT);
        let mut bad = server_copy("o-1", "{}");
        bad.items_json = "nope".to_string();
        let summary = store.merge_pull(vec![bad, server_copy("o-2", "{}")]);
        assert_eq!(summary.skipped, 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_amendment_echo_guard() {
        let mut store = DeviceStore::new("kitchen", TENANT);
        placed(&mut store, "o-1");
        store
            .apply(DeviceCommand::ProposeAmendment {
                order_id: "o-1".into(),
                deltas: vec![AmendmentDelta::Delete {
                    item_id: "p1".into(),
                }],
            })
            .unwrap();
        store
            .apply(DeviceCommand::RecordAmendmentResponse {
                order_id: "o-1".into(),
                approve: true,
            })
            .unwrap();
        assert!(store.get("o-1").unwrap().order.items.is_empty());
        assert!(store.is_guarded("o-1"));

        // server has not seen the response yet and still shows the batch
        let mut stale = server_copy("o-1", r#"{"kitchen":9}"#);
        stale.pending_amendments_json =
            r#"[{"type":"delete","itemId":"p1"}]"#.to_string();
        store.merge_pull(vec![stale]);
        assert!(!store.get("o-1").unwrap().order.has_pending_amendment());
        assert!(store.is_guarded("o-1"));

        // once the server copy is clean the guard is released
        store.merge_pull(vec![server_copy("o-1", r#"{"kitchen":10}"#)]);
        assert!(!store.is_guarded("o-1"));
    }
}
