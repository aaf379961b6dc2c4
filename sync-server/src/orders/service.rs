use std::sync::Arc;

use chrono::{DateTime, Utc};
use shared::order::{Order, OrderStatus};

use super::changeset::ChangeSet;
use super::error::{OrderError, OrderResult};
use crate::notify::NotificationFanout;
use crate::store::{OrderStore, StorageError};

/// 订单写入服务
///
/// 同步、状态机、改单审批和删除共享这一条写入路径：
///
/// ```text
/// operation()
///     ├─ 1. 读取规范副本 (redb read txn)
///     ├─ 2. 规划变更 → ChangeSet
///     ├─ 3. commit: begin_write → 带版本检查写入 → 通知落库 → commit
///     └─ 4. 推送 (仅在提交成功后)
/// ```
///
/// 具体操作分布在 `reconcile`、`lifecycle`、`amendment` 模块。
#[derive(Clone)]
pub struct OrderService {
    store: OrderStore,
    fanout: NotificationFanout,
    node_id: Arc<str>,
}

impl std::fmt::Debug for OrderService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderService")
            .field("store", &"<OrderStore>")
            .field("node_id", &self.node_id)
            .finish()
    }
}

impl OrderService {
    pub fn new(store: OrderStore, fanout: NotificationFanout, node_id: impl Into<String>) -> Self {
        let node_id: String = node_id.into();
        Self {
            store,
            fanout,
            node_id: Arc::from(node_id),
        }
    }

    pub fn store(&self) -> &OrderStore {
        &self.store
    }

    pub fn fanout(&self) -> &NotificationFanout {
        &self.fanout
    }

    /// 服务端在向量时钟中的 key
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    /// 读取租户内的订单 (其他租户的订单视为不存在)
    pub fn get_order(&self, tenant_id: &str, order_id: &str) -> OrderResult<Order> {
        match self.store.get_order(order_id)? {
            Some(order) if order.tenant_id == tenant_id => Ok(order),
            _ => Err(OrderError::NotFound(order_id.to_string())),
        }
    }

    /// 租户最近的订单，最新在前
    pub fn recent_orders(&self, tenant_id: &str, limit: usize) -> OrderResult<Vec<Order>> {
        Ok(self.store.recent_orders(tenant_id, limit)?)
    }

    /// 服务端本地修改：递增自身时钟
    pub(crate) fn stamp(&self, order: &mut Order) {
        order.vector_clock.tick(&self.node_id);
    }

    /// 在一个写事务内落盘全部变更，提交后推送
    pub(crate) fn commit(&self, mut changes: ChangeSet) -> OrderResult<ChangeSet> {
        let txn = self.store.begin_write()?;
        changes.write(&self.store, &self.fanout, &txn)?;
        txn.commit().map_err(StorageError::from)?;
        changes.publish(&self.fanout);
        Ok(changes)
    }

    /// 付款结算的副作用
    ///
    /// 锁定改单、记录付款时间、把 finalTotal 固定为结算金额，
    /// 并为顾客累计与现金抽屉入账。
    pub(crate) fn settle_payment(&self, order: &mut Order, at: DateTime<Utc>, changes: &mut ChangeSet) {
        order.can_amend = false;
        order.paid_at = order.paid_at.or(Some(at));
        order.final_total = order.settled_amount();

        let amount = order.final_total;
        if let Some(customer_id) = order.customer_id.clone() {
            changes.credit_customer(order, &customer_id, amount, at);
        }
        if order.is_cash_payment() {
            changes.credit_cash(&order.tenant_id, amount);
        }
        tracing::info!(
            order_id = %order.id,
            tenant_id = %order.tenant_id,
            amount = amount,
            "Payment settled"
        );
    }

    /// 撤销已付款订单的副作用 (删除订单时)
    pub(crate) fn reverse_payment(&self, order: &Order, changes: &mut ChangeSet) {
        if order.status != OrderStatus::Paid {
            return;
        }
        let amount = order.settled_amount();
        if let Some(customer_id) = order.customer_id.as_deref() {
            changes.debit_customer(order, customer_id, amount);
        }
        if order.is_cash_payment() {
            changes.debit_cash(&order.tenant_id, amount);
        }
    }
}
