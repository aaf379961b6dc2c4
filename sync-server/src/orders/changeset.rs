//! 一次请求的全部写入
//!
//! 业务逻辑先把订单、桌台、顾客累计、现金与通知写入暂存到 [`ChangeSet`]，
//! 再由 [`OrderService::commit`](super::OrderService::commit) 在一个 redb 事务内落盘。
//! 任一写入失败 (包括版本冲突) 整个事务回滚；推送只在提交成功后发送。

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use redb::WriteTransaction;
use rust_decimal::Decimal;
use shared::message::OrderUpdatePush;
use shared::models::{CashRegister, Customer, DiningTable, TableStatus};
use shared::order::Order;
use shared::order::money::{to_decimal, to_f64};

use crate::notify::{Dispatch, NotificationFanout};
use crate::store::{OrderStore, StorageResult};

/// 暂存的订单写入，携带规划时读到的版本号
#[derive(Debug, Clone)]
struct StagedOrder {
    order: Order,
    expected_version: Option<u64>,
}

/// 顾客累计的增量 (可正可负)
#[derive(Debug, Clone)]
struct CustomerDelta {
    tenant_id: String,
    name: String,
    spend: Decimal,
    orders: i64,
    last_visit: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
pub struct ChangeSet {
    orders: BTreeMap<String, StagedOrder>,
    removals: Vec<(String, u64)>,
    tables: BTreeMap<(String, String), TableStatus>,
    customers: BTreeMap<String, CustomerDelta>,
    removed_customers: Vec<String>,
    cash: BTreeMap<String, Decimal>,
    dispatches: Vec<Dispatch>,
    order_updates: Vec<(String, OrderUpdatePush)>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
            && self.removals.is_empty()
            && self.tables.is_empty()
            && self.customers.is_empty()
            && self.removed_customers.is_empty()
            && self.cash.is_empty()
            && self.dispatches.is_empty()
    }

    // ========== Orders ==========

    /// 暂存订单写入
    ///
    /// 同一订单多次暂存时保留第一次的版本号，提交时按规划起点检查。
    pub fn stage_order(&mut self, order: Order, expected_version: Option<u64>) {
        match self.orders.get_mut(&order.id) {
            Some(staged) => staged.order = order,
            None => {
                self.orders.insert(
                    order.id.clone(),
                    StagedOrder {
                        order,
                        expected_version,
                    },
                );
            }
        }
    }

    /// 已暂存的订单 (提交后版本号为落盘后的值)
    pub fn order(&self, order_id: &str) -> Option<&Order> {
        self.orders.get(order_id).map(|s| &s.order)
    }

    /// 暂存删除
    pub fn remove_order(&mut self, order_id: impl Into<String>, expected_version: u64) {
        self.removals.push((order_id.into(), expected_version));
    }

    // ========== Tables ==========

    pub fn occupy_tables<'a>(&mut self, tenant_id: &str, table_ids: impl IntoIterator<Item = &'a String>) {
        self.set_tables(tenant_id, table_ids, TableStatus::Occupied);
    }

    pub fn free_tables<'a>(&mut self, tenant_id: &str, table_ids: impl IntoIterator<Item = &'a String>) {
        self.set_tables(tenant_id, table_ids, TableStatus::Available);
    }

    fn set_tables<'a>(
        &mut self,
        tenant_id: &str,
        table_ids: impl IntoIterator<Item = &'a String>,
        status: TableStatus,
    ) {
        for table_id in table_ids {
            self.tables
                .insert((tenant_id.to_string(), table_id.clone()), status);
        }
    }

    // ========== Customers ==========

    /// 付款入账：累计消费 +amount，订单数 +1，记录到店时间
    pub fn credit_customer(&mut self, order: &Order, customer_id: &str, amount: f64, at: DateTime<Utc>) {
        let delta = self.customer_delta(order, customer_id);
        delta.spend += to_decimal(amount);
        delta.orders += 1;
        delta.last_visit = Some(at);
    }

    /// 删除已付款订单：累计消费 -amount，订单数 -1
    pub fn debit_customer(&mut self, order: &Order, customer_id: &str, amount: f64) {
        let delta = self.customer_delta(order, customer_id);
        delta.spend -= to_decimal(amount);
        delta.orders -= 1;
    }

    fn customer_delta(&mut self, order: &Order, customer_id: &str) -> &mut CustomerDelta {
        self.customers
            .entry(customer_id.to_string())
            .or_insert_with(|| CustomerDelta {
                tenant_id: order.tenant_id.clone(),
                name: order.customer_name.clone(),
                spend: Decimal::ZERO,
                orders: 0,
                last_visit: None,
            })
    }

    pub fn remove_customer(&mut self, customer_id: impl Into<String>) {
        self.removed_customers.push(customer_id.into());
    }

    // ========== Cash ==========

    pub fn credit_cash(&mut self, tenant_id: &str, amount: f64) {
        *self.cash.entry(tenant_id.to_string()).or_default() += to_decimal(amount);
    }

    pub fn debit_cash(&mut self, tenant_id: &str, amount: f64) {
        *self.cash.entry(tenant_id.to_string()).or_default() -= to_decimal(amount);
    }

    // ========== Notifications ==========

    pub fn notify(&mut self, dispatch: Dispatch) {
        self.dispatches.push(dispatch);
    }

    /// 提交后推送到全租户频道
    pub fn push_order_update(&mut self, order: &Order) {
        self.order_updates.push((
            order.tenant_id.clone(),
            OrderUpdatePush {
                id: order.id.clone(),
                status: order.status,
            },
        ));
    }

    // ========== Commit ==========

    /// 在调用方事务内写入全部暂存内容
    pub(crate) fn write(
        &mut self,
        store: &OrderStore,
        fanout: &NotificationFanout,
        txn: &WriteTransaction,
    ) -> StorageResult<()> {
        for staged in self.orders.values_mut() {
            store.put_order(txn, &mut staged.order, staged.expected_version)?;
        }

        for (order_id, expected_version) in &self.removals {
            store.delete_order(txn, order_id, *expected_version)?;
        }

        for ((tenant_id, table_id), status) in &self.tables {
            let mut dining_table = match store.get_table_txn(txn, tenant_id, table_id)? {
                Some(t) => t,
                None => {
                    tracing::info!(tenant_id = %tenant_id, table_id = %table_id, "Registering unknown table");
                    DiningTable::new(table_id.clone(), tenant_id.clone())
                }
            };
            dining_table.status = *status;
            store.put_table(txn, &dining_table)?;
        }

        for (customer_id, delta) in &self.customers {
            let mut customer = match store.get_customer_txn(txn, customer_id)? {
                Some(c) => c,
                None if delta.orders > 0 => {
                    tracing::info!(customer_id = %customer_id, "Registering unknown customer on payment");
                    Customer::new(customer_id.clone(), delta.tenant_id.clone(), delta.name.clone())
                }
                None => {
                    tracing::warn!(customer_id = %customer_id, "Customer missing, reversal skipped");
                    continue;
                }
            };
            customer.total_spend =
                to_f64((to_decimal(customer.total_spend) + delta.spend).max(Decimal::ZERO));
            customer.total_orders = (customer.total_orders + delta.orders).max(0);
            if delta.last_visit.is_some() {
                customer.last_visit = delta.last_visit;
            }
            store.put_customer(txn, &customer)?;
        }

        for customer_id in &self.removed_customers {
            store.delete_customer(txn, customer_id)?;
        }

        for (tenant_id, delta) in &self.cash {
            let mut register = store
                .get_cash_register_txn(txn, tenant_id)?
                .unwrap_or_else(|| CashRegister::empty(tenant_id.clone()));
            register.balance = to_f64((to_decimal(register.balance) + *delta).max(Decimal::ZERO));
            register.updated_at = Utc::now();
            store.put_cash_register(txn, &register)?;
        }

        for dispatch in &self.dispatches {
            fanout.persist(txn, dispatch)?;
        }

        Ok(())
    }

    /// 提交成功后的实时推送
    pub(crate) fn publish(&self, fanout: &NotificationFanout) {
        for dispatch in &self.dispatches {
            fanout.publish(dispatch);
        }
        for (tenant_id, update) in &self.order_updates {
            fanout.publish_order_update(tenant_id, update.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_restaging_keeps_first_version() {
        let mut changes = ChangeSet::new();
        let mut order = Order::new("o-1", "t-1");
        changes.stage_order(order.clone(), Some(4));
        order.notes = "second".into();
        changes.stage_order(order, Some(5));

        assert_eq!(changes.order("o-1").unwrap().notes, "second");
        assert_eq!(changes.orders["o-1"].expected_version, Some(4));
    }

    #[test]
    fn test_customer_deltas_accumulate() {
        let mut changes = ChangeSet::new();
        let order = Order::new("o-1", "t-1");
        changes.credit_customer(&order, "c-1", 10.0, Utc::now());
        changes.debit_customer(&order, "c-1", 4.5);

        let delta = &changes.customers["c-1"];
        assert_eq!(to_f64(delta.spend), 5.5);
        assert_eq!(delta.orders, 0);
        assert!(delta.last_visit.is_some());
    }

    #[test]
    fn test_write_applies_everything_in_one_transaction() {
        let store = OrderStore::open_in_memory().unwrap();
        let fanout = NotificationFanout::new(store.clone(), crate::notify::NotificationHub::new(4));

        let mut order = Order::new("o-1", "t-1");
        order.table_ids = shared::order::parse_table_ids("5");

        let mut changes = ChangeSet::new();
        changes.occupy_tables("t-1", &order.table_ids);
        changes.credit_customer(&order, "c-1", 12.0, Utc::now());
        changes.credit_cash("t-1", 12.0);
        changes.stage_order(order, None);

        let txn = store.begin_write().unwrap();
        changes.write(&store, &fanout, &txn).unwrap();
        txn.commit().unwrap();

        assert_eq!(store.get_order("o-1").unwrap().unwrap().version, 1);
        assert_eq!(store.list_tables("t-1").unwrap()[0].status, TableStatus::Occupied);
        assert_eq!(store.get_customer("c-1").unwrap().unwrap().total_orders, 1);
        assert_eq!(store.get_cash_register("t-1").unwrap().unwrap().balance, 12.0);
    }

    #[test]
    fn test_failed_write_leaves_store_untouched() {
        let store = OrderStore::open_in_memory().unwrap();
        let fanout = NotificationFanout::new(store.clone(), crate::notify::NotificationHub::new(4));

        let mut changes = ChangeSet::new();
        changes.credit_cash("t-1", 5.0);
        // expects an existing row that is not there
        changes.stage_order(Order::new("o-1", "t-1"), Some(1));

        let txn = store.begin_write().unwrap();
        assert!(changes.write(&store, &fanout, &txn).is_err());
        drop(txn);

        assert!(store.get_order("o-1").unwrap().is_none());
        assert!(store.get_cash_register("t-1").unwrap().is_none());
    }
}
