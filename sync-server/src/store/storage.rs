//! redb-based canonical order store
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `orders` | `order_id` | `Order` | Canonical orders (all tenants) |
//! | `notifications` | `(tenant_id, sequence)` | `Notification` | Durable notification rows |
//! | `customers` | `customer_id` | `Customer` | Customer aggregates |
//! | `dining_tables` | `(tenant_id, table_id)` | `DiningTable` | Table occupancy |
//! | `cash_registers` | `tenant_id` | `CashRegister` | Cash drawer balance |
//! | `sequence_counter` | `&str` | `u64` | Notification sequence |
//!
//! # Concurrency
//!
//! Every order row carries a `version`. Writers plan against a read snapshot and
//! pass the version they saw to [`OrderStore::put_order`]; a mismatch inside the
//! write transaction is [`StorageError::VersionConflict`] and the caller drops the
//! transaction, so nothing from that request is committed.

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction};
use shared::Role;
use shared::message::Notification;
use shared::models::{CashRegister, Customer, DiningTable};
use shared::order::Order;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Table for canonical orders: key = order_id, value = JSON-serialized Order
const ORDERS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("orders");

/// Table for notifications: key = (tenant_id, sequence), value = JSON-serialized Notification
const NOTIFICATIONS_TABLE: TableDefinition<(&str, u64), &[u8]> =
    TableDefinition::new("notifications");

/// Table for customers: key = customer_id, value = JSON-serialized Customer
const CUSTOMERS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("customers");

/// Table for dining tables: key = (tenant_id, table_id), value = JSON-serialized DiningTable
const DINING_TABLES_TABLE: TableDefinition<(&str, &str), &[u8]> =
    TableDefinition::new("dining_tables");

/// Table for cash registers: key = tenant_id, value = JSON-serialized CashRegister
const CASH_REGISTERS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("cash_registers");

/// Table for sequence counters
const SEQUENCE_TABLE: TableDefinition<&str, u64> = TableDefinition::new("sequence_counter");

const NOTIFICATION_SEQ_KEY: &str = "notification_seq";

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Version conflict on order {order_id}: expected {expected:?}, found {found:?}")]
    VersionConflict {
        order_id: String,
        expected: Option<u64>,
        found: Option<u64>,
    },
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Canonical order store backed by redb
#[derive(Clone)]
pub struct OrderStore {
    db: Arc<Database>,
}

impl OrderStore {
    /// Open or create the database at the given path
    ///
    /// redb commits are durable once `commit()` returns and the file is
    /// always in a consistent state after a crash.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;
        Self::init(db)
    }

    /// Open an in-memory database (tests and throwaway nodes)
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> StorageResult<Self> {
        let write_txn = db.begin_write()?;
        {
            // Create all tables if they don't exist
            let _ = write_txn.open_table(ORDERS_TABLE)?;
            let _ = write_txn.open_table(NOTIFICATIONS_TABLE)?;
            let _ = write_txn.open_table(CUSTOMERS_TABLE)?;
            let _ = write_txn.open_table(DINING_TABLES_TABLE)?;
            let _ = write_txn.open_table(CASH_REGISTERS_TABLE)?;

            let mut seq_table = write_txn.open_table(SEQUENCE_TABLE)?;
            if seq_table.get(NOTIFICATION_SEQ_KEY)?.is_none() {
                seq_table.insert(NOTIFICATION_SEQ_KEY, 0u64)?;
            }
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Begin a write transaction
    pub fn begin_write(&self) -> StorageResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    // ========== Orders ==========

    /// Get an order by id (tenant filter bypassed)
    pub fn get_order(&self, order_id: &str) -> StorageResult<Option<Order>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;

        match table.get(order_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Write an order after checking its optimistic-concurrency token
    ///
    /// `expected_version = None` means the order must not exist yet.
    /// On success `order.version` holds the stored version.
    pub fn put_order(
        &self,
        txn: &WriteTransaction,
        order: &mut Order,
        expected_version: Option<u64>,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(ORDERS_TABLE)?;
        let found = match table.get(order.id.as_str())? {
            Some(value) => Some(serde_json::from_slice::<Order>(value.value())?.version),
            None => None,
        };
        if found != expected_version {
            return Err(StorageError::VersionConflict {
                order_id: order.id.clone(),
                expected: expected_version,
                found,
            });
        }

        order.version = expected_version.map_or(1, |v| v + 1);
        let value = serde_json::to_vec(order)?;
        table.insert(order.id.as_str(), value.as_slice())?;
        Ok(())
    }

    /// Hard-delete an order after checking its version
    pub fn delete_order(
        &self,
        txn: &WriteTransaction,
        order_id: &str,
        expected_version: u64,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(ORDERS_TABLE)?;
        let found = match table.get(order_id)? {
            Some(value) => Some(serde_json::from_slice::<Order>(value.value())?.version),
            None => None,
        };
        if found != Some(expected_version) {
            return Err(StorageError::VersionConflict {
                order_id: order_id.to_string(),
                expected: Some(expected_version),
                found,
            });
        }
        table.remove(order_id)?;
        Ok(())
    }

    /// Most recent orders of a tenant, newest first
    pub fn recent_orders(&self, tenant_id: &str, limit: usize) -> StorageResult<Vec<Order>> {
        let mut orders = self.scan_orders(|o| o.tenant_id == tenant_id)?;
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        orders.truncate(limit);
        Ok(orders)
    }

    /// Orders linked to a customer
    pub fn orders_for_customer(&self, customer_id: &str) -> StorageResult<Vec<Order>> {
        self.scan_orders(|o| o.customer_id.as_deref() == Some(customer_id))
    }

    fn scan_orders(&self, keep: impl Fn(&Order) -> bool) -> StorageResult<Vec<Order>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;

        let mut orders = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            let order: Order = serde_json::from_slice(value.value())?;
            if keep(&order) {
                orders.push(order);
            }
        }
        Ok(orders)
    }

    // ========== Customers ==========

    /// Get a customer by id
    pub fn get_customer(&self, customer_id: &str) -> StorageResult<Option<Customer>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CUSTOMERS_TABLE)?;

        match table.get(customer_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Get a customer by id (within transaction)
    pub fn get_customer_txn(
        &self,
        txn: &WriteTransaction,
        customer_id: &str,
    ) -> StorageResult<Option<Customer>> {
        let table = txn.open_table(CUSTOMERS_TABLE)?;

        match table.get(customer_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Insert or replace a customer
    pub fn put_customer(&self, txn: &WriteTransaction, customer: &Customer) -> StorageResult<()> {
        let mut table = txn.open_table(CUSTOMERS_TABLE)?;
        let value = serde_json::to_vec(customer)?;
        table.insert(customer.id.as_str(), value.as_slice())?;
        Ok(())
    }

    /// Remove a customer, returns whether it existed
    pub fn delete_customer(&self, txn: &WriteTransaction, customer_id: &str) -> StorageResult<bool> {
        let mut table = txn.open_table(CUSTOMERS_TABLE)?;
        let existed = table.remove(customer_id)?.is_some();
        Ok(existed)
    }

    // ========== Dining Tables ==========

    /// Get a table (within transaction)
    pub fn get_table_txn(
        &self,
        txn: &WriteTransaction,
        tenant_id: &str,
        table_id: &str,
    ) -> StorageResult<Option<DiningTable>> {
        let table = txn.open_table(DINING_TABLES_TABLE)?;

        match table.get((tenant_id, table_id))? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Insert or replace a table
    pub fn put_table(&self, txn: &WriteTransaction, dining_table: &DiningTable) -> StorageResult<()> {
        let mut table = txn.open_table(DINING_TABLES_TABLE)?;
        let value = serde_json::to_vec(dining_table)?;
        table.insert(
            (dining_table.tenant_id.as_str(), dining_table.id.as_str()),
            value.as_slice(),
        )?;
        Ok(())
    }

    /// All tables of a tenant, ordered by id
    pub fn list_tables(&self, tenant_id: &str) -> StorageResult<Vec<DiningTable>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(DINING_TABLES_TABLE)?;

        let mut tables = Vec::new();
        for result in table.iter()? {
            let (key, value) = result?;
            if key.value().0 != tenant_id {
                continue;
            }
            tables.push(serde_json::from_slice(value.value())?);
        }
        Ok(tables)
    }

    // ========== Cash Registers ==========

    /// Get a tenant's cash register (read-only)
    pub fn get_cash_register(&self, tenant_id: &str) -> StorageResult<Option<CashRegister>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CASH_REGISTERS_TABLE)?;

        match table.get(tenant_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Get a tenant's cash register (within transaction)
    pub fn get_cash_register_txn(
        &self,
        txn: &WriteTransaction,
        tenant_id: &str,
    ) -> StorageResult<Option<CashRegister>> {
        let table = txn.open_table(CASH_REGISTERS_TABLE)?;

        match table.get(tenant_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Insert or replace a cash register
    pub fn put_cash_register(
        &self,
        txn: &WriteTransaction,
        register: &CashRegister,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(CASH_REGISTERS_TABLE)?;
        let value = serde_json::to_vec(register)?;
        table.insert(register.tenant_id.as_str(), value.as_slice())?;
        Ok(())
    }

    // ========== Notifications ==========

    /// Increment and return the notification sequence number
    fn next_notification_sequence(&self, txn: &WriteTransaction) -> StorageResult<u64> {
        let mut table = txn.open_table(SEQUENCE_TABLE)?;
        let current = table
            .get(NOTIFICATION_SEQ_KEY)?
            .map(|guard| guard.value())
            .unwrap_or(0);
        let next = current + 1;
        table.insert(NOTIFICATION_SEQ_KEY, next)?;
        Ok(next)
    }

    /// Append a notification row, returns its sequence number
    pub fn append_notification(
        &self,
        txn: &WriteTransaction,
        notification: &Notification,
    ) -> StorageResult<u64> {
        let sequence = self.next_notification_sequence(txn)?;
        let mut table = txn.open_table(NOTIFICATIONS_TABLE)?;
        let value = serde_json::to_vec(notification)?;
        table.insert(
            (notification.tenant_id.as_str(), sequence),
            value.as_slice(),
        )?;
        Ok(sequence)
    }

    /// Notifications of a tenant in persistence order, optionally for one role
    pub fn notifications_for(
        &self,
        tenant_id: &str,
        role: Option<Role>,
    ) -> StorageResult<Vec<Notification>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(NOTIFICATIONS_TABLE)?;

        let mut notifications = Vec::new();
        for result in table.range((tenant_id, 0u64)..=(tenant_id, u64::MAX))? {
            let (_key, value) = result?;
            let notification: Notification = serde_json::from_slice(value.value())?;
            if role.is_none_or(|r| notification.target_role == r) {
                notifications.push(notification);
            }
        }
        Ok(notifications)
    }

    /// Mark one of the caller role's notifications read
    ///
    /// 返回 false：不存在、属于其他租户或其他角色
    pub fn mark_notification_read(
        &self,
        tenant_id: &str,
        role: Role,
        notification_id: &str,
    ) -> StorageResult<bool> {
        let write_txn = self.db.begin_write()?;
        let marked = {
            let mut table = write_txn.open_table(NOTIFICATIONS_TABLE)?;

            let mut found: Option<(u64, Notification)> = None;
            for result in table.range((tenant_id, 0u64)..=(tenant_id, u64::MAX))? {
                let (key, value) = result?;
                let notification: Notification = serde_json::from_slice(value.value())?;
                if notification.id == notification_id {
                    found = Some((key.value().1, notification));
                    break;
                }
            }

            match found {
                Some((sequence, mut notification)) if notification.target_role == role => {
                    if !notification.is_read {
                        notification.is_read = true;
                        let value = serde_json::to_vec(&notification)?;
                        table.insert((tenant_id, sequence), value.as_slice())?;
                    }
                    true
                }
                _ => false,
            }
        };
        write_txn.commit()?;
        Ok(marked)
    }
}
