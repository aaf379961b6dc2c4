//! 规范订单库
//!
//! 所有写入者 (同步、状态机、改单审批、删除) 共用同一个 redb 数据库，
//! 订单写入统一经过 [`OrderStore::put_order`] 的版本检查。

pub mod storage;

pub use storage::{OrderStore, StorageError, StorageResult};
