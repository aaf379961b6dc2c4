//! Sync Client - 员工设备端的离线订单容器与同步
//!
//! - [`DeviceStore`] - 设备本地订单，所有修改都是离散的 [`DeviceCommand`]
//! - [`HttpClient`] - 调用 sync-server HTTP API
//! - [`SyncWorker`] - 固定间隔推送离线快照、拉取服务端订单

pub mod config;
pub mod error;
pub mod http;
pub mod store;
pub mod worker;

pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use http::{HttpClient, SyncTransport};
pub use store::{DeviceCommand, DeviceStore, LocalOrder, MergeSummary, SyncState};
pub use worker::{SyncWorker, TickReport};

// Re-export shared types for convenience
pub use shared::order::{OrderSnapshotDto, SyncResult, SyncStatus};
