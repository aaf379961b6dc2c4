//! 订单服务
//!
//! - [`reconcile`] - ReconciliationService: 设备批量同步
//! - [`lifecycle`] - OrderLifecycle: 状态机、结账副作用、删除
//! - [`amendment`] - AmendmentProtocol: 改单提案与审批
//! - [`changeset`] - 单事务提交的暂存写入

pub mod amendment;
pub mod changeset;
pub mod error;
pub mod lifecycle;
pub mod reconcile;
mod service;

pub use changeset::ChangeSet;
pub use error::{OrderError, OrderResult};
pub use lifecycle::{can_reach, can_transition};
pub use service::OrderService;

#[cfg(test)]
mod tests;
