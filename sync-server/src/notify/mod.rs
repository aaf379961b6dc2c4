//! NotificationFanout 与实时推送
//!
//! - [`Notice`] - 订单事件对应的角色集合与文案
//! - [`NotificationFanout`] - 持久化 (调用方事务内) + 推送 (提交后)
//! - [`NotificationHub`] - 按频道的 broadcast 注册表

pub mod fanout;
pub mod hub;
pub mod notice;

pub use fanout::{Dispatch, NotificationFanout};
pub use hub::NotificationHub;
pub use notice::Notice;
