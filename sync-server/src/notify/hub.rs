//! 实时推送频道
//!
//! 每个频道 (`tenant:{t}:{group}` / `tenant:{t}`) 对应一个 broadcast 通道，
//! 首次订阅时创建。发送是尽力而为的：没有订阅者或接收端落后时事件直接丢弃，
//! 设备通过拉取接口补齐。

use std::sync::Arc;

use dashmap::DashMap;
use shared::message::HubEvent;
use tokio::sync::broadcast;

/// 推送频道注册表
#[derive(Debug, Clone)]
pub struct NotificationHub {
    channels: Arc<DashMap<String, broadcast::Sender<HubEvent>>>,
    capacity: usize,
}

impl NotificationHub {
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: Arc::new(DashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// 订阅频道 (不存在则创建)
    pub fn subscribe(&self, channel: &str) -> broadcast::Receiver<HubEvent> {
        self.channels
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// 发送事件，返回收到事件的订阅者数量
    ///
    /// 频道不存在或无订阅者时返回 0，事件丢弃。
    pub fn publish(&self, channel: &str, event: HubEvent) -> usize {
        match self.channels.get(channel) {
            Some(sender) => sender.send(event).unwrap_or(0),
            None => 0,
        }
    }

    /// 清理没有订阅者的频道 (连接关闭后调用)
    pub fn prune(&self) {
        self.channels.retain(|_, sender| sender.receiver_count() > 0);
    }

    /// 当前频道数量
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::OrderStatus;
    use shared::message::OrderUpdatePush;

    fn update(id: &str) -> HubEvent {
        HubEvent::ReceiveOrderUpdate(OrderUpdatePush {
            id: id.to_string(),
            status: OrderStatus::Ready,
        })
    }

    #[tokio::test]
    async fn test_publish_reaches_subscribers() {
        let hub = NotificationHub::new(8);
        let mut rx1 = hub.subscribe("tenant:t1");
        let mut rx2 = hub.subscribe("tenant:t1");
        assert_eq!(hub.publish("tenant:t1", update("o-1")), 2);
        assert_eq!(rx1.recv().await.unwrap(), update("o-1"));
        assert_eq!(rx2.recv().await.unwrap(), update("o-1"));
    }

    #[test]
    fn test_publish_without_subscribers_is_dropped() {
        let hub = NotificationHub::new(8);
        assert_eq!(hub.publish("tenant:nobody", update("o-1")), 0);

        let rx = hub.subscribe("tenant:t1");
        drop(rx);
        assert_eq!(hub.publish("tenant:t1", update("o-1")), 0);
        hub.prune();
        assert_eq!(hub.channel_count(), 0);
    }

    #[tokio::test]
    async fn test_slow_receiver_lags_instead_of_blocking() {
        let hub = NotificationHub::new(2);
        let mut rx = hub.subscribe("tenant:t1");
        for i in 0..5 {
            hub.publish("tenant:t1", update(&format!("o-{}", i)));
        }
        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(_))
        ));
    }
}
