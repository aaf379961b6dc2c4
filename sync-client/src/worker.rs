//! 固定间隔同步任务
//!
//! 每个 tick 先推送离线快照，再拉取服务端订单合并。失败只记录日志，
//! 下一个 tick 重试 (无退避)。通过 [`CancellationToken`] 停止。

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::store::{DeviceStore, MergeSummary};
use crate::{ClientResult, SyncTransport};

/// 单次 tick 的结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// 推送的离线快照数
    pub pushed: usize,
    /// 服务端接受 (Inserted / Updated)
    pub accepted: usize,
    /// 服务端保留自身副本
    pub conflicted: usize,
    /// 拉取合并统计
    pub merge: MergeSummary,
}

/// 设备同步任务
pub struct SyncWorker<T: SyncTransport> {
    store: Arc<Mutex<DeviceStore>>,
    transport: Arc<T>,
    interval: Duration,
    cancel: CancellationToken,
}

impl<T: SyncTransport + 'static> SyncWorker<T> {
    pub fn new(store: Arc<Mutex<DeviceStore>>, transport: Arc<T>, interval: Duration) -> Self {
        Self {
            store,
            transport,
            interval,
            cancel: CancellationToken::new(),
        }
    }

    /// 用于停止任务的 token
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// 推送后拉取
    ///
    /// 网络调用期间不持有 store 锁，推送结果按推送时的时钟应用。
    pub async fn tick(&self) -> ClientResult<TickReport> {
        let mut report = TickReport::default();

        let batch = self.store.lock().await.pending_batch();
        if !batch.is_empty() {
            let results = self.transport.push(&batch).await?;
            report.pushed = batch.len();
            report.accepted = results.iter().filter(|r| r.status.is_accepted()).count();
            report.conflicted = results.len() - report.accepted;
            self.store.lock().await.apply_sync_results(&batch, &results);
        }

        let server_orders = self.transport.pull().await?;
        report.merge = self.store.lock().await.merge_pull(server_orders);
        Ok(report)
    }

    /// 运行直到被取消
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(interval = ?self.interval, "Sync worker started");
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = ticker.tick() => {
                    match self.tick().await {
                        Ok(report) if report.pushed > 0 || report.merge.removed > 0 => {
                            tracing::info!(
                                pushed = report.pushed,
                                accepted = report.accepted,
                                conflicted = report.conflicted,
                                replaced = report.merge.replaced,
                                removed = report.merge.removed,
                                "Sync tick complete"
                            );
                        }
                        Ok(_) => {}
                        Err(e) => tracing::warn!(error = %e, "Sync tick failed, retrying next tick"),
                    }
                }
            }
        }
        tracing::info!("Sync worker stopped");
    }

    /// 在后台任务中运行，返回取消 token 和任务句柄
    pub fn spawn(self) -> (CancellationToken, tokio::task::JoinHandle<()>) {
        let cancel = self.cancellation_token();
        (cancel, tokio::spawn(self.run()))
    }
}
