//! 通知定时发送 Worker
//!
//! 以固定间隔触发一次通知批次。单次批次失败只记录日志，不影响后续调度；
//! 收到关闭信号后在当前批次结束时退出。

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{error, info};
use wallet_shared::observability::metrics;

use crate::service::NotificationService;

const WORKER_NAME: &str = "notification_worker";

/// 通知定时发送 Worker
pub struct NotificationWorker {
    service: Arc<NotificationService>,
    interval: Duration,
}

impl NotificationWorker {
    pub fn new(service: Arc<NotificationService>, interval: Duration) -> Self {
        Self { service, interval }
    }

    /// 主循环：首个批次在一个间隔之后发送，直到关闭信号变为 true
    ///
    /// 返回已成功完成的批次数。
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> u64 {
        info!(interval = ?self.interval, "NotificationWorker 已启动");

        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut completed = 0u64;

        loop {
            tokio::select! {
                // 偏向关闭信号，保证收到关闭时能尽快退出
                biased;

                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!(completed, "NotificationWorker 收到关闭信号，退出");
                        break;
                    }
                }

                _ = ticker.tick() => {
                    match self.service.publish_batch().await {
                        Ok(sent) => {
                            completed += 1;
                            info!(sent, completed, "定时通知批次已发送");
                        }
                        Err(e) => error!(error = %e, "定时通知批次发送失败"),
                    }
                    metrics::set_worker_last_run(WORKER_NAME);
                }
            }
        }

        completed
    }
}
