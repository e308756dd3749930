use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use super::queue::{DeliveryOutcome, DeliveryQueue};
use crate::cache::operations::QueueCacheOperations;
use crate::error::RelayError;

/// 一次扫描的统计
#[derive(Debug, Default)]
pub struct SweepReport {
    pub scanned: usize,
    pub delivered: usize,
    pub not_due: usize,
    /// 被其他投递路径认领而跳过
    pub skipped: usize,
    /// 超出时间预算，留给下一次扫描
    pub deferred: usize,
    pub errors: Vec<RelayError>,
}

impl SweepReport {
    pub fn error_messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }
}

impl DeliveryQueue {
    /// 扫描全部待投递消息，投递已到期的。
    ///
    /// 单条失败不会中断扫描：错误记入报告，消息保留在队列中，下一次扫描自然重试。
    /// 只有列出队列本身失败时才返回 `Err`。
    pub async fn sweep(&self) -> Result<SweepReport, RelayError> {
        let started = Instant::now();
        let ids = QueueCacheOperations::list_ids(self.store.as_ref()).await?;
        let mut report = SweepReport::default();

        for id in ids {
            report.scanned += 1;
            if started.elapsed() >= self.sweep_budget {
                report.deferred += 1;
                continue;
            }

            let message = match QueueCacheOperations::get_message(self.store.as_ref(), &id).await {
                Ok(Some(message)) => message,
                // 列出之后被投递或过期
                Ok(None) => continue,
                Err(e) => {
                    tracing::error!(id = %id, "failed to read queued message: {}", e);
                    report.errors.push(e.into());
                    continue;
                }
            };
            if !message.is_due(self.clock.now()) {
                report.not_due += 1;
                continue;
            }

            match self.deliver_claimed(&id).await {
                Ok(DeliveryOutcome::Delivered) => report.delivered += 1,
                Ok(DeliveryOutcome::NotDue) => report.not_due += 1,
                Ok(DeliveryOutcome::Claimed) => report.skipped += 1,
                Ok(DeliveryOutcome::Missing) => {}
                Err(e) => {
                    tracing::error!(id = %id, "delivery failed, will retry on next sweep: {}", e);
                    report.errors.push(e);
                }
            }
        }

        if report.deferred > 0 {
            tracing::warn!(
                deferred = report.deferred,
                "sweep budget exhausted, remaining messages left for next sweep"
            );
        }
        tracing::info!(
            scanned = report.scanned,
            delivered = report.delivered,
            not_due = report.not_due,
            skipped = report.skipped,
            errors = report.errors.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "sweep finished"
        );
        Ok(report)
    }
}

/// 进程内周期扫描，作为外部定时触发的补充
pub fn spawn_sweeper(queue: Arc<DeliveryQueue>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            if let Err(e) = queue.sweep().await {
                tracing::error!("scheduled sweep failed: {}", e);
            }
        }
    })
}
